//! Feature: run the solver on `MPI_COMM_WORLD`
#![cfg(feature = "mpi")]
pub use halo_comm::mpi::initialize;
pub use halo_comm::mpi::MpiComm;
pub use halo_comm::mpi::Universe;
