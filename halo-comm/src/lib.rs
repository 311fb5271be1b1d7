//! # halo-comm
//!
//! Message-passing runtime for row-block decomposed grid solvers.
//!
//! Solvers are written against the [`Communicator`] trait: rank/size
//! discovery, point-to-point transfers, a paired send-and-receive that
//! treats [`Neighbor::Null`] as a no-op, non-blocking exchange with a
//! joint wait, all-reduce and barrier. Two worker groups implement it:
//!
//! - [`LocalUniverse`] runs one thread per rank inside the current process.
//! - `mpi::MpiComm` (feature `mpi`) spans `MPI_COMM_WORLD` through rsmpi.
//!
//! ```
//! use halo_comm::{Communicator, LocalUniverse};
//!
//! let sums = LocalUniverse::new(4)
//!     .unwrap()
//!     .run(|comm| comm.all_reduce_sum(comm.rank() as f64));
//! assert!(sums.iter().all(|s| *s == Ok(6.)));
//! ```
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]
pub mod comm;
pub mod error;
pub mod functions;
pub mod local;
pub mod mpi;
pub mod wire;

pub use comm::{Communicator, Neighbor, RecvOp, ReduceOp, SendOp, Tag};
pub use error::{CommError, Result};
pub use local::{LocalComm, LocalUniverse, MessageRecord, TrafficLog};
pub use wire::Wire;
