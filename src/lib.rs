//! # jacobi-cfd
//!
//! Jacobi relaxation of the stream function for flow through a 2D cavity
//! with an inlet on one edge and an outlet on another. The grid is split
//! into contiguous row blocks, one per worker; neighbouring blocks swap
//! one halo row per iteration, and the normalised residual is all-reduced
//! so every worker stops on the same iteration.
//!
//! Workers talk through [`halo_comm::Communicator`]. The in-process
//! [`halo_comm::LocalUniverse`] runs one thread per worker; with feature
//! `mpi` the same solver runs on `MPI_COMM_WORLD`.
//!
//! ```
//! use halo_comm::LocalUniverse;
//! use jacobi_cfd::{RunConfig, Solver, SolverState};
//!
//! let config = RunConfig {
//!     iterations: 100,
//!     workers: 2,
//!     ..RunConfig::default()
//! };
//! let out = LocalUniverse::new(config.workers)
//!     .unwrap()
//!     .run(|comm| Solver::new(comm, &config)?.run());
//! for outcome in out {
//!     let outcome = outcome.unwrap();
//!     assert_eq!(outcome.state, SolverState::IterationBudgetExhausted);
//!     assert_eq!(outcome.iterations, 100);
//! }
//! ```
#![allow(clippy::module_name_repetitions)]
pub mod boundary;
pub mod config;
pub mod convergence;
pub mod error;
pub mod field;
pub mod gather;
pub mod halo;
pub mod mpi;
pub mod partition;
pub mod solver;
pub mod stencil;
pub mod timing;

pub use boundary::{BoundaryInitializer, Geometry};
pub use config::RunConfig;
pub use convergence::{BoundaryNorm, ConvergenceReducer};
pub use error::{Error, Result};
pub use field::{Field, Side};
pub use gather::gather_field;
pub use halo::{ExchangeMode, HaloExchanger};
pub use partition::Partition;
pub use solver::{IterationState, Outcome, Solver, SolverState};
pub use stencil::{StencilKernel, Sweep};
pub use timing::{PhaseSummary, TimingLedger};
