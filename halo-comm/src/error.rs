//! Error types for the communication runtime
use thiserror::Error;

/// Result type for communication operations
pub type Result<T> = std::result::Result<T, CommError>;

/// Failure of a point-to-point or collective operation.
///
/// None of these are recoverable: a worker that observes one must abort
/// the whole distributed computation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommError {
    /// A worker group needs at least one member
    #[error("invalid communicator size: {0}")]
    InvalidSize(usize),

    /// Rank outside `0..size`
    #[error("invalid rank {rank} for communicator of size {size}")]
    InvalidRank {
        /// Offending rank
        rank: usize,
        /// Size of the worker group
        size: usize,
    },

    /// Negative tags are reserved for collectives
    #[error("invalid tag: {0}")]
    InvalidTag(i32),

    /// Received payload does not fit the receive buffer
    #[error("message size mismatch: expected {expected} bytes, received {received}")]
    SizeMismatch {
        /// Bytes the receive buffer holds
        expected: usize,
        /// Bytes that arrived
        received: usize,
    },

    /// The peer endpoint went away
    #[error("peer disconnected")]
    Disconnected,

    /// Another worker aborted the computation
    #[error("computation aborted by another worker")]
    Aborted,
}
