//! Error types for the solver
use halo_comm::CommError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for solver operations
pub type Result<T> = std::result::Result<T, Error>;

/// Solver errors. None of them is retried.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid grid, geometry or partition parameters, detected before
    /// the first iteration
    #[error("invalid configuration: {parameter}: {reason}")]
    Configuration {
        /// Name of the offending parameter
        parameter: &'static str,
        /// What was expected
        reason: String,
    },

    /// A halo exchange or reduction did not complete
    #[error("communication failure: {0}")]
    Communication(#[from] CommError),

    /// Configuration file could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        /// File that was being read
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Configuration file is not valid TOML for a run
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

impl Error {
    pub(crate) fn config(parameter: &'static str, reason: impl Into<String>) -> Self {
        Error::Configuration {
            parameter,
            reason: reason.into(),
        }
    }

    /// True for errors raised before the iteration loop
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::Configuration { .. } | Error::Io { .. } | Error::ConfigParse(_)
        )
    }
}
