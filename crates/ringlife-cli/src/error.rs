//! Error types for the RingLife CLI.

use thiserror::Error;

use ringlife_core::RingLifeError;

/// CLI result type alias.
pub type CliResult<T> = Result<T, CliError>;

/// CLI error type.
#[derive(Error, Debug)]
pub enum CliError {
    /// The run or a snapshot operation failed.
    #[error(transparent)]
    Run(#[from] RingLifeError),

    /// Report could not be encoded.
    #[error("Failed to encode report: {0}")]
    Encode(#[from] serde_json::Error),
}
