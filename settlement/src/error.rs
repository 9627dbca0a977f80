//! Error types for the settlement engine

use chrono::NaiveDate;
use thiserror::Error;

/// Result type for settlement operations
pub type Result<T> = std::result::Result<T, Error>;

/// Settlement errors
#[derive(Error, Debug)]
pub enum Error {
    /// Ledger store error
    #[error("Store error: {0}")]
    Store(#[from] ledger_store::Error),

    /// A settlement run for this date has already completed
    #[error("Settlement already ran for {0}")]
    AlreadySettled(NaiveDate),

    /// Another settlement run is currently executing
    #[error("Settlement run already in progress")]
    RunInProgress,

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}
