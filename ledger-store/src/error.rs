//! Error types for the ledger store

use crate::types::UserId;
use thiserror::Error;
use uuid::Uuid;

/// Result type for store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger store errors
#[derive(Error, Debug)]
pub enum Error {
    /// User not found
    #[error("User not found: {0}")]
    UserNotFound(UserId),

    /// Transaction not found
    #[error("Transaction not found: {0}")]
    TransactionNotFound(Uuid),

    /// Illegal status transition on a finalized transaction
    #[error("Transaction {id} is already {status}")]
    AlreadyFinalized {
        /// Transaction ID
        id: Uuid,
        /// Current (final) status
        status: String,
    },

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Injected fault (memory store, tests only)
    #[error("Store fault: {0}")]
    Fault(String),

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
