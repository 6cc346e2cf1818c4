//! Error types for the tangle

use thiserror::Error;

/// Result type for tangle operations
pub type Result<T> = std::result::Result<T, Error>;

/// Tangle errors
#[derive(Error, Debug)]
pub enum Error {
    /// Consensus application unreachable, timed out, or rejected the payload
    #[error("Validation failure: {0}")]
    ValidationFailure(String),

    /// Transaction hash already present in the graph
    #[error("Duplicate transaction: {0}")]
    DuplicateTransaction(String),

    /// Approved transaction is not present in the graph
    #[error("Missing tip: {0}")]
    MissingTip(String),

    /// Transaction is internally inconsistent (bad hash, repeated approvals, ...)
    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),

    /// Durable write failed after the graph commit
    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),

    /// Storage error (RocksDB)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Submission could not be decoded at the boundary
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Concurrency error (actor mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Numeric status reported at the submission boundary (0 is success)
    pub fn code(&self) -> u32 {
        match self {
            Error::ValidationFailure(_) => 1,
            Error::DuplicateTransaction(_) => 2,
            Error::MissingTip(_) => 3,
            Error::InvalidTransaction(_) => 4,
            Error::PersistenceFailure(_) => 5,
            Error::Decode(_) => 6,
            _ => 99,
        }
    }
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
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
