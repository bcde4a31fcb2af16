//! Error types for subot-vector.

use thiserror::Error;

/// Result type for subot-vector operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in subot-vector operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Dimension mismatch between a vector and the index.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimensions.
        expected: usize,
        /// Actual dimensions provided.
        actual: usize,
    },

    /// Invalid vector (e.g., empty, contains NaN).
    #[error("Invalid vector: {0}")]
    InvalidVector(String),

    /// The same id was supplied twice in one build.
    #[error("Duplicate vector id '{0}'")]
    DuplicateId(String),

    /// The persisted index exists but cannot be trusted.
    #[error("Index corrupt: {0}")]
    Corrupt(String),

    /// No persisted index exists at the given location.
    #[error("No persisted index at {0}")]
    NotPersisted(String),

    /// Persistence error (serialization, paths).
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
