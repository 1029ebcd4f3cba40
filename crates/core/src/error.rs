//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Truncated blob, failed authentication, or unusable key.
    /// Carries no cause: a wrong key must be indistinguishable from
    /// tampered data.
    #[error("error decrypting file")]
    Decryption,

    #[error("encryption failed")]
    Encryption,

    #[error("invalid key encoding: {0}")]
    KeyEncoding(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
