//! Error types for the vault.

use chatvault_core::SecurityError;
use thiserror::Error;

/// Errors raised by the crypto engines and the persistence collaborators.
#[derive(Debug, Error)]
pub enum SecretError {
    /// Key material missing or unusable. Fatal: nothing is encrypted,
    /// decrypted, or indexed without it.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Authentication tag mismatch or malformed ciphertext.
    #[error("Integrity check failed: {0}")]
    Integrity(String),

    #[error("Encryption failed: {0}")]
    Encryption(String),

    /// A uniqueness constraint in the store was violated.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience result alias for crypto and storage operations.
pub type Result<T> = std::result::Result<T, SecretError>;

/// Errors surfaced by [`crate::SecretVault`] operations.
#[derive(Debug, Error)]
pub enum VaultError {
    /// Rejected input (short token, duplicate name, bad name).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Capability denied.
    #[error(transparent)]
    Authorization(#[from] SecurityError),

    #[error("Secret not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Secret(#[from] SecretError),
}

/// Convenience result alias for vault operations.
pub type VaultResult<T> = std::result::Result<T, VaultError>;

impl VaultError {
    /// Stable machine-readable code for outer transports.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "BAD_USER_INPUT",
            Self::Authorization(e) => e.code(),
            Self::NotFound(_) => "NOT_FOUND",
            Self::Secret(SecretError::Configuration(_)) => "CONFIGURATION",
            Self::Secret(SecretError::Integrity(_)) => "INTEGRITY",
            Self::Secret(SecretError::Conflict(_)) => "BAD_USER_INPUT",
            Self::Secret(_) => "INTERNAL",
        }
    }

    /// Whether this is an authentication-tag or ciphertext integrity failure.
    pub fn is_integrity(&self) -> bool {
        matches!(self, Self::Secret(SecretError::Integrity(_)))
    }
}
