//! # Storage Error Types

use docseal_core::{ConfigError, StorageKey};
use thiserror::Error;

/// Failures of a storage backend operation.
///
/// Every variant is fatal to the operation that hit it. Nothing in this
/// crate retries.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The operation exceeded the configured storage timeout.
    #[error("storage {operation} timed out after {secs}s")]
    Timeout { operation: &'static str, secs: u64 },

    /// The remote store rejected or failed the request.
    #[error("object store error during {operation}: {message}")]
    Backend {
        operation: &'static str,
        message: String,
    },

    /// Stored bytes do not hash to the digest in their key.
    #[error("integrity violation: {key} hashes to {actual}")]
    Integrity { key: StorageKey, actual: String },

    /// The requested backend is not compiled in.
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl StorageError {
    pub(crate) fn backend(operation: &'static str, message: impl std::fmt::Display) -> Self {
        Self::Backend {
            operation,
            message: message.to_string(),
        }
    }
}
