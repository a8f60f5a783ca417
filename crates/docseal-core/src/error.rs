//! # Error Types
//!
//! Parse and validation failures for the foundational types. Every
//! constructor that accepts untrusted text returns one of these.

use thiserror::Error;

/// A value failed validation while being parsed into a core type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Not a 64-character lowercase or uppercase hex SHA-256 digest.
    #[error("invalid content digest: {0}")]
    InvalidDigest(String),

    /// Not a UUID.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Metadata comment did not match `ID:<uuid>;SIG:<base64>`.
    #[error("malformed artifact mark: {0}")]
    MalformedMark(String),

    /// Storage key is not `<64 hex><extension>`.
    #[error("invalid storage key: {0}")]
    InvalidStorageKey(String),
}
