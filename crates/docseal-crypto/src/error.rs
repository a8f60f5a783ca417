//! # Cryptographic Error Types
//!
//! Structured errors for all cryptographic operations in `docseal-crypto`.

use thiserror::Error;

/// Errors from key loading, signing and verification.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// The provider could not supply a usable key.
    #[error("signing key unavailable: {0}")]
    KeyUnavailable(String),

    /// The RSA signing operation itself failed.
    #[error("signing failed: {0}")]
    SigningFailure(String),

    /// The signature does not match the bytes under the given public key.
    #[error("signature verification failed: {0}")]
    VerificationFailed(String),

    /// The signature text is not valid base64.
    #[error("invalid signature encoding: {0}")]
    InvalidSignatureEncoding(String),

    /// Key serialization failed.
    #[error("key encoding failed: {0}")]
    KeyEncoding(String),
}
