//! # docseal-crypto — Document Signing Primitives
//!
//! RSA PKCS#1 v1.5 signatures over the SHA-256 digest of a document's
//! uploaded bytes, base64 encoded for storage and embedding.
//!
//! ## Key Material
//!
//! Keys come from a [`KeyProvider`]. The pipeline never sees a raw private
//! key, only the provider's ability to sign a digest. Providers:
//!
//! - [`PemFileKeyProvider`]: PKCS#8 PEM private key on disk, with an
//!   optional SPKI public key that must match it.
//! - [`LocalKeyProvider`]: in-memory key, generated or supplied. Used by
//!   tests and by `docseal keygen`.
//!
//! ## Security Invariants
//!
//! - Signatures are computed over the bytes as uploaded, before any
//!   annotation touches them.
//! - Private keys are zeroized on drop by the `rsa` crate.
//! - `KeyProvider` is `Send + Sync` for use across async tasks.

pub mod error;
pub mod key_provider;
pub mod signer;

pub use error::CryptoError;
pub use key_provider::{public_key_from_pem, KeyProvider, LocalKeyProvider, PemFileKeyProvider};
pub use rsa::{RsaPrivateKey, RsaPublicKey};
pub use signer::{verify_digest, verify_signature, RsaSignature, Signer};
