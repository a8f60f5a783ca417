//! # docseal-store — Content-Addressed Artifact Storage
//!
//! One async trait, [`StorageBackend`], with two implementations:
//!
//! - [`LocalStorage`]: files under a root directory, created on open.
//! - `S3Storage` (feature `s3`, on by default): an S3-compatible bucket,
//!   verified or created when connecting.
//!
//! Keys are [`StorageKey`](docseal_core::StorageKey)s derived from the
//! stored bytes, which makes `put` idempotent. Every call is bounded by the
//! configured timeout and failures surface once, without retry.

pub mod backend;
pub mod config;
pub mod error;
pub mod local;
#[cfg(feature = "s3")]
pub mod s3;

pub use backend::{open_backend, PutOutcome, StorageBackend};
pub use config::{S3Config, StorageConfig, StorageMode};
pub use error::StorageError;
pub use local::LocalStorage;
#[cfg(feature = "s3")]
pub use s3::S3Storage;
