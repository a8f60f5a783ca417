//! # docseal-core — Foundational Types for docseal
//!
//! Defines the record and identifier types shared by every other crate in
//! the workspace. It depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** `DocumentId`, `UserId` and
//!    `TeamId` are distinct types. You cannot pass a team where a user is
//!    expected.
//!
//! 2. **Two digests, two roles.** The same [`ContentDigest`] type is used for
//!    the pre-signing dedup hash and the post-annotation storage hash. Only the
//!    former is a catalog key. The latter only ever appears inside a
//!    [`StorageKey`].
//!
//! 3. **One mark format.** [`ArtifactMark`] owns the `ID:<id>;SIG:<sig>` text
//!    that is embedded into artifacts, both for writing and for reading it back.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `docseal-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod config;
pub mod digest;
pub mod document;
pub mod error;
pub mod identity;
pub mod mark;
pub mod storage_key;

// Re-export primary types for ergonomic imports.
pub use config::{ConfigError, EnvSource};
pub use digest::{sha256_digest, ContentDigest, ContentHasher};
pub use document::{Document, DocumentView, FileKind, TeamSummary, UserSummary};
pub use error::ValidationError;
pub use identity::{DocumentId, TeamId, UserId};
pub use mark::ArtifactMark;
pub use storage_key::StorageKey;
