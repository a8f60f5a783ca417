//! # Document Repository Trait
//!
//! The catalog is the arbiter of the dedup invariant: `create` must fail
//! with [`IndexError::DuplicateContentHash`] when another record holds the
//! same content hash, even if both callers passed `find_by_content_hash`
//! first. `increment_verification` must be a single atomic step.

use async_trait::async_trait;
use docseal_core::{ContentDigest, Document, DocumentId, StorageKey};

use crate::error::IndexError;
use crate::query::{DocumentQuery, OwnerScope, Page};

#[async_trait]
pub trait DocumentRepository: Send + Sync {
    async fn find_by_content_hash(
        &self,
        hash: &ContentDigest,
    ) -> Result<Option<Document>, IndexError>;

    /// Insert a new record. Fails with `DuplicateContentHash` if the hash
    /// is taken.
    async fn create(&self, doc: &Document) -> Result<(), IndexError>;

    async fn find_by_id(&self, id: &DocumentId) -> Result<Option<Document>, IndexError>;

    /// Add one to `verification_count` and return the updated record.
    async fn increment_verification(
        &self,
        id: &DocumentId,
    ) -> Result<Option<Document>, IndexError>;

    /// Set the hidden flag if the document exists within `scope`.
    /// Returns whether a record matched.
    async fn set_hidden(
        &self,
        id: &DocumentId,
        hidden: bool,
        scope: OwnerScope,
    ) -> Result<bool, IndexError>;

    async fn list(&self, query: &DocumentQuery) -> Result<Page<Document>, IndexError>;

    /// Remove a record and return it.
    async fn delete(&self, id: &DocumentId) -> Result<Option<Document>, IndexError>;

    /// Whether any record points at `key`.
    async fn storage_key_in_use(&self, key: &StorageKey) -> Result<bool, IndexError>;
}
