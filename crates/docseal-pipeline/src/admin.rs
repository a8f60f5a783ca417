//! # Document Administration
//!
//! Visibility changes, listings, artifact retrieval and removal. Callers
//! decide who may do what; this layer only enforces the owner scope it is
//! given.

use std::sync::Arc;

use docseal_core::{Document, DocumentId};
use docseal_index::{DocumentQuery, DocumentRepository, OwnerScope, Page};
use docseal_store::StorageBackend;

use crate::error::{PipelineError, PipelineStage};

#[derive(Clone)]
pub struct DocumentAdmin {
    catalog: Arc<dyn DocumentRepository>,
    storage: Arc<dyn StorageBackend>,
}

impl DocumentAdmin {
    pub fn new(catalog: Arc<dyn DocumentRepository>, storage: Arc<dyn StorageBackend>) -> Self {
        Self { catalog, storage }
    }

    pub async fn find(&self, id: &DocumentId) -> Result<Document, PipelineError> {
        let stage = PipelineStage::Retrieval;
        self.catalog
            .find_by_id(id)
            .await
            .map_err(PipelineError::catalog(stage))?
            .ok_or(PipelineError::NotFound { stage, id: *id })
    }

    pub async fn list(&self, query: &DocumentQuery) -> Result<Page<Document>, PipelineError> {
        self.catalog
            .list(query)
            .await
            .map_err(PipelineError::catalog(PipelineStage::Retrieval))
    }

    /// Hide or show a document. A document outside `scope` is reported as
    /// not found.
    pub async fn set_hidden(
        &self,
        id: &DocumentId,
        hidden: bool,
        scope: OwnerScope,
    ) -> Result<(), PipelineError> {
        let stage = PipelineStage::Visibility;
        let matched = self
            .catalog
            .set_hidden(id, hidden, scope)
            .await
            .map_err(PipelineError::catalog(stage))?;
        if !matched {
            return Err(PipelineError::NotFound { stage, id: *id });
        }
        tracing::info!(id = %id, hidden, "document visibility changed");
        Ok(())
    }

    /// The stored artifact bytes for a document.
    pub async fn artifact(&self, doc: &Document) -> Result<Vec<u8>, PipelineError> {
        let stage = PipelineStage::Retrieval;
        self.storage
            .get(&doc.storage_key)
            .await
            .map_err(PipelineError::storage(stage))?
            .ok_or(PipelineError::NotFound { stage, id: doc.id })
    }

    /// Delete the catalog entry, then its stored artifact unless another
    /// document still points at the same key.
    pub async fn remove(&self, id: &DocumentId) -> Result<Document, PipelineError> {
        let stage = PipelineStage::Removal;
        let doc = self
            .catalog
            .delete(id)
            .await
            .map_err(PipelineError::catalog(stage))?
            .ok_or(PipelineError::NotFound { stage, id: *id })?;

        let shared = self
            .catalog
            .storage_key_in_use(&doc.storage_key)
            .await
            .map_err(PipelineError::catalog(stage))?;
        if shared {
            tracing::info!(id = %id, key = %doc.storage_key, "document removed; artifact still referenced");
            return Ok(doc);
        }
        self.storage
            .remove(&doc.storage_key)
            .await
            .map_err(PipelineError::storage(stage))?;
        tracing::info!(id = %id, key = %doc.storage_key, "document and artifact removed");
        Ok(doc)
    }
}

impl std::fmt::Debug for DocumentAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentAdmin")
            .field("storage", &self.storage.backend_name())
            .finish_non_exhaustive()
    }
}
