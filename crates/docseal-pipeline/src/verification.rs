//! # Verification Service
//!
//! Confirms a document by its identifier: bumps the verification counter
//! in one atomic catalog step and returns the record with its signer
//! attribution. Hidden documents stay verifiable. The stored signature is
//! trusted as cataloged; nothing is re-hashed here.

use std::sync::Arc;

use docseal_core::{DocumentId, DocumentView};
use docseal_index::{AttributionDirectory, DocumentRepository};

use crate::error::{PipelineError, PipelineStage};

#[derive(Clone)]
pub struct VerificationService {
    catalog: Arc<dyn DocumentRepository>,
    directory: Arc<dyn AttributionDirectory>,
}

impl VerificationService {
    pub fn new(
        catalog: Arc<dyn DocumentRepository>,
        directory: Arc<dyn AttributionDirectory>,
    ) -> Self {
        Self { catalog, directory }
    }

    pub async fn verify(&self, id: &DocumentId) -> Result<DocumentView, PipelineError> {
        let stage = PipelineStage::Verification;
        let doc = self
            .catalog
            .increment_verification(id)
            .await
            .map_err(PipelineError::catalog(stage))?
            .ok_or(PipelineError::NotFound { stage, id: *id })?;

        let user = self
            .directory
            .user(&doc.signed_by_user)
            .await
            .map_err(PipelineError::catalog(stage))?;
        if user.is_none() {
            tracing::warn!(id = %doc.id, user = %doc.signed_by_user, "signing user not in directory");
        }
        let team = match &doc.signed_by_team {
            Some(team) => self
                .directory
                .team(team)
                .await
                .map_err(PipelineError::catalog(stage))?,
            None => None,
        };

        tracing::info!(id = %doc.id, count = doc.verification_count, "document verified");
        Ok(DocumentView::new(&doc, user, team))
    }
}

impl std::fmt::Debug for VerificationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationService").finish_non_exhaustive()
    }
}
