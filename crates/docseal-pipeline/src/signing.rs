//! # Signing Pipeline
//!
//! ```text
//! Received → Hashed → DedupChecked ─┬─ Duplicate                          (terminal)
//!                                   └─ Signed → Annotated → Stored → Cataloged (terminal)
//! ```
//!
//! The upload is streamed into a private working directory and hashed on
//! the way. That pre-annotation digest is the dedup key and the input to
//! the signature. The artifact is then stamped and marked in place, hashed
//! again for its storage key, stored and finally cataloged.
//!
//! The working directory is a [`TempDir`] owned by the invocation, so it is
//! removed on every exit path, including an early return or the future
//! being dropped. Blocking annotation work holds its own reference, so a
//! dropped future removes the directory only once that work has finished.
//!
//! Two invocations racing on identical content both pass the dedup check;
//! the catalog's uniqueness constraint picks the winner and the loser
//! reports a duplicate. The loser's stored artifact, if any, stays behind
//! under its own content-addressed key.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use docseal_annotate::{ArtifactAnnotator, MetadataOutcome};
use docseal_core::document::extension_of;
use docseal_core::storage_key::sanitize_extension;
use docseal_core::{
    sha256_digest, ArtifactMark, ContentDigest, ContentHasher, Document, DocumentId, FileKind,
    StorageKey, TeamId, UserId,
};
use docseal_crypto::Signer;
use docseal_index::DocumentRepository;
use docseal_store::StorageBackend;
use tempfile::TempDir;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineStage};

const READ_CHUNK: usize = 64 * 1024;

/// Who uploaded what.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub original_name: String,
    pub user: UserId,
    pub team: Option<TeamId>,
}

/// Result of a successful invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SigningOutcome {
    /// Novel content, now signed, stored and cataloged.
    Created(Document),
    /// Content already cataloged. Nothing was written.
    Duplicate(Document),
}

impl SigningOutcome {
    pub fn document(&self) -> &Document {
        match self {
            Self::Created(doc) | Self::Duplicate(doc) => doc,
        }
    }

    pub fn into_document(self) -> Document {
        match self {
            Self::Created(doc) | Self::Duplicate(doc) => doc,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate(_))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created(_) => "created",
            Self::Duplicate(_) => "duplicate",
        }
    }
}

/// Orchestrates hashing, dedup, signing, annotation, storage and cataloging.
#[derive(Clone)]
pub struct SigningPipeline {
    signer: Signer,
    annotator: ArtifactAnnotator,
    storage: Arc<dyn StorageBackend>,
    catalog: Arc<dyn DocumentRepository>,
    temp_root: Option<PathBuf>,
}

impl std::fmt::Debug for SigningPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningPipeline")
            .field("signer", &self.signer)
            .field("annotator", &self.annotator)
            .field("storage", &self.storage.backend_name())
            .field("temp_root", &self.temp_root)
            .finish()
    }
}

/// One uploaded file inside its working directory.
struct Received {
    /// Removed when the last reference drops, together with everything
    /// written into it.
    workdir: Arc<TempDir>,
    path: PathBuf,
    extension: String,
    kind: FileKind,
}

impl SigningPipeline {
    pub fn new(
        signer: Signer,
        annotator: ArtifactAnnotator,
        storage: Arc<dyn StorageBackend>,
        catalog: Arc<dyn DocumentRepository>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            signer,
            annotator,
            storage,
            catalog,
            temp_root: config.temp_dir.clone(),
        }
    }

    /// Run one upload through the pipeline.
    pub async fn sign_upload<R>(
        &self,
        request: &UploadRequest,
        upload: R,
    ) -> Result<SigningOutcome, PipelineError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let result = self.run(request, upload).await;
        match &result {
            Ok(outcome) => tracing::info!(
                outcome = outcome.as_str(),
                id = %outcome.document().id,
                name = %request.original_name,
                user = %request.user,
                "upload processed"
            ),
            Err(err) => tracing::error!(
                stage = %err.stage(),
                kind = err.kind(),
                error = %err,
                name = %request.original_name,
                user = %request.user,
                "signing pipeline failed"
            ),
        }
        result
    }

    async fn run<R>(&self, request: &UploadRequest, upload: R) -> Result<SigningOutcome, PipelineError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let received = self.receive(&request.original_name)?;
        tracing::debug!(stage = %PipelineStage::Received, path = %received.path.display());

        let (content_hash, size) = spool(upload, &received.path)
            .await
            .map_err(PipelineError::io(PipelineStage::Hashed))?;
        tracing::debug!(stage = %PipelineStage::Hashed, hash = %content_hash, size);

        if let Some(existing) = self
            .catalog
            .find_by_content_hash(&content_hash)
            .await
            .map_err(PipelineError::catalog(PipelineStage::DedupChecked))?
        {
            return Ok(SigningOutcome::Duplicate(existing));
        }
        tracing::debug!(stage = %PipelineStage::DedupChecked, hash = %content_hash, "content is new");

        let signature = self
            .signer
            .sign_prehashed(&content_hash)
            .map_err(PipelineError::crypto(PipelineStage::Signed))?;
        let id = DocumentId::new();
        tracing::debug!(stage = %PipelineStage::Signed, id = %id);

        let mark = ArtifactMark::new(id, signature.clone());
        let metadata = self.annotate(&received, mark).await?;
        tracing::debug!(stage = %PipelineStage::Annotated, id = %id, metadata = ?metadata);

        let artifact = tokio::fs::read(&received.path)
            .await
            .map_err(PipelineError::io(PipelineStage::Stored))?;
        let storage_key = StorageKey::new(&sha256_digest(&artifact), &received.extension);
        let put = self
            .storage
            .put(&storage_key, artifact, received.kind.content_type())
            .await
            .map_err(PipelineError::storage(PipelineStage::Stored))?;
        tracing::debug!(stage = %PipelineStage::Stored, key = %storage_key, put = ?put);

        let now = Utc::now();
        let document = Document {
            id,
            original_name: request.original_name.clone(),
            file_format: received.kind,
            extension: received.extension.clone(),
            content_hash,
            storage_key,
            signature,
            verification_count: 0,
            is_hidden: false,
            signed_by_user: request.user,
            signed_by_team: request.team,
            created_at: now,
            updated_at: now,
        };
        match self.catalog.create(&document).await {
            Ok(()) => {
                tracing::debug!(stage = %PipelineStage::Cataloged, id = %id);
                Ok(SigningOutcome::Created(document))
            }
            Err(docseal_index::IndexError::DuplicateContentHash(hash)) => {
                tracing::info!(hash = %hash, id = %id, "lost dedup race; returning existing document");
                self.existing(&hash).await
            }
            Err(err) => Err(PipelineError::catalog(PipelineStage::Cataloged)(err)),
        }
    }

    fn receive(&self, original_name: &str) -> Result<Received, PipelineError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("docseal-");
        let workdir = match &self.temp_root {
            Some(root) => {
                std::fs::create_dir_all(root).map_err(PipelineError::io(PipelineStage::Received))?;
                builder.tempdir_in(root)
            }
            None => builder.tempdir(),
        }
        .map_err(PipelineError::io(PipelineStage::Received))?;

        let extension = sanitize_extension(extension_of(original_name));
        let path = workdir.path().join(format!("upload{extension}"));
        Ok(Received {
            workdir: Arc::new(workdir),
            path,
            kind: FileKind::from_extension(&extension),
            extension,
        })
    }

    async fn annotate(
        &self,
        received: &Received,
        mark: ArtifactMark,
    ) -> Result<MetadataOutcome, PipelineError> {
        let annotator = self.annotator.clone();
        let path = received.path.clone();
        let kind = received.kind;
        let workdir = received.workdir.clone();
        tokio::task::spawn_blocking(move || {
            let outcome = annotator.annotate(&path, kind, &mark);
            drop(workdir);
            outcome
        })
            .await
            .map_err(|e| PipelineError::Io {
                stage: PipelineStage::Annotated,
                source: std::io::Error::other(e),
            })?
            .map_err(|source| PipelineError::Annotation {
                stage: PipelineStage::Annotated,
                source,
            })
    }

    async fn existing(&self, hash: &ContentDigest) -> Result<SigningOutcome, PipelineError> {
        match self
            .catalog
            .find_by_content_hash(hash)
            .await
            .map_err(PipelineError::catalog(PipelineStage::Cataloged))?
        {
            Some(doc) => Ok(SigningOutcome::Duplicate(doc)),
            // The winner was removed between our insert and this lookup.
            None => Err(PipelineError::DuplicateContentHash {
                stage: PipelineStage::Cataloged,
                hash: *hash,
            }),
        }
    }
}

/// Copy `upload` to `path`, hashing as it goes.
async fn spool<R>(mut upload: R, path: &Path) -> std::io::Result<(ContentDigest, u64)>
where
    R: AsyncRead + Unpin + Send,
{
    let mut file = tokio::fs::File::create(path).await?;
    let mut hasher = ContentHasher::new();
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        let n = upload.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        file.write_all(&buf[..n]).await?;
    }
    file.flush().await?;
    let size = hasher.bytes_hashed();
    Ok((hasher.finalize(), size))
}
