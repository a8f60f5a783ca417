//! # Pipeline Error Types
//!
//! Every failure names the stage it happened in. The variants follow the
//! failure taxonomy callers map onto their transport:
//!
//! | Variant | Taxonomy |
//! |---|---|
//! | `Io` | IOFailure |
//! | `KeyUnavailable`, `Signing` | KeyUnavailable / SigningFailure |
//! | `Annotation` | AnnotationFailure |
//! | `Storage` | StorageFailure |
//! | `DuplicateContentHash` | recoverable, normally turned into a duplicate outcome |
//! | `NotFound` | NotFound |
//! | `Catalog` | catalog backend failure |

use docseal_annotate::AnnotationError;
use docseal_core::{ContentDigest, DocumentId};
use docseal_crypto::CryptoError;
use docseal_index::IndexError;
use docseal_store::StorageError;
use thiserror::Error;

/// Position in the signing state machine, or the service operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    Received,
    Hashed,
    DedupChecked,
    Signed,
    Annotated,
    Stored,
    Cataloged,
    Verification,
    Visibility,
    Removal,
    Retrieval,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Hashed => "hashed",
            Self::DedupChecked => "dedup_checked",
            Self::Signed => "signed",
            Self::Annotated => "annotated",
            Self::Stored => "stored",
            Self::Cataloged => "cataloged",
            Self::Verification => "verification",
            Self::Visibility => "visibility",
            Self::Removal => "removal",
            Self::Retrieval => "retrieval",
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("[{stage}] I/O failure: {source}")]
    Io {
        stage: PipelineStage,
        #[source]
        source: std::io::Error,
    },

    #[error("[{stage}] signing key unavailable: {source}")]
    KeyUnavailable {
        stage: PipelineStage,
        #[source]
        source: CryptoError,
    },

    #[error("[{stage}] signing failed: {source}")]
    Signing {
        stage: PipelineStage,
        #[source]
        source: CryptoError,
    },

    #[error("[{stage}] annotation failed: {source}")]
    Annotation {
        stage: PipelineStage,
        #[source]
        source: AnnotationError,
    },

    #[error("[{stage}] storage failure: {source}")]
    Storage {
        stage: PipelineStage,
        #[source]
        source: StorageError,
    },

    #[error("[{stage}] content hash {hash} is already cataloged")]
    DuplicateContentHash {
        stage: PipelineStage,
        hash: ContentDigest,
    },

    #[error("[{stage}] document {id} not found")]
    NotFound { stage: PipelineStage, id: DocumentId },

    #[error("[{stage}] catalog error: {source}")]
    Catalog {
        stage: PipelineStage,
        #[source]
        source: IndexError,
    },
}

impl PipelineError {
    pub fn stage(&self) -> PipelineStage {
        match self {
            Self::Io { stage, .. }
            | Self::KeyUnavailable { stage, .. }
            | Self::Signing { stage, .. }
            | Self::Annotation { stage, .. }
            | Self::Storage { stage, .. }
            | Self::DuplicateContentHash { stage, .. }
            | Self::NotFound { stage, .. }
            | Self::Catalog { stage, .. } => *stage,
        }
    }

    /// Short machine-readable name of the failure class.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Io { .. } => "io_failure",
            Self::KeyUnavailable { .. } => "key_unavailable",
            Self::Signing { .. } => "signing_failure",
            Self::Annotation { .. } => "annotation_failure",
            Self::Storage { .. } => "storage_failure",
            Self::DuplicateContentHash { .. } => "duplicate_content_hash",
            Self::NotFound { .. } => "not_found",
            Self::Catalog { .. } => "catalog_failure",
        }
    }

    pub(crate) fn io(stage: PipelineStage) -> impl FnOnce(std::io::Error) -> Self {
        move |source| Self::Io { stage, source }
    }

    pub(crate) fn storage(stage: PipelineStage) -> impl FnOnce(StorageError) -> Self {
        move |source| Self::Storage { stage, source }
    }

    pub(crate) fn catalog(stage: PipelineStage) -> impl FnOnce(IndexError) -> Self {
        move |source| match source {
            IndexError::DuplicateContentHash(hash) => Self::DuplicateContentHash { stage, hash },
            source => Self::Catalog { stage, source },
        }
    }

    pub(crate) fn crypto(stage: PipelineStage) -> impl FnOnce(CryptoError) -> Self {
        move |source| match source {
            CryptoError::KeyUnavailable(_) => Self::KeyUnavailable { stage, source },
            source => Self::Signing { stage, source },
        }
    }
}
