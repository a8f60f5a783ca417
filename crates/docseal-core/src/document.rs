//! # Document Records
//!
//! The catalog record for a signed artifact and the read view returned by
//! verification.
//!
//! ## Lifecycle
//!
//! A [`Document`] is created once by the signing pipeline after its
//! artifact has been stored. Afterwards only `is_hidden`,
//! `verification_count` and `updated_at` change. Administrative removal
//! deletes it together with its stored artifact.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::digest::ContentDigest;
use crate::identity::{DocumentId, TeamId, UserId};
use crate::storage_key::{sanitize_extension, StorageKey};

/// Timestamp layout used in document views.
pub const VIEW_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// What the annotator can do with a file, derived from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    Png,
    Jpeg,
    Pdf,
    /// Anything else. Receives metadata only, when its container allows it.
    Other,
}

impl FileKind {
    /// Classify by extension, with or without the leading dot.
    pub fn from_extension(ext: &str) -> Self {
        match sanitize_extension(ext).as_str() {
            ".png" => Self::Png,
            ".jpg" | ".jpeg" => Self::Jpeg,
            ".pdf" => Self::Pdf,
            _ => Self::Other,
        }
    }

    /// Kind category: `image`, `pdf` or `other`.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Png | Self::Jpeg => "image",
            Self::Pdf => "pdf",
            Self::Other => "other",
        }
    }

    /// MIME type used when storing the artifact.
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Pdf => "application/pdf",
            Self::Other => "application/octet-stream",
        }
    }
}

/// The extension of `name` including its dot, or `""`.
pub fn extension_of(name: &str) -> &str {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    match base.rfind('.') {
        Some(0) | None => "",
        Some(i) => &base[i..],
    }
}

/// Catalog record for one signed artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub original_name: String,
    pub file_format: FileKind,
    /// Normalized original extension, e.g. `.jpg`. Empty when the upload had none.
    pub extension: String,
    /// Digest of the bytes as uploaded. Unique across the catalog.
    pub content_hash: ContentDigest,
    /// Where the final artifact lives in the storage backend.
    pub storage_key: StorageKey,
    /// Base64 RSA PKCS#1 v1.5 signature over the uploaded bytes.
    pub signature: String,
    pub verification_count: i64,
    pub is_hidden: bool,
    pub signed_by_user: UserId,
    pub signed_by_team: Option<TeamId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Minimal projection of a user, owned by the external user subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: UserId,
    pub full_name: String,
    pub email: String,
}

/// Minimal projection of a team, owned by the external user subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamSummary {
    pub id: TeamId,
    pub name: String,
}

/// Read view of a document with its attribution hydrated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentView {
    pub id: DocumentId,
    pub original_name: String,
    pub file_format: String,
    pub kind: FileKind,
    pub hash: ContentDigest,
    pub signature: String,
    pub verification_count: i64,
    pub is_hidden: bool,
    pub signed_by_user: UserSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signed_by_team: Option<TeamSummary>,
    pub created_at: String,
    pub updated_at: String,
}

impl DocumentView {
    /// Build a view from a record and its resolved attribution.
    ///
    /// A user that the directory no longer knows is rendered with empty
    /// name and email rather than failing the read.
    pub fn new(doc: &Document, user: Option<UserSummary>, team: Option<TeamSummary>) -> Self {
        let signed_by_user = user.unwrap_or_else(|| UserSummary {
            id: doc.signed_by_user,
            full_name: String::new(),
            email: String::new(),
        });
        Self {
            id: doc.id,
            original_name: doc.original_name.clone(),
            file_format: doc.extension.clone(),
            kind: doc.file_format,
            hash: doc.content_hash,
            signature: doc.signature.clone(),
            verification_count: doc.verification_count,
            is_hidden: doc.is_hidden,
            signed_by_user,
            signed_by_team: team,
            created_at: doc.created_at.format(VIEW_TIME_FORMAT).to_string(),
            updated_at: doc.updated_at.format(VIEW_TIME_FORMAT).to_string(),
        }
    }
}
