//! # PostgreSQL Catalog
//!
//! All statements operate on the `documents` table. Content-hash uniqueness
//! is enforced by the `documents_content_hash_key` constraint, and the
//! verification counter is bumped with a single `UPDATE ... RETURNING`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use docseal_core::{
    ContentDigest, Document, DocumentId, FileKind, StorageKey, TeamId, UserId,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::IndexError;
use crate::query::{DocumentQuery, OwnerScope, Page};
use crate::repository::DocumentRepository;

const CONTENT_HASH_CONSTRAINT: &str = "documents_content_hash_key";

const COLUMNS: &str = "id, original_name, file_format, content_hash, storage_key, signature, \
     verification_count, is_hidden, signed_by_user_id, signed_by_team_id, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct PgDocumentRepository {
    pool: PgPool,
}

impl PgDocumentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn scope_binds(scope: OwnerScope) -> (Option<Uuid>, Option<Uuid>) {
    match scope {
        OwnerScope::Any => (None, None),
        OwnerScope::User(user) => (Some(user.0), None),
        OwnerScope::Team(team) => (None, Some(team.0)),
    }
}

fn is_duplicate_hash(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            db.is_unique_violation()
                && db
                    .constraint()
                    .map_or(true, |c| c == CONTENT_HASH_CONSTRAINT)
        }
        _ => false,
    }
}

#[async_trait]
impl DocumentRepository for PgDocumentRepository {
    async fn find_by_content_hash(
        &self,
        hash: &ContentDigest,
    ) -> Result<Option<Document>, IndexError> {
        let row = sqlx::query_as::<_, DocumentRow>(&format!(
            "SELECT {COLUMNS} FROM documents WHERE content_hash = $1"
        ))
        .bind(hash.to_hex())
        .fetch_optional(&self.pool)
        .await?;
        row.map(DocumentRow::into_document).transpose()
    }

    async fn create(&self, doc: &Document) -> Result<(), IndexError> {
        let result = sqlx::query(
            "INSERT INTO documents (id, original_name, file_format, content_hash, storage_key,
             signature, verification_count, is_hidden, signed_by_user_id, signed_by_team_id,
             created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(doc.id.0)
        .bind(&doc.original_name)
        .bind(&doc.extension)
        .bind(doc.content_hash.to_hex())
        .bind(doc.storage_key.as_str())
        .bind(&doc.signature)
        .bind(doc.verification_count)
        .bind(doc.is_hidden)
        .bind(doc.signed_by_user.0)
        .bind(doc.signed_by_team.map(|t| t.0))
        .bind(doc.created_at)
        .bind(doc.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) if is_duplicate_hash(&err) => {
                Err(IndexError::DuplicateContentHash(doc.content_hash))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn find_by_id(&self, id: &DocumentId) -> Result<Option<Document>, IndexError> {
        let row = sqlx::query_as::<_, DocumentRow>(&format!(
            "SELECT {COLUMNS} FROM documents WHERE id = $1"
        ))
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;
        row.map(DocumentRow::into_document).transpose()
    }

    async fn increment_verification(
        &self,
        id: &DocumentId,
    ) -> Result<Option<Document>, IndexError> {
        let row = sqlx::query_as::<_, DocumentRow>(&format!(
            "UPDATE documents SET verification_count = verification_count + 1, updated_at = now()
             WHERE id = $1 RETURNING {COLUMNS}"
        ))
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;
        row.map(DocumentRow::into_document).transpose()
    }

    async fn set_hidden(
        &self,
        id: &DocumentId,
        hidden: bool,
        scope: OwnerScope,
    ) -> Result<bool, IndexError> {
        let (user, team) = scope_binds(scope);
        let result = sqlx::query(
            "UPDATE documents SET is_hidden = $1, updated_at = now()
             WHERE id = $2
               AND ($3::uuid IS NULL OR signed_by_user_id = $3)
               AND ($4::uuid IS NULL OR signed_by_team_id = $4)",
        )
        .bind(hidden)
        .bind(id.0)
        .bind(user)
        .bind(team)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, query: &DocumentQuery) -> Result<Page<Document>, IndexError> {
        const FILTER: &str = "($1::bool IS NULL OR is_hidden = $1)
               AND ($2::uuid IS NULL OR signed_by_user_id = $2)
               AND ($3::uuid IS NULL OR signed_by_team_id = $3)";
        let hidden = query.visibility.hidden_filter();
        let (user, team) = scope_binds(query.scope);

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM documents WHERE {FILTER}"))
            .bind(hidden)
            .bind(user)
            .bind(team)
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query_as::<_, DocumentRow>(&format!(
            "SELECT {COLUMNS} FROM documents WHERE {FILTER}
             ORDER BY created_at DESC, id DESC LIMIT $4 OFFSET $5"
        ))
        .bind(hidden)
        .bind(user)
        .bind(team)
        .bind(i64::from(query.limit()))
        .bind(i64::try_from(query.offset()).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(DocumentRow::into_document)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page {
            items,
            total: u64::try_from(total).unwrap_or(0),
            page: query.page(),
            limit: query.limit(),
        })
    }

    async fn delete(&self, id: &DocumentId) -> Result<Option<Document>, IndexError> {
        let row = sqlx::query_as::<_, DocumentRow>(&format!(
            "DELETE FROM documents WHERE id = $1 RETURNING {COLUMNS}"
        ))
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;
        row.map(DocumentRow::into_document).transpose()
    }

    async fn storage_key_in_use(&self, key: &StorageKey) -> Result<bool, IndexError> {
        let in_use: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM documents WHERE storage_key = $1)")
                .bind(key.as_str())
                .fetch_one(&self.pool)
                .await?;
        Ok(in_use)
    }
}

// ─── Row mapping ───────────────────────────────────────────────────

#[derive(Debug, sqlx::FromRow)]
struct DocumentRow {
    id: Uuid,
    original_name: String,
    file_format: String,
    content_hash: String,
    storage_key: String,
    signature: String,
    verification_count: i64,
    is_hidden: bool,
    signed_by_user_id: Uuid,
    signed_by_team_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl DocumentRow {
    fn into_document(self) -> Result<Document, IndexError> {
        let content_hash = ContentDigest::from_hex(self.content_hash.trim()).map_err(|e| {
            tracing::error!(id = %self.id, error = %e, "invalid content_hash in documents row");
            IndexError::CorruptRow(format!("document {}: {e}", self.id))
        })?;
        let storage_key = StorageKey::try_from(self.storage_key).map_err(|e| {
            tracing::error!(id = %self.id, error = %e, "invalid storage_key in documents row");
            IndexError::CorruptRow(format!("document {}: {e}", self.id))
        })?;
        Ok(Document {
            id: DocumentId(self.id),
            original_name: self.original_name,
            file_format: FileKind::from_extension(&self.file_format),
            extension: self.file_format,
            content_hash,
            storage_key,
            signature: self.signature,
            verification_count: self.verification_count,
            is_hidden: self.is_hidden,
            signed_by_user: UserId(self.signed_by_user_id),
            signed_by_team: self.signed_by_team_id.map(TeamId),
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
