//! # In-Memory Catalog
//!
//! Backs tests and deployments without `DATABASE_URL`. A single mutex guards
//! both maps so the hash uniqueness check and the insert happen together.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use docseal_core::{ContentDigest, Document, DocumentId, StorageKey};
use parking_lot::Mutex;

use crate::error::IndexError;
use crate::query::{DocumentQuery, OwnerScope, Page};
use crate::repository::DocumentRepository;

#[derive(Debug, Default)]
struct Tables {
    by_id: HashMap<DocumentId, Document>,
    by_hash: HashMap<ContentDigest, DocumentId>,
}

#[derive(Debug, Default)]
pub struct InMemoryDocumentRepository {
    tables: Mutex<Tables>,
}

impl InMemoryDocumentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tables.lock().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl DocumentRepository for InMemoryDocumentRepository {
    async fn find_by_content_hash(
        &self,
        hash: &ContentDigest,
    ) -> Result<Option<Document>, IndexError> {
        let tables = self.tables.lock();
        Ok(tables
            .by_hash
            .get(hash)
            .and_then(|id| tables.by_id.get(id))
            .cloned())
    }

    async fn create(&self, doc: &Document) -> Result<(), IndexError> {
        let mut tables = self.tables.lock();
        if tables.by_hash.contains_key(&doc.content_hash) {
            return Err(IndexError::DuplicateContentHash(doc.content_hash));
        }
        tables.by_hash.insert(doc.content_hash, doc.id);
        tables.by_id.insert(doc.id, doc.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &DocumentId) -> Result<Option<Document>, IndexError> {
        Ok(self.tables.lock().by_id.get(id).cloned())
    }

    async fn increment_verification(
        &self,
        id: &DocumentId,
    ) -> Result<Option<Document>, IndexError> {
        let mut tables = self.tables.lock();
        Ok(tables.by_id.get_mut(id).map(|doc| {
            doc.verification_count += 1;
            doc.updated_at = Utc::now();
            doc.clone()
        }))
    }

    async fn set_hidden(
        &self,
        id: &DocumentId,
        hidden: bool,
        scope: OwnerScope,
    ) -> Result<bool, IndexError> {
        let mut tables = self.tables.lock();
        match tables.by_id.get_mut(id) {
            Some(doc) if scope.admits(doc) => {
                doc.is_hidden = hidden;
                doc.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list(&self, query: &DocumentQuery) -> Result<Page<Document>, IndexError> {
        let tables = self.tables.lock();
        let mut matching: Vec<&Document> =
            tables.by_id.values().filter(|d| query.admits(d)).collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = matching.len() as u64;
        let offset = usize::try_from(query.offset()).unwrap_or(usize::MAX);
        let items = matching
            .into_iter()
            .skip(offset)
            .take(query.limit() as usize)
            .cloned()
            .collect();
        Ok(Page {
            items,
            total,
            page: query.page(),
            limit: query.limit(),
        })
    }

    async fn delete(&self, id: &DocumentId) -> Result<Option<Document>, IndexError> {
        let mut tables = self.tables.lock();
        let removed = tables.by_id.remove(id);
        if let Some(doc) = &removed {
            tables.by_hash.remove(&doc.content_hash);
        }
        Ok(removed)
    }

    async fn storage_key_in_use(&self, key: &StorageKey) -> Result<bool, IndexError> {
        Ok(self
            .tables
            .lock()
            .by_id
            .values()
            .any(|d| &d.storage_key == key))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;
    use docseal_core::{sha256_digest, FileKind, TeamId, UserId};
    use uuid::Uuid;

    use super::*;
    use crate::query::Visibility;

    fn doc(seed: &str, user: UserId, team: Option<TeamId>, age_secs: i64) -> Document {
        let at = Utc::now() - Duration::seconds(age_secs);
        Document {
            id: DocumentId::new(),
            original_name: format!("{seed}.pdf"),
            file_format: FileKind::Pdf,
            extension: ".pdf".into(),
            content_hash: sha256_digest(seed.as_bytes()),
            storage_key: StorageKey::new(&sha256_digest(format!("{seed}-out").as_bytes()), ".pdf"),
            signature: "c2ln".into(),
            verification_count: 0,
            is_hidden: false,
            signed_by_user: user,
            signed_by_team: team,
            created_at: at,
            updated_at: at,
        }
    }

    #[tokio::test]
    async fn create_rejects_duplicate_hash() {
        let repo = InMemoryDocumentRepository::new();
        let user = UserId(Uuid::new_v4());
        let first = doc("a", user, None, 0);
        repo.create(&first).await.unwrap();

        let mut second = doc("a", user, None, 0);
        second.id = DocumentId::new();
        let err = repo.create(&second).await.unwrap_err();
        assert!(matches!(err, IndexError::DuplicateContentHash(h) if h == first.content_hash));

        let found = repo.find_by_content_hash(&first.content_hash).await.unwrap();
        assert_eq!(found.map(|d| d.id), Some(first.id));
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_increments_are_not_lost() {
        let repo = Arc::new(InMemoryDocumentRepository::new());
        let d = doc("count", UserId(Uuid::new_v4()), None, 0);
        repo.create(&d).await.unwrap();

        let handles: Vec<_> = (0..50)
            .map(|_| {
                let repo = Arc::clone(&repo);
                let id = d.id;
                tokio::spawn(async move { repo.increment_verification(&id).await })
            })
            .collect();
        for h in handles {
            h.await.unwrap().unwrap();
        }
        let stored = repo.find_by_id(&d.id).await.unwrap().unwrap();
        assert_eq!(stored.verification_count, 50);
    }

    #[tokio::test]
    async fn increment_unknown_id_is_none() {
        let repo = InMemoryDocumentRepository::new();
        assert!(repo
            .increment_verification(&DocumentId::new())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn hide_respects_scope() {
        let repo = InMemoryDocumentRepository::new();
        let owner = UserId(Uuid::new_v4());
        let team = TeamId(Uuid::new_v4());
        let d = doc("scoped", owner, Some(team), 0);
        repo.create(&d).await.unwrap();

        let stranger = OwnerScope::User(UserId(Uuid::new_v4()));
        assert!(!repo.set_hidden(&d.id, true, stranger).await.unwrap());
        assert!(!repo.find_by_id(&d.id).await.unwrap().unwrap().is_hidden);

        assert!(repo.set_hidden(&d.id, true, OwnerScope::Team(team)).await.unwrap());
        assert!(repo.find_by_id(&d.id).await.unwrap().unwrap().is_hidden);

        assert!(repo.set_hidden(&d.id, false, OwnerScope::User(owner)).await.unwrap());
        assert!(!repo.find_by_id(&d.id).await.unwrap().unwrap().is_hidden);
    }

    #[tokio::test]
    async fn list_filters_orders_and_pages() {
        let repo = InMemoryDocumentRepository::new();
        let alice = UserId(Uuid::new_v4());
        let bob = UserId(Uuid::new_v4());
        for i in 0..5 {
            repo.create(&doc(&format!("alice-{i}"), alice, None, i * 10))
                .await
                .unwrap();
        }
        let hidden = doc("bob-hidden", bob, None, 1);
        repo.create(&hidden).await.unwrap();
        repo.set_hidden(&hidden.id, true, OwnerScope::Any).await.unwrap();

        let page = repo
            .list(&DocumentQuery::new(Visibility::Visible, OwnerScope::User(alice)).paged(Some(1), Some(2)))
            .await
            .unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].original_name, "alice-0.pdf");
        assert_eq!(page.items[1].original_name, "alice-1.pdf");

        let last = repo
            .list(&DocumentQuery::new(Visibility::Visible, OwnerScope::User(alice)).paged(Some(3), Some(2)))
            .await
            .unwrap();
        assert_eq!(last.items.len(), 1);

        let hidden_only = repo
            .list(&DocumentQuery::new(Visibility::Hidden, OwnerScope::Any))
            .await
            .unwrap();
        assert_eq!(hidden_only.total, 1);
        assert_eq!(hidden_only.items[0].id, hidden.id);

        let everything = repo
            .list(&DocumentQuery::new(Visibility::All, OwnerScope::Any))
            .await
            .unwrap();
        assert_eq!(everything.total, 6);
    }

    #[tokio::test]
    async fn delete_frees_hash_and_key() {
        let repo = InMemoryDocumentRepository::new();
        let d = doc("gone", UserId(Uuid::new_v4()), None, 0);
        repo.create(&d).await.unwrap();
        assert!(repo.storage_key_in_use(&d.storage_key).await.unwrap());

        let removed = repo.delete(&d.id).await.unwrap().unwrap();
        assert_eq!(removed.id, d.id);
        assert!(!repo.storage_key_in_use(&d.storage_key).await.unwrap());
        assert!(repo.find_by_content_hash(&d.content_hash).await.unwrap().is_none());
        assert!(repo.delete(&d.id).await.unwrap().is_none());
        repo.create(&d).await.unwrap();
    }
}
