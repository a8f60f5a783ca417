//! # Local Filesystem Storage
//!
//! Artifacts live at `<root>/<key>`. Writes go to a temporary file in the
//! root and are linked into place without replacing an existing file, so
//! concurrent puts of one key never expose a partial artifact and never
//! clobber each other.
//!
//! Reads recompute the SHA-256 of the stored bytes and compare it with the
//! digest in the key.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use docseal_core::{sha256_digest, StorageKey};

use crate::backend::{with_timeout, PutOutcome, StorageBackend};
use crate::error::StorageError;

#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
    public_url: Option<String>,
    timeout: Duration,
}

impl LocalStorage {
    /// Use `root`, creating it if absent.
    pub async fn open(
        root: PathBuf,
        public_url: Option<String>,
        timeout: Duration,
    ) -> Result<Self, StorageError> {
        tokio::fs::create_dir_all(&root).await?;
        tracing::info!(root = %root.display(), "local storage ready");
        Ok(Self {
            root,
            public_url,
            timeout,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path for `key`.
    pub fn path_for(&self, key: &StorageKey) -> PathBuf {
        self.root.join(key.as_str())
    }
}

fn write_new(root: &Path, target: &Path, bytes: &[u8]) -> Result<PutOutcome, StorageError> {
    if target.exists() {
        return Ok(PutOutcome::AlreadyPresent);
    }
    let mut tmp = tempfile::Builder::new()
        .prefix(".incoming-")
        .tempfile_in(root)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    match tmp.persist_noclobber(target) {
        Ok(_) => Ok(PutOutcome::Written),
        Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => {
            Ok(PutOutcome::AlreadyPresent)
        }
        Err(e) => Err(e.error.into()),
    }
}

#[async_trait]
impl StorageBackend for LocalStorage {
    async fn exists(&self, key: &StorageKey) -> Result<bool, StorageError> {
        let path = self.path_for(key);
        with_timeout("exists", self.timeout, async move {
            Ok(tokio::fs::try_exists(&path).await?)
        })
        .await
    }

    async fn put(
        &self,
        key: &StorageKey,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<PutOutcome, StorageError> {
        let root = self.root.clone();
        let target = self.path_for(key);
        let outcome = with_timeout("put", self.timeout, async move {
            tokio::task::spawn_blocking(move || write_new(&root, &target, &bytes))
                .await
                .map_err(|e| StorageError::backend("put", e))?
        })
        .await?;
        tracing::debug!(key = %key, ?outcome, "local put");
        Ok(outcome)
    }

    async fn get(&self, key: &StorageKey) -> Result<Option<Vec<u8>>, StorageError> {
        let path = self.path_for(key);
        let bytes = with_timeout("get", self.timeout, async move {
            match tokio::fs::read(&path).await {
                Ok(bytes) => Ok(Some(bytes)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await?;
        let Some(bytes) = bytes else {
            return Ok(None);
        };
        let actual = sha256_digest(&bytes);
        let expected = key.digest().map_err(|e| StorageError::backend("get", e))?;
        if actual != expected {
            tracing::error!(key = %key, actual = %actual, "stored artifact failed integrity check");
            return Err(StorageError::Integrity {
                key: key.clone(),
                actual: actual.to_hex(),
            });
        }
        Ok(Some(bytes))
    }

    async fn remove(&self, key: &StorageKey) -> Result<(), StorageError> {
        let path = self.path_for(key);
        with_timeout("remove", self.timeout, async move {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            }
        })
        .await
    }

    fn resolve_path_or_url(&self, key: &StorageKey) -> String {
        match &self.public_url {
            Some(base) => format!("{base}/{key}"),
            None => self.path_for(key).display().to_string(),
        }
    }

    fn backend_name(&self) -> &str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn key_for(bytes: &[u8], ext: &str) -> StorageKey {
        StorageKey::new(&sha256_digest(bytes), ext)
    }

    async fn storage(dir: &Path) -> LocalStorage {
        LocalStorage::open(dir.join("store"), None, Duration::from_secs(5))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn put_get_exists_remove() {
        let dir = tempfile::tempdir().unwrap();
        let s = storage(dir.path()).await;
        let bytes = b"signed artifact".to_vec();
        let key = key_for(&bytes, ".png");

        assert!(!s.exists(&key).await.unwrap());
        assert_eq!(s.get(&key).await.unwrap(), None);
        assert_eq!(
            s.put(&key, bytes.clone(), "image/png").await.unwrap(),
            PutOutcome::Written
        );
        assert!(s.exists(&key).await.unwrap());
        assert_eq!(s.get(&key).await.unwrap(), Some(bytes));

        s.remove(&key).await.unwrap();
        assert!(!s.exists(&key).await.unwrap());
        // Removing twice is fine.
        s.remove(&key).await.unwrap();
    }

    #[tokio::test]
    async fn second_put_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let s = storage(dir.path()).await;
        let bytes = b"same bytes".to_vec();
        let key = key_for(&bytes, "pdf");
        s.put(&key, bytes.clone(), "application/pdf").await.unwrap();
        assert_eq!(
            s.put(&key, bytes, "application/pdf").await.unwrap(),
            PutOutcome::AlreadyPresent
        );
        // No temporary files left behind.
        assert_eq!(std::fs::read_dir(s.root()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn concurrent_puts_write_once() {
        let dir = tempfile::tempdir().unwrap();
        let s = Arc::new(storage(dir.path()).await);
        let bytes = vec![7u8; 64 * 1024];
        let key = key_for(&bytes, ".bin");
        let mut tasks = Vec::new();
        for _ in 0..8 {
            let s = Arc::clone(&s);
            let key = key.clone();
            let bytes = bytes.clone();
            tasks.push(tokio::spawn(async move {
                s.put(&key, bytes, "application/octet-stream").await.unwrap()
            }));
        }
        let mut written = 0;
        for t in tasks {
            if t.await.unwrap() == PutOutcome::Written {
                written += 1;
            }
        }
        assert_eq!(written, 1);
        assert_eq!(s.get(&key).await.unwrap(), Some(bytes));
    }

    #[tokio::test]
    async fn tampered_file_fails_integrity_check() {
        let dir = tempfile::tempdir().unwrap();
        let s = storage(dir.path()).await;
        let bytes = b"original".to_vec();
        let key = key_for(&bytes, ".jpg");
        s.put(&key, bytes, "image/jpeg").await.unwrap();
        std::fs::write(s.path_for(&key), b"tampered").unwrap();
        assert!(matches!(
            s.get(&key).await,
            Err(StorageError::Integrity { .. })
        ));
    }

    #[tokio::test]
    async fn resolves_to_path_or_public_url() {
        let dir = tempfile::tempdir().unwrap();
        let key = key_for(b"x", ".png");
        let plain = storage(dir.path()).await;
        assert_eq!(
            plain.resolve_path_or_url(&key),
            dir.path().join("store").join(key.as_str()).display().to_string()
        );
        let public = LocalStorage::open(
            dir.path().join("pub"),
            Some("https://files.example".into()),
            Duration::from_secs(5),
        )
        .await
        .unwrap();
        assert_eq!(
            public.resolve_path_or_url(&key),
            format!("https://files.example/{key}")
        );
    }
}
