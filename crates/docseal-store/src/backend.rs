//! # Storage Backend Trait

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use docseal_core::StorageKey;

use crate::config::{StorageConfig, StorageMode};
use crate::error::StorageError;
use crate::local::LocalStorage;

/// Result of a `put`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    Written,
    /// An object already exists under the key. Keys are content addressed,
    /// so nothing was written.
    AlreadyPresent,
}

/// Where signed artifacts are kept.
///
/// Keys are `<sha256 of the stored bytes><extension>`, so every
/// implementation treats a second `put` of an existing key as success.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn exists(&self, key: &StorageKey) -> Result<bool, StorageError>;

    /// Store `bytes` under `key` unless something is already there.
    async fn put(
        &self,
        key: &StorageKey,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<PutOutcome, StorageError>;

    /// Stored bytes, or `None` if the key is absent.
    async fn get(&self, key: &StorageKey) -> Result<Option<Vec<u8>>, StorageError>;

    /// Delete the object. Removing an absent key succeeds.
    async fn remove(&self, key: &StorageKey) -> Result<(), StorageError>;

    /// A local path or URL at which the artifact can be found.
    fn resolve_path_or_url(&self, key: &StorageKey) -> String;

    fn backend_name(&self) -> &str;
}

/// Open the backend selected by `config`.
///
/// The local backend creates its root directory. The S3 backend checks
/// the bucket and creates it if needed.
pub async fn open_backend(config: &StorageConfig) -> Result<Arc<dyn StorageBackend>, StorageError> {
    match &config.mode {
        StorageMode::Local { root } => {
            let storage =
                LocalStorage::open(root.clone(), config.public_url.clone(), config.timeout).await?;
            Ok(Arc::new(storage))
        }
        #[cfg(feature = "s3")]
        StorageMode::S3(s3) => {
            let storage =
                crate::s3::S3Storage::connect(s3, config.timeout, config.public_url.clone())
                    .await?;
            Ok(Arc::new(storage))
        }
        #[cfg(not(feature = "s3"))]
        StorageMode::S3(_) => Err(StorageError::Unavailable(
            "S3 storage requested but docseal-store was built without the `s3` feature".into(),
        )),
    }
}

/// Run `fut`, failing with [`StorageError::Timeout`] after `limit`.
pub(crate) async fn with_timeout<T, F>(
    operation: &'static str,
    limit: Duration,
    fut: F,
) -> Result<T, StorageError>
where
    F: Future<Output = Result<T, StorageError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::error!(operation, secs = limit.as_secs(), "storage operation timed out");
            Err(StorageError::Timeout {
                operation,
                secs: limit.as_secs(),
            })
        }
    }
}
