//! # S3-Compatible Object Storage
//!
//! Works against AWS S3 and MinIO-style endpoints. Path-style addressing is
//! forced so bucket names never have to resolve as DNS labels. The bucket is
//! checked, and created if missing, once when connecting.

use std::time::Duration;

use async_trait::async_trait;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use docseal_core::StorageKey;

use crate::backend::{with_timeout, PutOutcome, StorageBackend};
use crate::config::S3Config;
use crate::error::StorageError;

const CREDENTIALS_PROVIDER: &str = "docseal-static";

#[derive(Debug, Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
    endpoint: String,
    public_url: Option<String>,
    timeout: Duration,
}

impl S3Storage {
    /// Build the client and make sure the bucket exists.
    pub async fn connect(
        config: &S3Config,
        timeout: Duration,
        public_url: Option<String>,
    ) -> Result<Self, StorageError> {
        let endpoint = config.endpoint_url();
        let credentials = Credentials::new(
            config.access_key.clone(),
            config.secret_key.clone(),
            None,
            None,
            CREDENTIALS_PROVIDER,
        );
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .timeout_config(TimeoutConfig::builder().operation_timeout(timeout).build())
            .load()
            .await;
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .endpoint_url(&endpoint)
            .force_path_style(true)
            .build();

        let storage = Self {
            client: Client::from_conf(s3_config),
            bucket: config.bucket.clone(),
            endpoint,
            public_url,
            timeout,
        };
        with_timeout("ensure_bucket", timeout, storage.ensure_bucket()).await?;
        Ok(storage)
    }

    async fn ensure_bucket(&self) -> Result<(), StorageError> {
        match self.client.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => {
                tracing::info!(bucket = %self.bucket, endpoint = %self.endpoint, "S3 bucket exists");
                Ok(())
            }
            Err(err) if err.as_service_error().is_some_and(|e| e.is_not_found()) => {
                self.client
                    .create_bucket()
                    .bucket(&self.bucket)
                    .send()
                    .await
                    .map_err(|e| StorageError::backend("create_bucket", DisplayErrorContext(&e)))?;
                tracing::info!(bucket = %self.bucket, endpoint = %self.endpoint, "S3 bucket created");
                Ok(())
            }
            Err(err) => Err(StorageError::backend("head_bucket", DisplayErrorContext(&err))),
        }
    }
}

#[async_trait]
impl StorageBackend for S3Storage {
    async fn exists(&self, key: &StorageKey) -> Result<bool, StorageError> {
        with_timeout("exists", self.timeout, async {
            match self
                .client
                .head_object()
                .bucket(&self.bucket)
                .key(key.as_str())
                .send()
                .await
            {
                Ok(_) => Ok(true),
                Err(err) if err.as_service_error().is_some_and(|e| e.is_not_found()) => Ok(false),
                Err(err) => Err(StorageError::backend("head_object", DisplayErrorContext(&err))),
            }
        })
        .await
    }

    async fn put(
        &self,
        key: &StorageKey,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<PutOutcome, StorageError> {
        if self.exists(key).await? {
            tracing::debug!(key = %key, bucket = %self.bucket, "object already present");
            return Ok(PutOutcome::AlreadyPresent);
        }
        let size = bytes.len();
        with_timeout("put", self.timeout, async {
            self.client
                .put_object()
                .bucket(&self.bucket)
                .key(key.as_str())
                .content_type(content_type)
                .body(ByteStream::from(bytes))
                .send()
                .await
                .map_err(|e| StorageError::backend("put_object", DisplayErrorContext(&e)))
        })
        .await?;
        tracing::debug!(key = %key, bucket = %self.bucket, size, "object written");
        Ok(PutOutcome::Written)
    }

    async fn get(&self, key: &StorageKey) -> Result<Option<Vec<u8>>, StorageError> {
        with_timeout("get", self.timeout, async {
            let output = match self
                .client
                .get_object()
                .bucket(&self.bucket)
                .key(key.as_str())
                .send()
                .await
            {
                Ok(output) => output,
                Err(err) if err.as_service_error().is_some_and(|e| e.is_no_such_key()) => {
                    return Ok(None)
                }
                Err(err) => {
                    return Err(StorageError::backend("get_object", DisplayErrorContext(&err)))
                }
            };
            let body = output
                .body
                .collect()
                .await
                .map_err(|e| StorageError::backend("get_object", e))?;
            Ok(Some(body.into_bytes().to_vec()))
        })
        .await
    }

    async fn remove(&self, key: &StorageKey) -> Result<(), StorageError> {
        with_timeout("remove", self.timeout, async {
            self.client
                .delete_object()
                .bucket(&self.bucket)
                .key(key.as_str())
                .send()
                .await
                .map_err(|e| StorageError::backend("delete_object", DisplayErrorContext(&e)))?;
            Ok(())
        })
        .await
    }

    fn resolve_path_or_url(&self, key: &StorageKey) -> String {
        match &self.public_url {
            Some(base) => format!("{base}/{key}"),
            None => format!("{}/{}/{}", self.endpoint, self.bucket, key),
        }
    }

    fn backend_name(&self) -> &str {
        "s3"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline_storage(public_url: Option<String>) -> S3Storage {
        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .endpoint_url("http://127.0.0.1:9")
            .force_path_style(true)
            .build();
        S3Storage {
            client: Client::from_conf(config),
            bucket: "docs".into(),
            endpoint: "http://127.0.0.1:9".into(),
            public_url,
            timeout: Duration::from_secs(1),
        }
    }

    #[test]
    fn resolves_path_style_url() {
        let key = StorageKey::new(&docseal_core::sha256_digest(b"x"), ".pdf");
        assert_eq!(
            offline_storage(None).resolve_path_or_url(&key),
            format!("http://127.0.0.1:9/docs/{key}")
        );
        assert_eq!(
            offline_storage(Some("https://cdn.example".into())).resolve_path_or_url(&key),
            format!("https://cdn.example/{key}")
        );
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_storage_failure() {
        let key = StorageKey::new(&docseal_core::sha256_digest(b"x"), ".pdf");
        let err = offline_storage(None).exists(&key).await.unwrap_err();
        assert!(matches!(
            err,
            StorageError::Backend { operation: "head_object", .. } | StorageError::Timeout { .. }
        ));
    }
}
