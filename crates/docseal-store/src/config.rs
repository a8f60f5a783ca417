//! # Storage Configuration
//!
//! | Variable | Default |
//! |---|---|
//! | `S3_ENABLED` | `false` |
//! | `UPLOAD_DIR` | `./uploads` |
//! | `S3_ENDPOINT` | required when S3 is enabled |
//! | `S3_ACCESS_KEY`, `S3_SECRET_KEY` | required when S3 is enabled |
//! | `S3_BUCKET` | required when S3 is enabled |
//! | `S3_REGION` | `us-east-1` |
//! | `S3_SECURE` | `false`, selects `https` for a scheme-less endpoint |
//! | `STORAGE_TIMEOUT_SECS` | `30` |
//! | `STORAGE_PUBLIC_URL` | unset |

use std::path::PathBuf;
use std::time::Duration;

use docseal_core::{ConfigError, EnvSource};

/// Connection settings for an S3-compatible object store.
#[derive(Clone, PartialEq, Eq)]
pub struct S3Config {
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    pub region: String,
    pub secure: bool,
}

impl std::fmt::Debug for S3Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Config")
            .field("endpoint", &self.endpoint)
            .field("access_key", &self.access_key)
            .field("secret_key", &"[REDACTED]")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("secure", &self.secure)
            .finish()
    }
}

impl S3Config {
    /// Endpoint URL with a scheme. A bare `host:port` gets `http://` or
    /// `https://` depending on `secure`.
    pub fn endpoint_url(&self) -> String {
        if self.endpoint.contains("://") {
            self.endpoint.trim_end_matches('/').to_string()
        } else {
            let scheme = if self.secure { "https" } else { "http" };
            format!("{scheme}://{}", self.endpoint.trim_end_matches('/'))
        }
    }
}

/// Which backend to open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageMode {
    Local { root: PathBuf },
    S3(S3Config),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub mode: StorageMode,
    /// Upper bound for a single backend call.
    pub timeout: Duration,
    /// Prefix used when resolving a key to a URL.
    pub public_url: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            mode: StorageMode::Local {
                root: PathBuf::from("./uploads"),
            },
            timeout: Duration::from_secs(30),
            public_url: None,
        }
    }
}

impl StorageConfig {
    pub fn local(root: impl Into<PathBuf>) -> Self {
        Self {
            mode: StorageMode::Local { root: root.into() },
            ..Self::default()
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(&EnvSource::process())
    }

    pub fn from_source(env: &EnvSource) -> Result<Self, ConfigError> {
        let secs: u64 = env.parse_or("STORAGE_TIMEOUT_SECS", 30)?;
        if secs == 0 {
            return Err(ConfigError::invalid("STORAGE_TIMEOUT_SECS", "0", "must be positive"));
        }
        let mode = if env.flag("S3_ENABLED", false) {
            StorageMode::S3(S3Config {
                endpoint: env.require("S3_ENDPOINT")?,
                access_key: env.require("S3_ACCESS_KEY")?,
                secret_key: env.require("S3_SECRET_KEY")?,
                bucket: env.require("S3_BUCKET")?,
                region: env.string_or("S3_REGION", "us-east-1"),
                secure: env.flag("S3_SECURE", false),
            })
        } else {
            StorageMode::Local {
                root: PathBuf::from(env.string_or("UPLOAD_DIR", "./uploads")),
            }
        };
        Ok(Self {
            mode,
            timeout: Duration::from_secs(secs),
            public_url: env
                .get("STORAGE_PUBLIC_URL")
                .map(|u| u.trim_end_matches('/').to_string()),
        })
    }
}
