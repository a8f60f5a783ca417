//! # Service Configuration
//!
//! [`AppConfig`] covers the HTTP server itself. [`ServiceConfig`] gathers
//! it together with every component's own configuration so the binary
//! reads the environment exactly once.

use std::path::PathBuf;

use axum::http::HeaderValue;

use docseal_annotate::AnnotationConfig;
use docseal_core::{ConfigError, EnvSource};
use docseal_pipeline::PipelineConfig;
use docseal_store::StorageConfig;

pub const DEFAULT_PORT: u16 = 4000;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;
pub const DEFAULT_FRONTEND_ORIGIN: &str = "http://localhost:3000";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub port: u16,
    /// `None` keeps the catalog in memory.
    pub database_url: Option<String>,
    pub max_upload_bytes: usize,
    pub metrics_enabled: bool,
    pub log_format: LogFormat,
    /// The one browser origin allowed to call the API with credentials.
    pub frontend_origin: HeaderValue,
    pub private_key_path: PathBuf,
    pub public_key_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            database_url: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            metrics_enabled: true,
            log_format: LogFormat::Text,
            frontend_origin: HeaderValue::from_static(DEFAULT_FRONTEND_ORIGIN),
            private_key_path: PathBuf::from("keys/private.pem"),
            public_key_path: None,
        }
    }
}

/// Redacts the database URL, which usually embeds a password.
impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[REDACTED]"),
            )
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("metrics_enabled", &self.metrics_enabled)
            .field("log_format", &self.log_format)
            .field("frontend_origin", &self.frontend_origin)
            .field("private_key_path", &self.private_key_path)
            .field("public_key_path", &self.public_key_path)
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(&EnvSource::process())
    }

    pub fn from_source(env: &EnvSource) -> Result<Self, ConfigError> {
        let max_upload_bytes = env.parse_or("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?;
        if max_upload_bytes == 0 {
            return Err(ConfigError::invalid("MAX_UPLOAD_BYTES", "0", "must be positive"));
        }
        let log_format = match env.get("LOG_FORMAT") {
            None => LogFormat::Text,
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            Some(v) if v.eq_ignore_ascii_case("text") => LogFormat::Text,
            Some(v) => return Err(ConfigError::invalid("LOG_FORMAT", &v, "expected text or json")),
        };

        let origin = env.string_or("FRONTEND_ORIGIN", DEFAULT_FRONTEND_ORIGIN);
        let frontend_origin = HeaderValue::from_str(&origin)
            .map_err(|e| ConfigError::invalid("FRONTEND_ORIGIN", &origin, e))?;

        Ok(Self {
            port: env.parse_or("APP_PORT", DEFAULT_PORT)?,
            database_url: env.get("DATABASE_URL"),
            max_upload_bytes,
            metrics_enabled: env.flag("METRICS_ENABLED", true),
            log_format,
            frontend_origin,
            private_key_path: PathBuf::from(env.require("PRIVATE_KEY_PATH")?),
            public_key_path: env.get("PUBLIC_KEY_PATH").map(PathBuf::from),
        })
    }
}

/// Everything the server needs, read in one pass.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub app: AppConfig,
    pub annotation: AnnotationConfig,
    pub storage: StorageConfig,
    pub pipeline: PipelineConfig,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(&EnvSource::process())
    }

    pub fn from_source(env: &EnvSource) -> Result<Self, ConfigError> {
        Ok(Self {
            app: AppConfig::from_source(env)?,
            annotation: AnnotationConfig::from_source(env)?,
            storage: StorageConfig::from_source(env)?,
            pipeline: PipelineConfig::from_source(env)?,
        })
    }
}
