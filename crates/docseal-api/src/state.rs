//! # Application State
//!
//! Shared by every handler through `axum::extract::State`. All services
//! are cheap to clone; they hold `Arc`s to the backends chosen at startup.

use std::sync::Arc;

use docseal_annotate::ArtifactAnnotator;
use docseal_crypto::Signer;
use docseal_index::{AttributionDirectory, DocumentRepository};
use docseal_pipeline::{DocumentAdmin, PipelineConfig, SigningPipeline, VerificationService};
use docseal_store::StorageBackend;
use sqlx::PgPool;

use crate::config::AppConfig;
use crate::middleware::metrics::ApiMetrics;

/// The backends a state is assembled from.
pub struct Components {
    pub signer: Signer,
    pub annotator: ArtifactAnnotator,
    pub storage: Arc<dyn StorageBackend>,
    pub catalog: Arc<dyn DocumentRepository>,
    pub directory: Arc<dyn AttributionDirectory>,
    pub pipeline: PipelineConfig,
    pub db_pool: Option<PgPool>,
}

#[derive(Clone)]
pub struct AppState {
    pub pipeline: SigningPipeline,
    pub verifier: VerificationService,
    pub admin: DocumentAdmin,
    /// Present when `DATABASE_URL` is set; checked by the readiness probe.
    pub db_pool: Option<PgPool>,
    pub config: AppConfig,
    pub metrics: Option<ApiMetrics>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("pipeline", &self.pipeline)
            .field("db_pool", &self.db_pool.is_some())
            .field("config", &self.config)
            .field("metrics", &self.metrics)
            .finish()
    }
}

impl AppState {
    pub fn new(config: AppConfig, parts: Components) -> Result<Self, prometheus::Error> {
        let metrics = if config.metrics_enabled {
            Some(ApiMetrics::new()?)
        } else {
            None
        };
        let pipeline = SigningPipeline::new(
            parts.signer,
            parts.annotator,
            parts.storage.clone(),
            parts.catalog.clone(),
            &parts.pipeline,
        );
        Ok(Self {
            pipeline,
            verifier: VerificationService::new(parts.catalog.clone(), parts.directory),
            admin: DocumentAdmin::new(parts.catalog, parts.storage),
            db_pool: parts.db_pool,
            config,
            metrics,
        })
    }
}
