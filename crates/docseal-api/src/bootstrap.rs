//! # Service Bootstrap
//!
//! Turns a [`ServiceConfig`] into a ready [`AppState`]:
//!
//! 1. Load the signing key from `PRIVATE_KEY_PATH`.
//! 2. Build the annotator (font, PDF rasterizer, metadata backend).
//! 3. Open the storage backend.
//! 4. Connect to Postgres and run migrations when `DATABASE_URL` is set;
//!    otherwise keep the catalog and directory in memory.

use std::sync::Arc;

use docseal_annotate::{AnnotationError, ArtifactAnnotator};
use docseal_crypto::{CryptoError, PemFileKeyProvider, Signer};
use docseal_index::{
    init_pool, AttributionDirectory, DocumentRepository, InMemoryDirectory,
    InMemoryDocumentRepository, PgDirectory, PgDocumentRepository,
};
use docseal_store::{open_backend, StorageError};

use crate::config::ServiceConfig;
use crate::state::{AppState, Components};

#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("signing key: {0}")]
    SigningKey(#[from] CryptoError),

    #[error("annotator: {0}")]
    Annotator(#[from] AnnotationError),

    #[error("storage: {0}")]
    Storage(#[from] StorageError),

    #[error("database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("metrics registry: {0}")]
    Metrics(#[from] prometheus::Error),
}

pub async fn bootstrap(config: ServiceConfig) -> Result<AppState, BootstrapError> {
    let provider = PemFileKeyProvider::load(
        &config.app.private_key_path,
        config.app.public_key_path.as_deref(),
    )?;
    let signer = Signer::new(Arc::new(provider));

    let annotator = ArtifactAnnotator::from_config(&config.annotation)?;
    let storage = open_backend(&config.storage).await?;

    let db_pool = init_pool(config.app.database_url.as_deref()).await?;
    let (catalog, directory): (Arc<dyn DocumentRepository>, Arc<dyn AttributionDirectory>) =
        match &db_pool {
            Some(pool) => (
                Arc::new(PgDocumentRepository::new(pool.clone())),
                Arc::new(PgDirectory::new(pool.clone())),
            ),
            None => {
                tracing::warn!("DATABASE_URL not set, catalog is in memory and will not persist");
                (
                    Arc::new(InMemoryDocumentRepository::new()),
                    Arc::new(InMemoryDirectory::new()),
                )
            }
        };

    tracing::info!(
        signer = signer.provider_name(),
        storage = storage.backend_name(),
        persistent = db_pool.is_some(),
        "docseal services ready"
    );

    let state = AppState::new(
        config.app,
        Components {
            signer,
            annotator,
            storage,
            catalog,
            directory,
            pipeline: config.pipeline,
            db_pool,
        },
    )?;
    Ok(state)
}
