//! # Database Connection
//!
//! The catalog database is optional. Without a URL the service keeps its
//! catalog in memory, which does not survive restarts.

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};

/// Connect and run the embedded migrations.
///
/// Returns `None` when no URL is configured. Returns `Err` if a URL is set
/// but the connection or a migration fails.
pub async fn init_pool(database_url: Option<&str>) -> Result<Option<PgPool>, sqlx::Error> {
    let Some(url) = database_url else {
        tracing::warn!("DATABASE_URL not set, document catalog is in-memory only");
        return Ok(None);
    };

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(5))
        .connect(url)
        .await?;
    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Catalog migrations applied");

    Ok(Some(pool))
}
