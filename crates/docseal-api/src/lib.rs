//! # docseal-api
//!
//! HTTP surface of the docseal document signing service.
//!
//! | Path | Module | Access |
//! |---|---|---|
//! | `POST /api/upload` | [`routes::upload`] | any caller |
//! | `GET /api/verify/{id}` | [`routes::verify`] | public |
//! | `/api/documents/*` | [`routes::documents`] | by role |
//! | `/openapi.json` | [`openapi`] | public |
//! | `/health/*`, `/metrics` | this module | public |
//!
//! Caller identity comes from gateway headers, see [`auth`].

pub mod auth;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::{header, HeaderName, HeaderValue, Method, StatusCode};
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Router};
use docseal_index::{DocumentQuery, OwnerScope, Visibility};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::middleware::metrics::ApiMetrics;
pub use crate::state::AppState;

/// Assemble the full application router.
///
/// Health probes and `/metrics` sit outside the request metrics layer so
/// scrapes do not count themselves.
pub fn app(state: AppState) -> Router {
    let mut api = Router::new()
        .merge(routes::upload::router())
        .merge(routes::verify::router())
        .merge(routes::documents::router())
        .merge(openapi::router())
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes));

    if let Some(metrics) = state.metrics.clone() {
        api = api
            .layer(from_fn(middleware::metrics::metrics_middleware))
            .layer(Extension(metrics));
    }

    let api = api
        .layer(cors_layer(&state.config.frontend_origin))
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    let mut probes = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness));

    if let Some(metrics) = state.metrics.clone() {
        probes = probes
            .route("/metrics", get(prometheus_metrics))
            .layer(Extension(metrics));
    }

    Router::new().merge(probes.with_state(state)).merge(api)
}

/// The browser front end sends identity headers and expects cookies to flow.
fn cors_layer(origin: &HeaderValue) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(origin.clone())
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::ORIGIN,
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::AUTHORIZATION,
            HeaderName::from_static(auth::USER_ID_HEADER),
            HeaderName::from_static(auth::TEAM_ID_HEADER),
            HeaderName::from_static(auth::ROLE_HEADER),
        ])
        .allow_credentials(true)
}

/// GET /health/liveness: the process is up.
async fn liveness() -> &'static str {
    "ok"
}

/// GET /health/readiness: dependencies answer.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    if let Some(pool) = &state.db_pool {
        if let Err(e) = sqlx::query("SELECT 1").execute(pool).await {
            tracing::warn!(error = %e, "readiness: database check failed");
            return (StatusCode::SERVICE_UNAVAILABLE, "database unavailable");
        }
    }
    (StatusCode::OK, "ready")
}

/// GET /metrics: refresh the catalog gauge, then encode everything.
async fn prometheus_metrics(
    State(state): State<AppState>,
    Extension(metrics): Extension<ApiMetrics>,
) -> impl IntoResponse {
    let count = |visibility| {
        let query = DocumentQuery::new(visibility, OwnerScope::Any).paged(Some(1), Some(1));
        let admin = state.admin.clone();
        async move { admin.list(&query).await.map(|page| page.total) }
    };
    match (count(Visibility::Visible).await, count(Visibility::Hidden).await) {
        (Ok(visible), Ok(hidden)) => metrics.set_document_counts(visible, hidden),
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!(error = %e, "metrics: could not count documents");
        }
    }

    match metrics.gather_and_encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "metrics encoding failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e).into_response()
        }
    }
}
