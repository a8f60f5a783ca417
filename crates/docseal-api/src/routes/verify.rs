//! # Verification API
//!
//! Public lookup by document identifier, as encoded in the banner and QR
//! code of every signed artifact. Each successful lookup increments the
//! document's verification counter. Hidden documents remain verifiable.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use docseal_pipeline::PipelineError;

use crate::error::AppError;
use crate::extractors::parse_document_id;
use crate::routes::documents::VerificationResponse;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/verify/{id}", get(verify_document))
}

/// GET /api/verify/{id}
#[utoipa::path(
    get,
    path = "/api/verify/{id}",
    params(("id" = String, Path, description = "Document identifier")),
    responses(
        (status = 200, description = "The signed document and its signer", body = VerificationResponse),
        (status = 404, description = "No document with this identifier", body = crate::error::ErrorBody),
        (status = 422, description = "Identifier is not a UUID", body = crate::error::ErrorBody),
    ),
    security(()),
    tag = "verification"
)]
pub async fn verify_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<VerificationResponse>, AppError> {
    let id = parse_document_id(&id)?;
    let result = state.verifier.verify(&id).await;
    if let Some(metrics) = &state.metrics {
        match &result {
            Ok(_) => metrics.record_verification(true),
            Err(PipelineError::NotFound { .. }) => metrics.record_verification(false),
            Err(_) => {}
        }
    }
    Ok(Json(result?.into()))
}
