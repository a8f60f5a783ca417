//! # OpenAPI Specification Assembly
//!
//! Collects every utoipa-documented route into one OpenAPI 3.1 document,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::state::AppState;

/// Caller identity is forwarded by the gateway in request headers.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "caller_identity",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(
                    crate::auth::USER_ID_HEADER,
                ))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "docseal API",
        version = "0.1.0",
        description = "Document signing and verification.\n\nUploads are hashed, deduplicated by content, signed with RSA, stamped with their identifier and stored. Anyone holding an identifier can verify it at `/api/verify/{id}`.\n\nCaller identity arrives from the gateway as `x-user-id`, `x-team-id` and `x-user-role` headers. Verification and health probes are public."
    ),
    security(
        ("caller_identity" = [])
    ),
    paths(
        crate::routes::upload::upload_document,
        crate::routes::verify::verify_document,
        crate::routes::documents::list_documents,
        crate::routes::documents::list_my_documents,
        crate::routes::documents::list_team_documents,
        crate::routes::documents::hide_document,
        crate::routes::documents::show_document,
        crate::routes::documents::hide_my_document,
        crate::routes::documents::hide_team_document,
        crate::routes::documents::delete_document,
        crate::routes::documents::download_artifact,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        crate::routes::upload::UploadResponse,
        crate::routes::documents::DocumentResponse,
        crate::routes::documents::DocumentListResponse,
        crate::routes::documents::VerificationResponse,
        crate::routes::documents::SignerResponse,
        crate::routes::documents::TeamResponse,
        crate::routes::documents::VisibilityResponse,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "documents", description = "Upload, listing, visibility and removal of signed documents"),
        (name = "verification", description = "Public verification by document identifier"),
    )
)]
pub struct ApiDoc;

pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
