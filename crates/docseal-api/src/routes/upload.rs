//! # Upload API
//!
//! `POST /api/upload` takes a multipart form with a single `file` field and
//! runs it through the signing pipeline. A file whose exact bytes were
//! already signed returns the existing record instead of signing again.

use axum::body::Bytes;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use docseal_pipeline::UploadRequest;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::extractors::{extract_multipart, multipart_error};
use crate::routes::documents::DocumentResponse;
use crate::state::AppState;

pub const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    /// `created` or `duplicate`.
    pub status: String,
    pub document: DocumentResponse,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/upload", post(upload_document))
}

/// POST /api/upload: sign, annotate and store a file.
#[utoipa::path(
    post,
    path = "/api/upload",
    request_body(content_type = "multipart/form-data", description = "Form with a `file` field"),
    responses(
        (status = 201, description = "File signed and stored", body = UploadResponse),
        (status = 200, description = "Identical content was already signed", body = UploadResponse),
        (status = 400, description = "Malformed multipart body", body = crate::error::ErrorBody),
        (status = 401, description = "Missing caller identity", body = crate::error::ErrorBody),
        (status = 413, description = "File exceeds the upload limit", body = crate::error::ErrorBody),
        (status = 422, description = "Missing, empty or unreadable file", body = crate::error::ErrorBody),
    ),
    tag = "documents"
)]
pub async fn upload_document(
    State(state): State<AppState>,
    caller: CallerIdentity,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<UploadResponse>), AppError> {
    let mut multipart = extract_multipart(multipart)?;
    let (original_name, bytes) = read_file_field(&mut multipart).await?;

    let request = UploadRequest {
        original_name,
        user: caller.user,
        team: caller.team,
    };
    let result = state.pipeline.sign_upload(&request, bytes.as_ref()).await;
    if let Some(metrics) = &state.metrics {
        match &result {
            Ok(outcome) => metrics.record_upload(outcome.as_str()),
            Err(err) => metrics.record_upload(err.kind()),
        }
    }

    let outcome = result?;
    let status = if outcome.is_duplicate() {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((
        status,
        Json(UploadResponse {
            status: outcome.as_str().to_string(),
            document: DocumentResponse::from(outcome.document()),
        }),
    ))
}

/// The first `file` field: its base name and contents. Other fields are
/// skipped.
async fn read_file_field(multipart: &mut Multipart) -> Result<(String, Bytes), AppError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let name = field
            .file_name()
            .map(base_name)
            .filter(|n| !n.is_empty())
            .unwrap_or("upload")
            .to_string();
        let bytes = field.bytes().await.map_err(multipart_error)?;
        if bytes.is_empty() {
            return Err(AppError::Validation("uploaded file is empty".into()));
        }
        return Ok((name, bytes));
    }
    Err(AppError::Validation(format!(
        "multipart field `{FILE_FIELD}` is required"
    )))
}

/// Browsers may send a full client path; keep only its last component.
fn base_name(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_name_strips_client_paths() {
        assert_eq!(base_name("C:\\Users\\me\\scan.pdf"), "scan.pdf");
        assert_eq!(base_name("/home/me/photo.png"), "photo.png");
        assert_eq!(base_name("plain.jpg"), "plain.jpg");
        assert_eq!(base_name("dir/"), "");
    }
}
