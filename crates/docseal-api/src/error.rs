//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Every failure becomes `{"error":{"code","message"}}`. Messages of
//! 5xx errors are logged and replaced before they reach the client.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use docseal_annotate::{AnnotationError, MetadataError};
use docseal_pipeline::PipelineError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code, e.g. `NOT_FOUND`.
    pub code: String,
    pub message: String,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),

    /// The request was well-formed HTTP but its content is unusable (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// Malformed request framing, e.g. a broken multipart body (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    /// Message is logged but not returned to the client.
    #[error("internal error: {0}")]
    Internal(String),

    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            Self::PayloadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            Self::ServiceUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE")
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            Self::ServiceUnavailable(_) => "The service is temporarily unavailable".to_string(),
            other => other.to_string(),
        };

        match &self {
            Self::Internal(_) => tracing::error!(error = %self, "internal server error"),
            Self::ServiceUnavailable(_) => tracing::warn!(error = %self, "service unavailable"),
            _ => {}
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<docseal_core::ValidationError> for AppError {
    fn from(err: docseal_core::ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Map pipeline failures onto HTTP. Problems with the uploaded file itself
/// are the client's; missing signing or rendering capability is a 503;
/// everything else is internal.
impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        match &err {
            PipelineError::NotFound { id, .. } => Self::NotFound(format!("document {id}")),
            PipelineError::DuplicateContentHash { .. } => Self::Conflict(err.to_string()),
            PipelineError::KeyUnavailable { .. } => Self::ServiceUnavailable(err.to_string()),
            PipelineError::Annotation { source, .. } => match source {
                AnnotationError::Decode(_)
                | AnnotationError::Pdf(_)
                | AnnotationError::PageCountMismatch { .. }
                | AnnotationError::Metadata(
                    MetadataError::Malformed(_)
                    | MetadataError::Unsupported(_)
                    | MetadataError::InvalidComment(_),
                ) => Self::Validation(format!("file could not be annotated: {source}")),
                AnnotationError::RasterizerUnavailable(_)
                | AnnotationError::StamperUnavailable
                | AnnotationError::Font(_) => Self::ServiceUnavailable(err.to_string()),
                _ => Self::Internal(err.to_string()),
            },
            PipelineError::Io { .. }
            | PipelineError::Signing { .. }
            | PipelineError::Storage { .. }
            | PipelineError::Catalog { .. } => Self::Internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docseal_core::DocumentId;
    use docseal_pipeline::PipelineStage;
    use http_body_util::BodyExt;

    #[test]
    fn status_codes() {
        let cases = [
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND, "NOT_FOUND"),
            (
                AppError::Validation("x".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
                "VALIDATION_ERROR",
            ),
            (AppError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            (AppError::Forbidden("x".into()), StatusCode::FORBIDDEN, "FORBIDDEN"),
            (
                AppError::PayloadTooLarge("x".into()),
                StatusCode::PAYLOAD_TOO_LARGE,
                "PAYLOAD_TOO_LARGE",
            ),
            (
                AppError::Internal("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
            ),
        ];
        for (err, status, code) in cases {
            assert_eq!(err.status_and_code(), (status, code));
        }
    }

    #[test]
    fn pipeline_errors_map_by_cause() {
        let not_found = PipelineError::NotFound {
            stage: PipelineStage::Verification,
            id: DocumentId::new(),
        };
        assert!(matches!(AppError::from(not_found), AppError::NotFound(_)));

        let corrupt = PipelineError::Annotation {
            stage: PipelineStage::Annotated,
            source: AnnotationError::Decode("bad png".into()),
        };
        assert!(matches!(AppError::from(corrupt), AppError::Validation(_)));

        let no_raster = PipelineError::Annotation {
            stage: PipelineStage::Annotated,
            source: AnnotationError::RasterizerUnavailable("none".into()),
        };
        assert!(matches!(AppError::from(no_raster), AppError::ServiceUnavailable(_)));

        let io = PipelineError::Io {
            stage: PipelineStage::Hashed,
            source: std::io::Error::other("disk full"),
        };
        assert!(matches!(AppError::from(io), AppError::Internal(_)));
    }

    #[tokio::test]
    async fn internal_details_are_not_returned() {
        let response = AppError::Internal("db password=hunter2".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.error.code, "INTERNAL_ERROR");
        assert!(!body.error.message.contains("hunter2"));
    }
}
