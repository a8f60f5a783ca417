//! # Extraction Helpers
//!
//! Axum's built-in rejections answer in plain text. These helpers take the
//! `Result<Extractor, Rejection>` form of an extractor and turn failures
//! into [`AppError`] so every error body has the same JSON shape.

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::QueryRejection;
use axum::extract::{Multipart, Query};
use axum::http::StatusCode;
use docseal_core::DocumentId;

use crate::error::AppError;

/// Request types with rules beyond what serde checks.
pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}

/// Extract query parameters and validate them.
pub fn extract_query<T: Validate>(result: Result<Query<T>, QueryRejection>) -> Result<T, AppError> {
    let Query(value) = result.map_err(|err| AppError::BadRequest(err.body_text()))?;
    value.validate().map_err(AppError::Validation)?;
    Ok(value)
}

pub fn extract_multipart(
    result: Result<Multipart, MultipartRejection>,
) -> Result<Multipart, AppError> {
    result.map_err(|err| AppError::BadRequest(err.body_text()))
}

/// A body over the configured limit surfaces while reading fields.
pub fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(err.body_text())
    } else {
        AppError::BadRequest(err.body_text())
    }
}

/// Parse a path identifier. Garbage is a validation error, not a 404.
pub fn parse_document_id(raw: &str) -> Result<DocumentId, AppError> {
    Ok(raw.parse::<DocumentId>()?)
}
