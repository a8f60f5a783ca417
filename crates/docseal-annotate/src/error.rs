//! # Annotation Error Types

use thiserror::Error;

/// Failures while reading or writing the embedded metadata field.
#[derive(Error, Debug)]
pub enum MetadataError {
    /// The container has no slot this writer can use.
    #[error("metadata not supported for this file: {0}")]
    Unsupported(String),

    /// The container is structurally broken.
    #[error("malformed container: {0}")]
    Malformed(String),

    /// The value cannot be stored in the slot (too long, not ASCII).
    #[error("comment rejected: {0}")]
    InvalidComment(String),

    /// External tool exited unsuccessfully.
    #[error("{tool} exited with status {status}: {output}")]
    Tool {
        tool: String,
        status: i32,
        output: String,
    },

    /// External tool did not finish in time and was killed.
    #[error("{tool} timed out after {secs}s")]
    Timeout { tool: String, secs: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures of the visible annotation or the metadata step.
#[derive(Error, Debug)]
pub enum AnnotationError {
    #[error("failed to decode image: {0}")]
    Decode(String),

    #[error("failed to encode image: {0}")]
    Encode(String),

    #[error("font unavailable: {0}")]
    Font(String),

    #[error("failed to build QR code: {0}")]
    Qr(String),

    #[error("PDF processing failed: {0}")]
    Pdf(String),

    /// No rasterizer is configured, so PDF pages cannot be stamped.
    #[error("PDF rasterizer unavailable: {0}")]
    RasterizerUnavailable(String),

    #[error("rasterizer produced {actual} pages, document has {expected}")]
    PageCountMismatch { expected: usize, actual: usize },

    /// Image or PDF kind requested but no stamper was configured.
    #[error("visual stamping is not configured")]
    StamperUnavailable,

    #[error("metadata write failed: {0}")]
    Metadata(#[from] MetadataError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<image::ImageError> for AnnotationError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::IoError(e) => Self::Io(e),
            image::ImageError::Encoding(e) => Self::Encode(e.to_string()),
            other => Self::Decode(other.to_string()),
        }
    }
}

impl From<lopdf::Error> for AnnotationError {
    fn from(err: lopdf::Error) -> Self {
        Self::Pdf(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_error_wraps_into_annotation_error() {
        let err: AnnotationError = MetadataError::Unsupported("zip".into()).into();
        assert!(matches!(err, AnnotationError::Metadata(MetadataError::Unsupported(_))));
        assert!(err.to_string().contains("zip"));
    }

    #[test]
    fn page_count_mismatch_display() {
        let err = AnnotationError::PageCountMismatch {
            expected: 3,
            actual: 2,
        };
        assert_eq!(err.to_string(), "rasterizer produced 2 pages, document has 3");
    }
}
