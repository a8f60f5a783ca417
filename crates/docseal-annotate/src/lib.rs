//! # docseal-annotate — Visible and Embedded Artifact Marks
//!
//! Mutates uploaded artifacts so they carry their document identifier:
//!
//! - **Images** (PNG, JPEG) get a semi-transparent banner with the text
//!   `"<prefix> <id>"` and, optionally, a QR code pointing at the
//!   verification page.
//! - **PDFs** are rasterized page by page, stamped the same way, and
//!   rebuilt with the original page count and page sizes.
//! - **Every artifact** whose container has a comment slot receives the
//!   `ID:<id>;SIG:<signature>` metadata, written once after all visual
//!   changes.
//!
//! All operations are synchronous and CPU or subprocess bound. Async
//! callers run them on a blocking thread.
//!
//! ## Feature Flags
//!
//! - `pdfium` (default): page rasterization through a dynamically loaded
//!   pdfium library. Without it, PDF uploads are rejected unless a
//!   [`PageRasterizer`] is supplied.

pub mod annotator;
pub mod config;
pub mod error;
mod fsutil;
pub mod metadata;
pub mod pdf;
pub mod qr;
pub mod stamp;
pub mod text;

pub use annotator::{ArtifactAnnotator, MetadataOutcome};
pub use config::{
    AnnotationConfig, MetadataBackend, MetadataConfig, QrConfig, QrPosition, Rgb, TextAlign,
};
pub use error::{AnnotationError, MetadataError};
pub use metadata::{
    read_mark, write_mark, writer_from_config, ExifToolWriter, MetadataWriter,
    NativeMetadataWriter,
};
pub use pdf::{page_boxes, PageBox, PageRasterizer, PdfAnnotator};
#[cfg(feature = "pdfium")]
pub use pdf::PdfiumRasterizer;
pub use stamp::ImageStamper;
