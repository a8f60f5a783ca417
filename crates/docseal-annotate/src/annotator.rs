//! # Artifact Annotator
//!
//! Single entry point used by the signing pipeline. Applies the visible
//! mark for the artifact's kind, then writes the `ID:<id>;SIG:<sig>`
//! metadata exactly once, on the fully mutated file.
//!
//! | Kind | Visible mark | Metadata failure |
//! |---|---|---|
//! | PNG, JPEG | banner, text, optional QR | fatal |
//! | PDF | same, on every rasterized page | fatal |
//! | other | none | logged, artifact left as is |

use std::path::Path;
use std::sync::Arc;

use docseal_core::{ArtifactMark, FileKind};

use crate::config::AnnotationConfig;
use crate::error::{AnnotationError, MetadataError};
use crate::metadata::{self, writer_from_config, MetadataWriter};
use crate::pdf::{PageRasterizer, PdfAnnotator};
use crate::stamp::ImageStamper;

/// Whether the metadata field ended up in the artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataOutcome {
    Written,
    /// The container has no usable slot; only the catalog carries the signature.
    Skipped,
}

/// Stamps images and PDFs and embeds the artifact mark.
#[derive(Clone)]
pub struct ArtifactAnnotator {
    stamper: Option<ImageStamper>,
    pdf: Option<PdfAnnotator>,
    writer: Arc<dyn MetadataWriter>,
}

impl std::fmt::Debug for ArtifactAnnotator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactAnnotator")
            .field("stamper", &self.stamper.is_some())
            .field("pdf", &self.pdf)
            .field("writer", &self.writer.name())
            .finish()
    }
}

impl ArtifactAnnotator {
    pub fn new(
        stamper: Option<ImageStamper>,
        pdf: Option<PdfAnnotator>,
        writer: Arc<dyn MetadataWriter>,
    ) -> Self {
        Self {
            stamper,
            pdf,
            writer,
        }
    }

    /// Build from configuration: load the font, bind the PDF rasterizer
    /// when available and pick the metadata backend.
    ///
    /// A missing font is an error. A missing rasterizer is not: PDF
    /// uploads then fail with [`AnnotationError::RasterizerUnavailable`].
    pub fn from_config(config: &AnnotationConfig) -> Result<Self, AnnotationError> {
        let stamper = ImageStamper::new(config.clone())?;
        let pdf = default_rasterizer(config).map(|r| PdfAnnotator::new(r, config.pdf_render_dpi));
        let writer = writer_from_config(&config.metadata);
        tracing::info!(
            font = %config.font_path.display(),
            qr = config.qr.enabled,
            pdf = pdf.as_ref().map(|p| p.rasterizer_name()).unwrap_or("none"),
            metadata = writer.name(),
            "artifact annotator ready"
        );
        Ok(Self::new(Some(stamper), pdf, writer))
    }

    /// Metadata-only annotator: every kind is left visually untouched.
    pub fn metadata_only(writer: Arc<dyn MetadataWriter>) -> Self {
        Self::new(None, None, writer)
    }

    pub fn with_pdf(mut self, rasterizer: Arc<dyn PageRasterizer>, dpi: f32) -> Self {
        self.pdf = Some(PdfAnnotator::new(rasterizer, dpi));
        self
    }

    pub fn metadata_writer(&self) -> &dyn MetadataWriter {
        self.writer.as_ref()
    }

    /// Annotate the file at `path` in place.
    ///
    /// On error the file may have been partially rewritten; callers own
    /// the file and discard it.
    pub fn annotate(
        &self,
        path: &Path,
        kind: FileKind,
        mark: &ArtifactMark,
    ) -> Result<MetadataOutcome, AnnotationError> {
        match kind {
            FileKind::Png | FileKind::Jpeg => {
                let stamper = self
                    .stamper
                    .as_ref()
                    .ok_or(AnnotationError::StamperUnavailable)?;
                stamper.stamp_file(path, kind, &mark.id)?;
            }
            FileKind::Pdf => {
                let stamper = self
                    .stamper
                    .as_ref()
                    .ok_or(AnnotationError::StamperUnavailable)?;
                let pdf = self.pdf.as_ref().ok_or_else(|| {
                    AnnotationError::RasterizerUnavailable("no PDF rasterizer configured".into())
                })?;
                pdf.annotate(path, stamper, &mark.id)?;
            }
            FileKind::Other => {}
        }

        match metadata::write_mark(self.writer.as_ref(), path, mark) {
            Ok(()) => Ok(MetadataOutcome::Written),
            Err(err) if kind == FileKind::Other => {
                match &err {
                    MetadataError::Unsupported(_) => {
                        tracing::debug!(path = %path.display(), "no metadata slot; artifact left as is")
                    }
                    other => {
                        tracing::warn!(path = %path.display(), error = %other, "metadata write skipped")
                    }
                }
                Ok(MetadataOutcome::Skipped)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Read the artifact mark back from a file.
    pub fn read_mark(&self, path: &Path) -> Result<Option<ArtifactMark>, MetadataError> {
        metadata::read_mark(self.writer.as_ref(), path)
    }
}

#[cfg(feature = "pdfium")]
fn default_rasterizer(config: &AnnotationConfig) -> Option<Arc<dyn PageRasterizer>> {
    match crate::pdf::PdfiumRasterizer::spawn(config.pdfium_library_dir.as_deref()) {
        Ok(r) => Some(Arc::new(r)),
        Err(err) => {
            tracing::warn!(error = %err, "pdfium unavailable; PDF uploads will be rejected");
            None
        }
    }
}

#[cfg(not(feature = "pdfium"))]
fn default_rasterizer(_: &AnnotationConfig) -> Option<Arc<dyn PageRasterizer>> {
    tracing::warn!("built without pdfium; PDF uploads will be rejected");
    None
}
