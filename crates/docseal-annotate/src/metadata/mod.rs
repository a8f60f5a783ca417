//! # Metadata Writers
//!
//! The `ID:<id>;SIG:<sig>` mark lives in a single textual comment slot of
//! the artifact's container. A [`MetadataWriter`] can clear that slot, set
//! it, and read it back.
//!
//! Two implementations are provided and the pipeline treats them the same:
//!
//! - [`NativeMetadataWriter`] edits the container in process: the JPEG `COM`
//!   segment, the PNG `tEXt` chunk with keyword `Comment`, or the
//!   `UserComment` key of the PDF document information dictionary.
//! - [`ExifToolWriter`] shells out to `exiftool` and targets its
//!   `UserComment` tag, with a hard timeout.
//!
//! Both report [`MetadataError::Unsupported`] for containers they cannot
//! write. Whether that is fatal is the caller's decision.

mod exiftool;
mod native;

use std::path::Path;
use std::sync::Arc;

use docseal_core::ArtifactMark;

pub use exiftool::ExifToolWriter;
pub use native::NativeMetadataWriter;

use crate::config::{MetadataBackend, MetadataConfig};
use crate::error::MetadataError;

/// Reads and writes the comment slot that carries the artifact mark.
pub trait MetadataWriter: Send + Sync {
    /// Remove any existing comment so no stale signature survives.
    fn clear_comment(&self, path: &Path) -> Result<(), MetadataError>;

    /// Store `comment` in the comment slot, replacing what was there.
    fn set_comment(&self, path: &Path, comment: &str) -> Result<(), MetadataError>;

    /// Current comment, if any.
    fn read_comment(&self, path: &Path) -> Result<Option<String>, MetadataError>;

    /// Human-readable name for diagnostics.
    fn name(&self) -> &str;
}

/// Clear the comment slot, then write `mark` into it.
pub fn write_mark(
    writer: &dyn MetadataWriter,
    path: &Path,
    mark: &ArtifactMark,
) -> Result<(), MetadataError> {
    writer.clear_comment(path)?;
    writer.set_comment(path, &mark.to_string())
}

/// Read the comment slot and parse it as an artifact mark.
///
/// Returns `Ok(None)` when the slot is empty or holds something else.
pub fn read_mark(
    writer: &dyn MetadataWriter,
    path: &Path,
) -> Result<Option<ArtifactMark>, MetadataError> {
    Ok(writer
        .read_comment(path)?
        .and_then(|text| ArtifactMark::parse(&text).ok()))
}

/// Build the writer selected by configuration.
pub fn writer_from_config(config: &MetadataConfig) -> Arc<dyn MetadataWriter> {
    match config.backend {
        MetadataBackend::Native => Arc::new(NativeMetadataWriter::new()),
        MetadataBackend::ExifTool => Arc::new(ExifToolWriter::new(
            config.exiftool_path.clone(),
            config.timeout,
        )),
    }
}
