//! # Inspect Subcommand
//!
//! Reads the `ID:<uuid>;SIG:<base64>` mark back out of a signed artifact's
//! metadata. Exit code 1 when the file carries no readable mark.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use docseal_annotate::{read_mark, writer_from_config, MetadataBackend, MetadataConfig};
use docseal_core::ArtifactMark;

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// A signed artifact (JPEG, PNG or PDF).
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
    /// Metadata backend: `native` or `exiftool`.
    #[arg(long, default_value = "native")]
    pub backend: String,
    /// Path to the exiftool binary for `--backend exiftool`.
    #[arg(long, default_value = "exiftool")]
    pub exiftool: PathBuf,
    /// Print the mark as `key=value` lines instead of prose.
    #[arg(long)]
    pub raw: bool,
}

pub fn run_inspect(args: &InspectArgs) -> Result<u8> {
    let mark = inspect(args)?;
    match mark {
        Some(mark) if args.raw => {
            println!("id={}", mark.id);
            println!("signature={}", mark.signature);
            Ok(0)
        }
        Some(mark) => {
            println!("Document ID: {}", mark.id);
            println!("Signature:   {}", mark.signature);
            Ok(0)
        }
        None => {
            println!("no docseal mark found in {}", args.file.display());
            Ok(1)
        }
    }
}

fn inspect(args: &InspectArgs) -> Result<Option<ArtifactMark>> {
    let backend: MetadataBackend = args.backend.parse().map_err(anyhow::Error::msg)?;
    let writer = writer_from_config(&MetadataConfig {
        backend,
        exiftool_path: args.exiftool.clone(),
        timeout: Duration::from_secs(30),
    });
    read_mark(writer.as_ref(), &args.file)
        .with_context(|| format!("failed to read metadata from {}", args.file.display()))
}
