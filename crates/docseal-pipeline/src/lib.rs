//! # docseal-pipeline — Signing and Verification Orchestration
//!
//! Composes the hasher, signer, annotator, storage backend and catalog:
//!
//! - [`SigningPipeline`]: upload → hash → dedup → sign → annotate → store → catalog.
//! - [`VerificationService`]: identifier → atomic counter bump → hydrated view.
//! - [`DocumentAdmin`]: visibility, listing, artifact retrieval, removal.
//!
//! Steps within one invocation run in sequence. Invocations are isolated
//! from each other except at the catalog, whose unique content-hash
//! constraint settles dedup races. Nothing here retries; a failed upload
//! can be resubmitted as a whole.

pub mod admin;
pub mod config;
pub mod error;
pub mod signing;
pub mod verification;

pub use admin::DocumentAdmin;
pub use config::PipelineConfig;
pub use error::{PipelineError, PipelineStage};
pub use signing::{SigningOutcome, SigningPipeline, UploadRequest};
pub use verification::VerificationService;
