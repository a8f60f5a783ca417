//! # docseal-index — Document Catalog
//!
//! Persistent records for signed artifacts. [`DocumentRepository`] is the
//! seam; [`InMemoryDocumentRepository`] and [`PgDocumentRepository`]
//! implement it.
//!
//! The catalog guarantees two things the pipeline relies on:
//!
//! - At most one record per content hash. A losing concurrent `create`
//!   fails with [`IndexError::DuplicateContentHash`].
//! - Verification counting is atomic. N concurrent increments add N.

pub mod db;
pub mod directory;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod repository;

pub use db::init_pool;
pub use directory::{AttributionDirectory, InMemoryDirectory, PgDirectory};
pub use error::IndexError;
pub use memory::InMemoryDocumentRepository;
pub use postgres::PgDocumentRepository;
pub use query::{DocumentQuery, OwnerScope, Page, Visibility, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use repository::DocumentRepository;
