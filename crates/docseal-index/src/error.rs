//! # Catalog Error Types

use docseal_core::ContentDigest;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexError {
    /// Another document already claims this content hash. Signing callers
    /// treat this as "return the existing document".
    #[error("a document with content hash {0} already exists")]
    DuplicateContentHash(ContentDigest),

    /// A stored row could not be mapped back to a record.
    #[error("corrupt catalog row: {0}")]
    CorruptRow(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}
