//! # Content Digest
//!
//! SHA-256 digests over raw file bytes, computed incrementally so uploads
//! never need to be buffered whole.
//!
//! The same hasher produces both digests the pipeline needs:
//!
//! - the **pre-signing** digest of the uploaded bytes, which is the dedup key;
//! - the **post-annotation** digest of the final artifact, which only ever
//!   becomes part of a storage key.
//!
//! ## Serialization
//!
//! `ContentDigest` serializes as its 64-character lowercase hex form so that
//! catalog rows and JSON responses carry the same text.

use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::ValidationError;

const CHUNK_SIZE: usize = 64 * 1024;

/// A SHA-256 digest of some byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct ContentDigest {
    bytes: [u8; 32],
}

impl ContentDigest {
    /// Wrap a raw 32-byte digest.
    pub fn new(bytes: [u8; 32]) -> Self {
        Self { bytes }
    }

    /// The raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    /// Render the digest as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// Parse a 64-character hex digest.
    pub fn from_hex(s: &str) -> Result<Self, ValidationError> {
        let raw = hex::decode(s).map_err(|_| ValidationError::InvalidDigest(s.to_string()))?;
        let bytes: [u8; 32] = raw
            .try_into()
            .map_err(|_| ValidationError::InvalidDigest(s.to_string()))?;
        Ok(Self { bytes })
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<ContentDigest> for String {
    fn from(d: ContentDigest) -> Self {
        d.to_hex()
    }
}

impl TryFrom<String> for ContentDigest {
    type Error = ValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_hex(&s)
    }
}

/// Incremental SHA-256 hasher.
///
/// Feed it chunks with [`update`](Self::update) and call
/// [`finalize`](Self::finalize) once the stream is exhausted.
#[derive(Debug, Clone, Default)]
pub struct ContentHasher {
    inner: Sha256,
    bytes_hashed: u64,
}

impl ContentHasher {
    /// Create an empty hasher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Absorb the next chunk of the stream.
    pub fn update(&mut self, chunk: &[u8]) {
        self.inner.update(chunk);
        self.bytes_hashed += chunk.len() as u64;
    }

    /// Number of bytes absorbed so far.
    pub fn bytes_hashed(&self) -> u64 {
        self.bytes_hashed
    }

    /// Consume the hasher and return the digest.
    pub fn finalize(self) -> ContentDigest {
        let hash = self.inner.finalize();
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&hash);
        ContentDigest::new(bytes)
    }

    /// Hash a blocking reader to the end.
    pub fn hash_reader<R: Read>(mut reader: R) -> std::io::Result<ContentDigest> {
        let mut hasher = Self::new();
        let mut buf = vec![0u8; CHUNK_SIZE];
        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        Ok(hasher.finalize())
    }

    /// Hash an async reader to the end.
    pub async fn hash_async_reader<R: AsyncRead + Unpin>(
        mut reader: R,
    ) -> std::io::Result<ContentDigest> {
        let mut hasher = Self::new();
        let mut buf = vec![0u8; CHUNK_SIZE];
        loop {
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        Ok(hasher.finalize())
    }

    /// Hash the file at `path` without loading it into memory.
    pub async fn hash_file(path: impl AsRef<Path>) -> std::io::Result<ContentDigest> {
        let file = tokio::fs::File::open(path).await?;
        Self::hash_async_reader(file).await
    }
}

/// Compute a SHA-256 digest over an in-memory buffer.
pub fn sha256_digest(data: &[u8]) -> ContentDigest {
    let mut hasher = ContentHasher::new();
    hasher.update(data);
    hasher.finalize()
}
