//! # Storage Keys
//!
//! A storage key names a stored artifact by the digest of its final bytes
//! plus the original file extension: `<64 hex><.ext>`.
//!
//! Because the key is derived from the bytes being stored, two writes under
//! the same key are writes of the same content. Backends rely on that to
//! make `put` idempotent.

use serde::{Deserialize, Serialize};

use crate::digest::ContentDigest;
use crate::error::ValidationError;

const MAX_EXTENSION_LEN: usize = 16;

/// Content-addressed storage key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StorageKey(String);

impl StorageKey {
    /// Build a key from the post-annotation digest and the original extension.
    ///
    /// The extension is lowercased and stripped of anything that is not
    /// ASCII alphanumeric, so a hostile filename cannot introduce path
    /// separators. An empty extension yields a bare digest key.
    pub fn new(digest: &ContentDigest, extension: &str) -> Self {
        Self(format!("{}{}", digest.to_hex(), sanitize_extension(extension)))
    }

    /// The key as a string slice, suitable as a file name or object key.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The digest portion of the key.
    pub fn digest(&self) -> Result<ContentDigest, ValidationError> {
        ContentDigest::from_hex(&self.0[..64])
    }

    /// The extension portion of the key, including the leading dot.
    pub fn extension(&self) -> &str {
        &self.0[64..]
    }
}

/// Normalize a file extension to `.xyz` form, or the empty string.
pub fn sanitize_extension(extension: &str) -> String {
    let cleaned: String = extension
        .trim_start_matches('.')
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(MAX_EXTENSION_LEN)
        .collect::<String>()
        .to_ascii_lowercase();
    if cleaned.is_empty() {
        String::new()
    } else {
        format!(".{cleaned}")
    }
}

impl std::fmt::Display for StorageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<StorageKey> for String {
    fn from(k: StorageKey) -> Self {
        k.0
    }
}

impl TryFrom<String> for StorageKey {
    type Error = ValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        if s.len() < 64 || !s.is_char_boundary(64) {
            return Err(ValidationError::InvalidStorageKey(s));
        }
        let (digest, ext) = s.split_at(64);
        if ContentDigest::from_hex(digest).is_err() || sanitize_extension(ext) != ext {
            return Err(ValidationError::InvalidStorageKey(s));
        }
        Ok(Self(s))
    }
}
