//! # Artifact Mark
//!
//! The textual metadata value embedded into every signed artifact:
//!
//! ```text
//! ID:<uuid>;SIG:<base64 signature>
//! ```
//!
//! The value is ASCII only. Base64 never contains `;` so the split is
//! unambiguous.

use std::str::FromStr;

use crate::error::ValidationError;
use crate::identity::DocumentId;

/// Identifier and signature pair carried inside an artifact's metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactMark {
    pub id: DocumentId,
    pub signature: String,
}

impl ArtifactMark {
    pub fn new(id: DocumentId, signature: impl Into<String>) -> Self {
        Self {
            id,
            signature: signature.into(),
        }
    }

    /// Parse a metadata comment back into its parts.
    pub fn parse(text: &str) -> Result<Self, ValidationError> {
        text.parse()
    }
}

impl std::fmt::Display for ArtifactMark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ID:{};SIG:{}", self.id, self.signature)
    }
}

impl FromStr for ArtifactMark {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ValidationError::MalformedMark(s.to_string());
        let text = s.trim();
        let (id_part, sig_part) = text.split_once(';').ok_or_else(malformed)?;
        let id = id_part.strip_prefix("ID:").ok_or_else(malformed)?;
        let signature = sig_part.strip_prefix("SIG:").ok_or_else(malformed)?;
        if signature.is_empty() || !signature.is_ascii() {
            return Err(malformed());
        }
        let id = id.parse::<DocumentId>().map_err(|_| malformed())?;
        Ok(Self::new(id, signature))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn formats_as_id_then_signature() {
        let id = DocumentId::new();
        let mark = ArtifactMark::new(id, "c2lnbmF0dXJl");
        assert_eq!(mark.to_string(), format!("ID:{id};SIG:c2lnbmF0dXJl"));
    }

    #[test]
    fn rejects_malformed_values() {
        for bad in [
            "",
            "ID:;SIG:abc",
            "SIG:abc;ID:0d8f6a44-8b7e-4a59-9a43-1c1f0fa1d2b7",
            "ID:0d8f6a44-8b7e-4a59-9a43-1c1f0fa1d2b7;SIG:",
            "ID:0d8f6a44-8b7e-4a59-9a43-1c1f0fa1d2b7",
        ] {
            assert!(ArtifactMark::parse(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn tolerates_trailing_whitespace_from_tools() {
        let id = DocumentId::new();
        let parsed = ArtifactMark::parse(&format!("ID:{id};SIG:AAAA\n")).unwrap();
        assert_eq!(parsed.id, id);
        assert_eq!(parsed.signature, "AAAA");
    }

    proptest! {
        #[test]
        fn any_base64_signature_survives(sig in "[A-Za-z0-9+/]{4,344}={0,2}") {
            let mark = ArtifactMark::new(DocumentId::new(), sig.clone());
            let parsed = ArtifactMark::parse(&mark.to_string()).unwrap();
            prop_assert_eq!(parsed, mark);
        }
    }
}
