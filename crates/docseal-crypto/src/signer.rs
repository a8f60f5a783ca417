//! # Signer
//!
//! `sign(bytes) -> base64 signature` using PKCS#1 v1.5 over SHA-256.
//!
//! The pipeline already streams the upload through a
//! [`ContentHasher`](docseal_core::ContentHasher) for dedup, so it signs
//! that digest directly with [`Signer::sign_prehashed`]. The result is
//! identical to [`Signer::sign`] over the same bytes.
//!
//! Verification is not part of the read path. [`verify_signature`] and
//! [`verify_digest`] exist for offline checks and tests.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use docseal_core::{sha256_digest, ContentDigest};
use rsa::{Pkcs1v15Sign, RsaPublicKey};
use sha2::Sha256;

use crate::error::CryptoError;
use crate::key_provider::KeyProvider;

/// Raw RSA signature bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsaSignature(Vec<u8>);

impl RsaSignature {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Standard (padded) base64, the form stored in the catalog and artifacts.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.0)
    }

    pub fn from_base64(s: &str) -> Result<Self, CryptoError> {
        STANDARD
            .decode(s.trim())
            .map(Self)
            .map_err(|e| CryptoError::InvalidSignatureEncoding(e.to_string()))
    }
}

/// Signs documents with the key held by a [`KeyProvider`].
#[derive(Clone)]
pub struct Signer {
    provider: Arc<dyn KeyProvider>,
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer")
            .field("provider", &self.provider.provider_name())
            .finish()
    }
}

impl Signer {
    pub fn new(provider: Arc<dyn KeyProvider>) -> Self {
        Self { provider }
    }

    /// Sign `bytes`, returning the base64 signature.
    pub fn sign(&self, bytes: &[u8]) -> Result<String, CryptoError> {
        self.sign_prehashed(&sha256_digest(bytes))
    }

    /// Sign bytes whose SHA-256 digest has already been computed.
    pub fn sign_prehashed(&self, digest: &ContentDigest) -> Result<String, CryptoError> {
        let sig = self.provider.sign_digest(digest)?;
        tracing::debug!(
            provider = self.provider.provider_name(),
            digest = %digest,
            "signed document digest"
        );
        Ok(sig.to_base64())
    }

    /// Public key matching the signatures this signer produces.
    pub fn public_key(&self) -> Result<RsaPublicKey, CryptoError> {
        self.provider.public_key()
    }

    pub fn provider_name(&self) -> &str {
        self.provider.provider_name()
    }
}

/// Check a base64 signature against the original bytes.
pub fn verify_signature(
    bytes: &[u8],
    signature_b64: &str,
    public_key: &RsaPublicKey,
) -> Result<(), CryptoError> {
    let sig = RsaSignature::from_base64(signature_b64)?;
    verify_digest(&sha256_digest(bytes), &sig, public_key)
}

/// Check a signature against a precomputed SHA-256 digest.
pub fn verify_digest(
    digest: &ContentDigest,
    signature: &RsaSignature,
    public_key: &RsaPublicKey,
) -> Result<(), CryptoError> {
    public_key
        .verify(
            Pkcs1v15Sign::new::<Sha256>(),
            digest.as_bytes(),
            signature.as_bytes(),
        )
        .map_err(|e| CryptoError::VerificationFailed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key_provider::tests::test_provider;
    use crate::key_provider::LocalKeyProvider;

    struct BorrowedProvider(&'static LocalKeyProvider);

    impl KeyProvider for BorrowedProvider {
        fn sign_digest(&self, digest: &ContentDigest) -> Result<RsaSignature, CryptoError> {
            self.0.sign_digest(digest)
        }
        fn public_key(&self) -> Result<RsaPublicKey, CryptoError> {
            self.0.public_key()
        }
        fn provider_name(&self) -> &str {
            "borrowed"
        }
    }

    struct BrokenProvider;

    impl KeyProvider for BrokenProvider {
        fn sign_digest(&self, _: &ContentDigest) -> Result<RsaSignature, CryptoError> {
            Err(CryptoError::KeyUnavailable("vault sealed".into()))
        }
        fn public_key(&self) -> Result<RsaPublicKey, CryptoError> {
            Err(CryptoError::KeyUnavailable("vault sealed".into()))
        }
        fn provider_name(&self) -> &str {
            "broken"
        }
    }

    fn signer() -> Signer {
        Signer::new(Arc::new(BorrowedProvider(test_provider())))
    }

    #[test]
    fn signing_twice_yields_valid_signatures() {
        let signer = signer();
        let public = signer.public_key().unwrap();
        let bytes = b"original upload bytes";
        let a = signer.sign(bytes).unwrap();
        let b = signer.sign(bytes).unwrap();
        verify_signature(bytes, &a, &public).unwrap();
        verify_signature(bytes, &b, &public).unwrap();
    }

    #[test]
    fn prehashed_matches_direct() {
        let signer = signer();
        let bytes = b"stream";
        assert_eq!(
            signer.sign(bytes).unwrap(),
            signer.sign_prehashed(&sha256_digest(bytes)).unwrap()
        );
    }

    #[test]
    fn tampered_bytes_fail_verification() {
        let signer = signer();
        let public = signer.public_key().unwrap();
        let sig = signer.sign(b"approved").unwrap();
        assert!(matches!(
            verify_signature(b"approved!", &sig, &public),
            Err(CryptoError::VerificationFailed(_))
        ));
    }

    #[test]
    fn garbage_signature_is_encoding_error() {
        let public = signer().public_key().unwrap();
        assert!(matches!(
            verify_signature(b"x", "%%%not base64", &public),
            Err(CryptoError::InvalidSignatureEncoding(_))
        ));
    }

    #[test]
    fn provider_failure_propagates() {
        let signer = Signer::new(Arc::new(BrokenProvider));
        assert!(matches!(
            signer.sign(b"x"),
            Err(CryptoError::KeyUnavailable(_))
        ));
        assert!(format!("{signer:?}").contains("broken"));
    }
}
