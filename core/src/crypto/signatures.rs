//! # Digital Signatures
//!
//! Sign, verify, and a sign-then-verify self test, for both algorithms.
//!
//! ## Asymmetry between sign and verify
//!
//! `sign` is strict: an empty message or an empty key is an error, and so is
//! anything the underlying primitive rejects. `verify` is forgiving in the
//! other direction: it never errors. A malformed key, a truncated signature,
//! a primitive that blows up halfway through. All of it comes back as
//! `false`. To a caller, "invalid signature" and "verification crashed" mean
//! the same thing, so we don't make them handle two cases.
//!
//! ## Determinism
//!
//! Ed25519 signatures are deterministic (RFC 8032): same key, same message,
//! same 64 bytes. Dilithium2 signatures are not guaranteed deterministic:
//! the current backend happens to sign deterministically, but FIPS 204 allows
//! hedged signing and a backend swap may change that. Only verification is
//! part of the contract. Callers must not compare Dilithium2 signatures for
//! equality.

use ed25519_dalek::{Signature as DalekSignature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{ED25519_PRIVATE_KEY_LENGTH, ED25519_PUBLIC_KEY_LENGTH};
use crate::crypto::dilithium;
use crate::crypto::keys::{Algorithm, KeyPair};
use crate::error::ErrorKind;

/// Errors during signing. Verification has no error type on purpose.
#[derive(Debug, Error)]
pub enum SigningError {
    #[error("cannot sign an empty message")]
    EmptyMessage,

    #[error("cannot sign with an empty private key")]
    EmptyKey,

    #[error("{algorithm} private key must be {expected} bytes, got {got}")]
    InvalidKeyLength {
        algorithm: Algorithm,
        expected: usize,
        got: usize,
    },

    #[error("{algorithm} signing failed: {reason}")]
    Primitive {
        algorithm: Algorithm,
        reason: String,
    },
}

impl SigningError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SigningError::EmptyMessage
            | SigningError::EmptyKey
            | SigningError::InvalidKeyLength { .. } => ErrorKind::InvalidInputLength,
            SigningError::Primitive { .. } => ErrorKind::UnderlyingPrimitiveFailure,
        }
    }
}

/// A detached signature, tagged with the algorithm that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub algorithm: Algorithm,
    #[serde(with = "hex_bytes")]
    pub bytes: Vec<u8>,
}

impl Signature {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Outcome of [`self_test`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelfTestReport {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<Signature>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Sign `message` with `private_key`.
///
/// # Errors
///
/// - [`SigningError::EmptyMessage`] / [`SigningError::EmptyKey`] for empty input.
/// - [`SigningError::InvalidKeyLength`] if the key has the wrong size.
/// - [`SigningError::Primitive`] if the Dilithium2 backend is unavailable.
pub fn sign(
    message: &[u8],
    private_key: &[u8],
    algorithm: Algorithm,
) -> Result<Signature, SigningError> {
    if message.is_empty() {
        return Err(SigningError::EmptyMessage);
    }
    if private_key.is_empty() {
        return Err(SigningError::EmptyKey);
    }

    let bytes = match algorithm {
        Algorithm::Ed25519 => {
            let seed: [u8; ED25519_PRIVATE_KEY_LENGTH] =
                private_key
                    .try_into()
                    .map_err(|_| SigningError::InvalidKeyLength {
                        algorithm,
                        expected: ED25519_PRIVATE_KEY_LENGTH,
                        got: private_key.len(),
                    })?;
            let signing_key = SigningKey::from_bytes(&seed);
            signing_key.sign(message).to_bytes().to_vec()
        }
        Algorithm::Dilithium2 => {
            let backend = dilithium::backend().map_err(|reason| SigningError::Primitive {
                algorithm,
                reason: reason.to_string(),
            })?;
            backend
                .sign(message, private_key)
                .map_err(|reason| SigningError::Primitive { algorithm, reason })?
        }
    };

    tracing::debug!(
        %algorithm,
        message_len = message.len(),
        signature_len = bytes.len(),
        "message signed"
    );

    Ok(Signature { algorithm, bytes })
}

/// Verify a detached signature. Never errors: anything malformed is `false`.
pub fn verify(message: &[u8], signature: &[u8], public_key: &[u8], algorithm: Algorithm) -> bool {
    match algorithm {
        Algorithm::Ed25519 => verify_ed25519(message, signature, public_key),
        Algorithm::Dilithium2 => match dilithium::backend() {
            Ok(backend) => backend.verify(message, signature, public_key),
            Err(reason) => {
                tracing::debug!(reason, "dilithium2 backend unavailable; verification fails");
                false
            }
        },
    }
}

fn verify_ed25519(message: &[u8], signature: &[u8], public_key: &[u8]) -> bool {
    let Ok(pk_bytes) = <[u8; ED25519_PUBLIC_KEY_LENGTH]>::try_from(public_key) else {
        return false;
    };
    let Ok(verifying_key) = VerifyingKey::from_bytes(&pk_bytes) else {
        return false;
    };
    let Ok(sig) = DalekSignature::from_slice(signature) else {
        return false;
    };
    verifying_key.verify(message, &sig).is_ok()
}

/// Sign `message` with the keypair, then verify the fresh signature.
///
/// Takes the private and public halves together as a [`KeyPair`]. Signing
/// uses the private half and verification the public half, so a pair whose
/// halves do not belong together reports `success = false`. Build such a
/// pair from loose keys with [`KeyPair::from_parts`].
///
/// Failures are reported in the returned struct, not as an `Err`.
pub fn self_test(message: &[u8], keypair: &KeyPair) -> SelfTestReport {
    let algorithm = keypair.algorithm();
    let signature = match sign(message, keypair.private_key(), algorithm) {
        Ok(sig) => sig,
        Err(e) => {
            tracing::debug!(%algorithm, error = %e, "self-test signing failed");
            return SelfTestReport {
                success: false,
                signature: None,
                error: Some(e.to_string()),
            };
        }
    };

    if verify(message, signature.as_bytes(), keypair.public_key(), algorithm) {
        SelfTestReport {
            success: true,
            signature: Some(signature),
            error: None,
        }
    } else {
        tracing::warn!(%algorithm, "self-test signature did not verify");
        SelfTestReport {
            success: false,
            signature: Some(signature),
            error: Some(format!(
                "{} signature verification failed for a freshly produced signature",
                algorithm
            )),
        }
    }
}

impl KeyPair {
    /// Sign with this keypair's private key.
    pub fn sign(&self, message: &[u8]) -> Result<Signature, SigningError> {
        sign(message, self.private_key(), self.algorithm())
    }

    /// Verify against this keypair's public key.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        verify(message, signature, self.public_key(), self.algorithm())
    }

    /// Sign-then-verify round trip.
    pub fn self_test(&self, message: &[u8]) -> SelfTestReport {
        self_test(message, self)
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DILITHIUM2_SIGNATURE_LENGTH, ED25519_SIGNATURE_LENGTH};

    fn ed_kp() -> KeyPair {
        KeyPair::derive(&[0x11; 32], Algorithm::Ed25519).unwrap()
    }

    fn dil_kp() -> KeyPair {
        KeyPair::derive(&[0x22; 32], Algorithm::Dilithium2).unwrap()
    }

    #[test]
    fn test_ed25519_roundtrip() {
        let kp = ed_kp();
        let sig = kp.sign(b"hello seedkey").unwrap();
        assert_eq!(sig.len(), ED25519_SIGNATURE_LENGTH);
        assert!(kp.verify(b"hello seedkey", sig.as_bytes()));
        assert!(!kp.verify(b"hello seedkeY", sig.as_bytes()));
    }

    #[test]
    fn test_ed25519_signatures_are_deterministic() {
        let kp = ed_kp();
        assert_eq!(kp.sign(b"same").unwrap(), kp.sign(b"same").unwrap());
    }

    #[test]
    fn test_ed25519_rfc8032_signature() {
        // RFC 8032 §7.1 TEST 2: one-byte message 0x72.
        let seed =
            hex::decode("4ccd089b28ff96da9db6c346ec114e0f5b8a319f35aba624da8cf6ed4fb8a6fb")
                .unwrap();
        let sig = sign(&[0x72], &seed, Algorithm::Ed25519).unwrap();
        assert_eq!(
            sig.to_hex(),
            "92a009a9f0d4cab8720e820b5f642540a2b27b5416503f8fb3762223ebdb69da\
             085ac1e43e15996e458f3613d0f11d8c387b2eaeb4302aeeb00d291612bb0c00"
        );
    }

    #[test]
    fn test_dilithium2_roundtrip_verifies() {
        let kp = dil_kp();
        let sig = kp.sign(b"post-quantum hello").unwrap();
        assert_eq!(sig.len(), DILITHIUM2_SIGNATURE_LENGTH);
        assert!(kp.verify(b"post-quantum hello", sig.as_bytes()));
        assert!(!kp.verify(b"post-quantum hellO", sig.as_bytes()));
    }

    #[test]
    fn test_dilithium2_two_signatures_both_verify() {
        // No equality assertion: Dilithium2 signing may be randomized.
        let kp = dil_kp();
        let a = kp.sign(b"m").unwrap();
        let b = kp.sign(b"m").unwrap();
        assert!(kp.verify(b"m", a.as_bytes()));
        assert!(kp.verify(b"m", b.as_bytes()));
    }

    #[test]
    fn test_unicode_and_large_messages() {
        let unicode = "héllo wörld ✓ 🔑 ключ 鍵".as_bytes().to_vec();
        let large = vec![0xabu8; 4096];
        for kp in [ed_kp(), dil_kp()] {
            for msg in [&unicode, &large] {
                let sig = kp.sign(msg).unwrap();
                assert!(kp.verify(msg, sig.as_bytes()), "{}", kp.algorithm());
            }
        }
    }

    #[test]
    fn test_sign_rejects_empty_inputs() {
        let kp = ed_kp();
        for algorithm in Algorithm::ALL {
            let err = sign(b"", kp.private_key(), algorithm).unwrap_err();
            assert!(matches!(err, SigningError::EmptyMessage));
            assert_eq!(err.kind(), ErrorKind::InvalidInputLength);
            let err = sign(b"m", &[], algorithm).unwrap_err();
            assert!(matches!(err, SigningError::EmptyKey));
        }
    }

    #[test]
    fn test_sign_rejects_wrong_key_length() {
        let err = sign(b"m", &[1u8; 31], Algorithm::Ed25519).unwrap_err();
        assert!(matches!(err, SigningError::InvalidKeyLength { got: 31, .. }));
        let err = sign(b"m", &[1u8; 32], Algorithm::Dilithium2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnderlyingPrimitiveFailure);
    }

    #[test]
    fn test_verify_never_errors_on_garbage() {
        for algorithm in Algorithm::ALL {
            assert!(!verify(b"m", &[], &[], algorithm));
            assert!(!verify(b"m", &[0u8; 64], ed_kp().public_key(), algorithm));
            assert!(!verify(b"m", &[0xff; 7], &[0xff; 5000], algorithm));
        }
    }

    #[test]
    fn test_verify_with_wrong_key_fails() {
        let a = ed_kp();
        let b = KeyPair::derive(&[0x12; 32], Algorithm::Ed25519).unwrap();
        let sig = a.sign(b"m").unwrap();
        assert!(!b.verify(b"m", sig.as_bytes()));
    }

    #[test]
    fn test_cross_algorithm_verify_fails() {
        let ed = ed_kp();
        let sig = ed.sign(b"m").unwrap();
        assert!(!verify(b"m", sig.as_bytes(), ed.public_key(), Algorithm::Dilithium2));
    }

    #[test]
    fn test_self_test_success() {
        for kp in [ed_kp(), dil_kp()] {
            let report = self_test(b"self test", &kp);
            assert!(report.success);
            assert!(report.signature.is_some());
            assert!(report.error.is_none());
        }
    }

    #[test]
    fn test_self_test_reports_failure() {
        let report = self_test(b"", &ed_kp());
        assert!(!report.success);
        assert!(report.signature.is_none());
        assert!(report.error.unwrap().contains("empty message"));
    }

    #[test]
    fn test_self_test_detects_mismatched_dilithium2_halves() {
        let a = dil_kp();
        let b = KeyPair::derive(&[0x23; 32], Algorithm::Dilithium2).unwrap();
        let mixed = KeyPair::from_parts(
            Algorithm::Dilithium2,
            a.public_key().to_vec(),
            b.private_key().to_vec(),
        )
        .unwrap();

        let report = self_test(b"self test", &mixed);
        assert!(!report.success);
        assert!(report.signature.is_some());
        assert!(report.error.unwrap().contains("verification failed"));
    }

    #[test]
    fn test_signature_serializes_as_hex() {
        let sig = ed_kp().sign(b"m").unwrap();
        let json = serde_json::to_value(&sig).unwrap();
        assert_eq!(json["algorithm"], "Ed25519");
        assert_eq!(json["bytes"], sig.to_hex());
        let back: Signature = serde_json::from_value(json).unwrap();
        assert_eq!(back, sig);
    }
}
