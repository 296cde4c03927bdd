//! # `did:key` Identifiers
//!
//! A `did:key` identifier is a public key wearing a name tag:
//!
//! ```text
//! did:key:z<base58btc(multicodec_tag ‖ public_key)>
//! ```
//!
//! Example (Ed25519, seed `0x01 * 32`):
//! `did:key:z6Mkon3Necd6NkkyfoGoHxid2znGc59LU3K7mubaRcFbLfLX`
//!
//! The `z` is the multibase marker for base58btc. The 2-byte tag tells a
//! resolver what kind of key follows: `0xed 0x01` is the registered
//! multicodec for Ed25519 public keys. Dilithium2 has no registered code in
//! the form we need, so it gets a configurable placeholder (`0x12 0x34` by
//! default). Identifiers carrying it are experimental and will not resolve
//! anywhere else.
//!
//! ## DID Document
//!
//! [`DidKey::to_did_document`] expands an identifier into a W3C DID Core
//! document with one verification method, referenced from both
//! `authentication` and `assertionMethod`.
//!
//! ## Standards References
//!
//! - [DID Core v1.0](https://www.w3.org/TR/did-core/)
//! - [The did:key Method](https://w3c-ccg.github.io/did-method-key/)
//! - [Multicodec table](https://github.com/multiformats/multicodec)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{
    SeedKeyConfig, DID_KEY_PREFIX, DILITHIUM2_EXPERIMENTAL_MULTICODEC, ED25519_MULTICODEC,
    MULTIBASE_BASE58BTC,
};
use crate::crypto::keys::{Algorithm, KeyPair};
use crate::error::ErrorKind;

/// Context URI for the W3C DID Core specification.
const DID_CONTEXT: &str = "https://www.w3.org/ns/did/v1";

/// Context URI for the Ed25519 verification key suite.
const ED25519_CONTEXT: &str = "https://w3id.org/security/suites/ed25519-2020/v1";

/// Context URI for generic multikey verification methods.
const MULTIKEY_CONTEXT: &str = "https://w3id.org/security/multikey/v1";

const ED25519_VERIFICATION_KEY_TYPE: &str = "Ed25519VerificationKey2020";
const MULTIKEY_TYPE: &str = "Multikey";

/// Tag plus at least one byte of key.
const MIN_PAYLOAD_LEN: usize = 3;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur while decoding or resolving an identifier.
#[derive(Debug, Error)]
pub enum DidError {
    /// The string is not `did:key:z…`.
    #[error("invalid DID format: {0}")]
    InvalidFormat(String),

    /// The multibase body is not base58btc.
    #[error("invalid base58btc payload: {0}")]
    InvalidBase58(String),

    /// Fewer than 3 bytes after base58 decoding.
    #[error("payload too short: {0} bytes, need at least 3")]
    PayloadTooShort(usize),

    /// The multicodec tag doesn't map to a known algorithm.
    #[error("unknown multicodec tag 0x{}", hex::encode(.0))]
    UnknownTag([u8; 2]),

    /// Tag and key length disagree.
    #[error("{algorithm} public key must be {expected} bytes, got {got}")]
    KeyLengthMismatch {
        algorithm: Algorithm,
        expected: usize,
        got: usize,
    },

    /// Serialization error during document generation or parsing.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A configured Dilithium2 tag equal to the Ed25519 tag.
    #[error("dilithium2 multicodec tag 0x{} collides with ed25519", hex::encode(.0))]
    TagCollision([u8; 2]),
}

impl DidError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::DecodeFormatError
    }
}

// ---------------------------------------------------------------------------
// Encode / decode
// ---------------------------------------------------------------------------

/// An encoded identifier and the two strings derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidKey {
    did: String,
    multibase: String,
    verification_method_id: String,
}

impl DidKey {
    /// The full identifier, `did:key:z…`.
    pub fn did(&self) -> &str {
        &self.did
    }

    /// The `z…` part.
    pub fn multibase(&self) -> &str {
        &self.multibase
    }

    /// `<did>#<multibase>`, the id of the single verification method.
    pub fn verification_method_id(&self) -> &str {
        &self.verification_method_id
    }

    /// Build the DID document. `algorithm` picks the verification method type.
    pub fn to_did_document(&self, algorithm: Algorithm) -> DidDocument {
        let (context, method_type) = match algorithm {
            Algorithm::Ed25519 => (
                vec![DID_CONTEXT.to_string(), ED25519_CONTEXT.to_string()],
                ED25519_VERIFICATION_KEY_TYPE,
            ),
            Algorithm::Dilithium2 => (
                vec![DID_CONTEXT.to_string(), MULTIKEY_CONTEXT.to_string()],
                MULTIKEY_TYPE,
            ),
        };

        DidDocument {
            context,
            id: self.did.clone(),
            verification_method: vec![VerificationMethod {
                id: self.verification_method_id.clone(),
                type_: method_type.to_string(),
                controller: self.did.clone(),
                public_key_multibase: self.multibase.clone(),
            }],
            authentication: vec![self.verification_method_id.clone()],
            assertion_method: vec![self.verification_method_id.clone()],
            created: Utc::now(),
        }
    }
}

impl std::fmt::Display for DidKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.did)
    }
}

/// Encode a public key under a 2-byte multicodec tag.
///
/// # Examples
///
/// ```
/// use seedkey_core::identity::did::{decode, encode};
///
/// let pk = [9u8; 32];
/// let did = encode(&pk, [0xed, 0x01]);
/// assert!(did.did().starts_with("did:key:z6Mk"));
/// let (tag, key) = decode(did.did()).unwrap();
/// assert_eq!(tag, [0xed, 0x01]);
/// assert_eq!(key, pk);
/// ```
pub fn encode(public_key: &[u8], tag: [u8; 2]) -> DidKey {
    let mut payload = Vec::with_capacity(tag.len() + public_key.len());
    payload.extend_from_slice(&tag);
    payload.extend_from_slice(public_key);

    let multibase = format!(
        "{}{}",
        MULTIBASE_BASE58BTC,
        bs58::encode(&payload).into_string()
    );
    let did = format!("{}{}", DID_KEY_PREFIX, multibase);
    let verification_method_id = format!("{}#{}", did, multibase);

    DidKey {
        did,
        multibase,
        verification_method_id,
    }
}

/// Split an identifier back into `(tag, public_key)`.
///
/// Only the shape is checked here. Use [`IdentifierCodec::decode`] to also
/// check the tag and the key length.
pub fn decode(did: &str) -> Result<([u8; 2], Vec<u8>), DidError> {
    let body = did.strip_prefix(DID_KEY_PREFIX).ok_or_else(|| {
        DidError::InvalidFormat(format!("expected '{}' prefix", DID_KEY_PREFIX))
    })?;
    let encoded = body.strip_prefix(MULTIBASE_BASE58BTC).ok_or_else(|| {
        DidError::InvalidFormat(format!(
            "expected multibase prefix '{}' (base58btc)",
            MULTIBASE_BASE58BTC
        ))
    })?;

    let payload = bs58::decode(encoded)
        .into_vec()
        .map_err(|e| DidError::InvalidBase58(e.to_string()))?;

    if payload.len() < MIN_PAYLOAD_LEN {
        return Err(DidError::PayloadTooShort(payload.len()));
    }

    let tag = [payload[0], payload[1]];
    Ok((tag, payload[2..].to_vec()))
}

// ---------------------------------------------------------------------------
// IdentifierCodec
// ---------------------------------------------------------------------------

/// A decoded identifier with its algorithm resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDid {
    pub algorithm: Algorithm,
    pub tag: [u8; 2],
    pub public_key: Vec<u8>,
    pub experimental: bool,
}

/// Maps algorithms to multicodec tags and back.
///
/// The Ed25519 tag is fixed. The Dilithium2 tag is a placeholder and can be
/// swapped for whatever a deployment settles on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentifierCodec {
    dilithium2_tag: [u8; 2],
}

impl Default for IdentifierCodec {
    fn default() -> Self {
        Self {
            dilithium2_tag: DILITHIUM2_EXPERIMENTAL_MULTICODEC,
        }
    }
}

impl IdentifierCodec {
    /// Codec with a custom Dilithium2 tag. The Ed25519 tag is rejected,
    /// since decoding would become ambiguous.
    pub fn with_dilithium2_tag(tag: [u8; 2]) -> Result<Self, DidError> {
        if tag == ED25519_MULTICODEC {
            return Err(DidError::TagCollision(tag));
        }
        Ok(Self {
            dilithium2_tag: tag,
        })
    }

    pub fn from_config(config: &SeedKeyConfig) -> Result<Self, DidError> {
        Self::with_dilithium2_tag(config.dilithium2_tag)
    }

    pub fn tag_for(&self, algorithm: Algorithm) -> [u8; 2] {
        match algorithm {
            Algorithm::Ed25519 => ED25519_MULTICODEC,
            Algorithm::Dilithium2 => self.dilithium2_tag,
        }
    }

    pub fn algorithm_for(&self, tag: [u8; 2]) -> Option<Algorithm> {
        if tag == ED25519_MULTICODEC {
            Some(Algorithm::Ed25519)
        } else if tag == self.dilithium2_tag {
            Some(Algorithm::Dilithium2)
        } else {
            None
        }
    }

    /// Every tag except the registered Ed25519 one.
    pub fn is_experimental(&self, tag: [u8; 2]) -> bool {
        tag != ED25519_MULTICODEC
    }

    /// Encode a public key for `algorithm`.
    pub fn encode(&self, public_key: &[u8], algorithm: Algorithm) -> DidKey {
        let tag = self.tag_for(algorithm);
        if self.is_experimental(tag) {
            tracing::warn!(
                %algorithm,
                tag = %hex::encode(tag),
                "encoding identifier with an experimental multicodec tag"
            );
        }
        encode(public_key, tag)
    }

    pub fn encode_keypair(&self, keypair: &KeyPair) -> DidKey {
        self.encode(keypair.public_key(), keypair.algorithm())
    }

    /// Decode and resolve: known tag, correct key length.
    pub fn decode(&self, did: &str) -> Result<ResolvedDid, DidError> {
        let (tag, public_key) = decode(did)?;
        let algorithm = self.algorithm_for(tag).ok_or(DidError::UnknownTag(tag))?;
        let expected = algorithm.info().public_key_len;
        if public_key.len() != expected {
            return Err(DidError::KeyLengthMismatch {
                algorithm,
                expected,
                got: public_key.len(),
            });
        }
        Ok(ResolvedDid {
            algorithm,
            tag,
            public_key,
            experimental: self.is_experimental(tag),
        })
    }

    /// Decode an identifier and expand it into its DID document.
    pub fn resolve_document(&self, did: &str) -> Result<DidDocument, DidError> {
        let resolved = self.decode(did)?;
        let did_key = encode(&resolved.public_key, resolved.tag);
        Ok(did_key.to_did_document(resolved.algorithm))
    }
}

// ---------------------------------------------------------------------------
// DID Document Types
// ---------------------------------------------------------------------------

/// A W3C DID Document for a `did:key` identifier.
///
/// Single-key: every verification relationship references the same method.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DidDocument {
    /// JSON-LD context URIs.
    #[serde(rename = "@context")]
    pub context: Vec<String>,

    /// The DID string this document describes.
    pub id: String,

    /// Verification methods (cryptographic keys) associated with this DID.
    #[serde(rename = "verificationMethod")]
    pub verification_method: Vec<VerificationMethod>,

    /// References to verification methods usable for authentication.
    pub authentication: Vec<String>,

    /// References to verification methods usable for issuing assertions.
    #[serde(rename = "assertionMethod")]
    pub assertion_method: Vec<String>,

    /// When this document was generated.
    pub created: DateTime<Utc>,
}

impl DidDocument {
    /// Serialize this document to a pretty-printed JSON string.
    pub fn to_json(&self) -> Result<String, DidError> {
        serde_json::to_string_pretty(self).map_err(|e| DidError::Serialization(e.to_string()))
    }

    /// Parse a DID Document from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, DidError> {
        serde_json::from_str(json).map_err(|e| DidError::Serialization(e.to_string()))
    }

    /// Validate that the document has the required fields and structure.
    ///
    /// Checks:
    /// - The `id` field is a `did:key` identifier
    /// - At least one verification method is present
    /// - At least one authentication reference is present, and every
    ///   reference points at a listed verification method
    /// - The DID Core context is included
    pub fn validate(&self) -> Result<(), DidError> {
        let key_prefix = format!("{}{}", DID_KEY_PREFIX, MULTIBASE_BASE58BTC);
        if !self.id.starts_with(&key_prefix) {
            return Err(DidError::InvalidFormat(format!(
                "document ID must start with '{}'",
                key_prefix
            )));
        }

        if self.verification_method.is_empty() {
            return Err(DidError::InvalidFormat(
                "document must have at least one verification method".into(),
            ));
        }

        if self.authentication.is_empty() {
            return Err(DidError::InvalidFormat(
                "document must have at least one authentication method".into(),
            ));
        }

        let dangling = self
            .authentication
            .iter()
            .chain(self.assertion_method.iter())
            .find(|r| !self.verification_method.iter().any(|vm| &vm.id == *r));
        if let Some(reference) = dangling {
            return Err(DidError::InvalidFormat(format!(
                "reference '{}' does not match any verification method",
                reference
            )));
        }

        if !self.context.iter().any(|c| c == DID_CONTEXT) {
            return Err(DidError::InvalidFormat(
                "document must include DID Core context".into(),
            ));
        }

        Ok(())
    }
}

/// A verification method entry in a DID Document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationMethod {
    /// `<did>#<multibase>`.
    pub id: String,

    /// `Ed25519VerificationKey2020`, or `Multikey` for Dilithium2.
    #[serde(rename = "type")]
    pub type_: String,

    /// The DID that controls this verification method.
    pub controller: String,

    /// The public key material in multibase encoding (base58btc with 'z' prefix).
    #[serde(rename = "publicKeyMultibase")]
    pub public_key_multibase: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const GOLDEN_DID: &str = "did:key:z6Mkon3Necd6NkkyfoGoHxid2znGc59LU3K7mubaRcFbLfLX";
    const RFC8032_DID: &str = "did:key:z6MktwupdmLXVVqTzCw4i46r4uGyosGXRnR3XjN4Zq7oMMsw";

    fn ed_kp(seed: u8) -> KeyPair {
        KeyPair::derive(&[seed; 32], Algorithm::Ed25519).unwrap()
    }

    #[test]
    fn golden_ed25519_identifier() {
        let did = IdentifierCodec::default().encode_keypair(&ed_kp(1));
        assert_eq!(did.did(), GOLDEN_DID);
        assert_eq!(did.multibase(), &GOLDEN_DID["did:key:".len()..]);
        assert_eq!(
            did.verification_method_id(),
            format!("{}#{}", GOLDEN_DID, did.multibase())
        );
    }

    #[test]
    fn rfc8032_identifier() {
        let pk = hex::decode("d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a")
            .unwrap();
        assert_eq!(encode(&pk, ED25519_MULTICODEC).did(), RFC8032_DID);
    }

    #[test]
    fn ed25519_identifiers_start_with_z6mk() {
        for seed in 0..8 {
            let did = IdentifierCodec::default().encode_keypair(&ed_kp(seed));
            assert!(did.did().starts_with("did:key:z6Mk"), "{}", did);
        }
    }

    #[test]
    fn decode_inverts_encode() {
        let pk = vec![0xabu8; 1312];
        for tag in [ED25519_MULTICODEC, DILITHIUM2_EXPERIMENTAL_MULTICODEC, [0, 0]] {
            let did = encode(&pk, tag);
            let (got_tag, got_pk) = decode(did.did()).unwrap();
            assert_eq!(got_tag, tag);
            assert_eq!(got_pk, pk);
        }
    }

    #[test]
    fn decode_preserves_leading_zero_bytes() {
        let did = encode(&[0u8, 0, 1], [0, 0]);
        let (tag, pk) = decode(did.did()).unwrap();
        assert_eq!(tag, [0, 0]);
        assert_eq!(pk, vec![0, 0, 1]);
    }

    #[test]
    fn decode_rejects_bad_prefixes() {
        for bad in ["", "did:web:example.com", "did:key:", "did:key:f00ff", "DID:KEY:z6Mk"] {
            let err = decode(bad).unwrap_err();
            assert!(matches!(err, DidError::InvalidFormat(_)), "{}", bad);
            assert_eq!(err.kind(), ErrorKind::DecodeFormatError);
        }
    }

    #[test]
    fn decode_rejects_invalid_base58() {
        // '0', 'O', 'I' and 'l' are not in the base58btc alphabet.
        let err = decode("did:key:z0OIl").unwrap_err();
        assert!(matches!(err, DidError::InvalidBase58(_)));
    }

    #[test]
    fn decode_rejects_short_payload() {
        let short = format!("did:key:z{}", bs58::encode([0xed, 0x01]).into_string());
        assert!(matches!(decode(&short), Err(DidError::PayloadTooShort(2))));
        assert!(matches!(decode("did:key:z"), Err(DidError::PayloadTooShort(0))));
    }

    #[test]
    fn codec_resolves_algorithms() {
        let codec = IdentifierCodec::default();
        let ed = ed_kp(1);
        let resolved = codec.decode(GOLDEN_DID).unwrap();
        assert_eq!(resolved.algorithm, Algorithm::Ed25519);
        assert_eq!(resolved.public_key, ed.public_key());
        assert!(!resolved.experimental);

        let dil = KeyPair::derive(&[1u8; 32], Algorithm::Dilithium2).unwrap();
        let did = codec.encode_keypair(&dil);
        let resolved = codec.decode(did.did()).unwrap();
        assert_eq!(resolved.algorithm, Algorithm::Dilithium2);
        assert_eq!(resolved.public_key, dil.public_key());
        assert!(resolved.experimental);
    }

    #[test]
    fn codec_rejects_unknown_tag_and_wrong_length() {
        let codec = IdentifierCodec::default();
        let unknown = encode(&[1u8; 32], [0xaa, 0xbb]);
        assert!(matches!(
            codec.decode(unknown.did()),
            Err(DidError::UnknownTag([0xaa, 0xbb]))
        ));

        let short_key = encode(&[1u8; 31], ED25519_MULTICODEC);
        assert!(matches!(
            codec.decode(short_key.did()),
            Err(DidError::KeyLengthMismatch { got: 31, .. })
        ));
    }

    #[test]
    fn codec_uses_configured_dilithium_tag() {
        let codec = IdentifierCodec::with_dilithium2_tag([0x90, 0x24]).unwrap();
        assert_eq!(codec.tag_for(Algorithm::Dilithium2), [0x90, 0x24]);
        assert_eq!(codec.algorithm_for([0x90, 0x24]), Some(Algorithm::Dilithium2));
        assert_eq!(codec.algorithm_for(DILITHIUM2_EXPERIMENTAL_MULTICODEC), None);
    }

    #[test]
    fn codec_rejects_ed25519_tag_for_dilithium2() {
        let err = IdentifierCodec::with_dilithium2_tag(ED25519_MULTICODEC).unwrap_err();
        assert!(matches!(err, DidError::TagCollision([0xed, 0x01])));
        assert!(err.to_string().contains("ed01"));

        let config = SeedKeyConfig {
            dilithium2_tag: ED25519_MULTICODEC,
            ..SeedKeyConfig::default()
        };
        assert!(IdentifierCodec::from_config(&config).is_err());
        assert!(IdentifierCodec::from_config(&SeedKeyConfig::default()).is_ok());
    }

    #[test]
    fn did_document_has_required_fields() {
        let did = IdentifierCodec::default().encode_keypair(&ed_kp(1));
        let doc = did.to_did_document(Algorithm::Ed25519);

        assert!(doc.context.contains(&DID_CONTEXT.to_string()));
        assert!(doc.context.contains(&ED25519_CONTEXT.to_string()));
        assert_eq!(doc.id, GOLDEN_DID);
        assert_eq!(doc.verification_method.len(), 1);
        assert_eq!(doc.authentication, vec![did.verification_method_id().to_string()]);
        assert_eq!(doc.assertion_method.len(), 1);
        assert!(doc.validate().is_ok());
    }

    #[test]
    fn verification_method_structure() {
        let did = IdentifierCodec::default().encode_keypair(&ed_kp(2));
        let doc = did.to_did_document(Algorithm::Ed25519);
        let vm = &doc.verification_method[0];
        assert_eq!(vm.id, did.verification_method_id());
        assert_eq!(vm.type_, ED25519_VERIFICATION_KEY_TYPE);
        assert_eq!(vm.controller, did.did());
        assert_eq!(vm.public_key_multibase, did.multibase());
    }

    #[test]
    fn dilithium_document_uses_multikey() {
        let codec = IdentifierCodec::default();
        let dil = KeyPair::derive(&[3u8; 32], Algorithm::Dilithium2).unwrap();
        let did = codec.encode_keypair(&dil);
        let doc = codec.resolve_document(did.did()).unwrap();
        assert_eq!(doc.verification_method[0].type_, MULTIKEY_TYPE);
        assert!(doc.context.contains(&MULTIKEY_CONTEXT.to_string()));
        assert!(doc.validate().is_ok());
    }

    #[test]
    fn did_document_json_roundtrip() {
        let doc = IdentifierCodec::default()
            .resolve_document(GOLDEN_DID)
            .unwrap();
        let json = doc.to_json().unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(parsed.get("@context").is_some());
        assert!(parsed.get("verificationMethod").is_some());
        assert!(parsed["verificationMethod"][0].get("publicKeyMultibase").is_some());

        let back = DidDocument::from_json(&json).unwrap();
        assert_eq!(back.id, GOLDEN_DID);
    }

    #[test]
    fn invalid_document_rejected() {
        let doc = DidDocument {
            context: vec![],
            id: "not-a-did".to_string(),
            verification_method: vec![],
            authentication: vec![],
            assertion_method: vec![],
            created: Utc::now(),
        };
        assert!(doc.validate().is_err());
    }

    #[test]
    fn dangling_reference_rejected() {
        let mut doc = IdentifierCodec::default()
            .resolve_document(GOLDEN_DID)
            .unwrap();
        doc.authentication = vec![format!("{}#other", GOLDEN_DID)];
        assert!(doc.validate().is_err());
    }

    #[test]
    fn did_key_serializes_camel_case() {
        let did = encode(&[5u8; 32], ED25519_MULTICODEC);
        let json = serde_json::to_value(&did).unwrap();
        assert_eq!(json["did"], did.did());
        assert_eq!(json["verificationMethodId"], did.verification_method_id());
    }
}
