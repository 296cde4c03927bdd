//! # Key Derivation
//!
//! Turns a 32-byte seed into a keypair, for one of two algorithms:
//!
//! - **Ed25519**: the seed *is* the private key. The public key comes from
//!   the standard RFC 8032 derivation (SHA-512, clamp, base-point multiply),
//!   courtesy of ed25519-dalek. Fully deterministic, nothing to see here.
//!
//! - **Dilithium2**: the native generator takes no seed; it pulls entropy
//!   from the ambient provider. To derive deterministically we build a
//!   SHAKE256 stream from the seed (domain `"DILITHIUM2-RNG"`), swap it in
//!   as the ambient provider for exactly one generator call, and restore
//!   the OS provider on the way out (RAII, so also on panic). The result is
//!   then size-checked: 1312-byte public key, 2528-byte secret key.
//!
//! That Dilithium2 trick is a workaround, not a standard. The keypair is
//! reproducible from the seed *with this implementation*; nothing in any
//! Dilithium/ML-DSA specification promises another implementation will
//! agree.
//!
//! ## Security considerations
//!
//! - Private key bytes are zeroized on drop.
//! - Key bytes are never logged and never appear in `Debug` output.

use ed25519_dalek::SigningKey;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use zeroize::Zeroizing;

use crate::config::{
    DILITHIUM2_PRIVATE_KEY_LENGTH, DILITHIUM2_PUBLIC_KEY_LENGTH, DILITHIUM2_RNG_DOMAIN,
    DILITHIUM2_SIGNATURE_LENGTH, ED25519_PRIVATE_KEY_LENGTH, ED25519_PUBLIC_KEY_LENGTH,
    ED25519_SIGNATURE_LENGTH, SEED_LENGTH,
};
use crate::crypto::ambient;
use crate::crypto::dilithium;
use crate::crypto::kdf::{DeterministicRandomSource, KdfError};
use crate::error::ErrorKind;

/// Errors that can occur during key derivation.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("seed must be exactly 32 bytes, got {got}")]
    InvalidSeedLength { got: usize },

    #[error("{algorithm} {which} key must be {expected} bytes, got {got}")]
    InvalidKeySize {
        algorithm: Algorithm,
        which: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("keypair validation failed: public key does not match private key")]
    KeypairMismatch,

    #[error("{algorithm} primitive failure: {reason}")]
    Primitive {
        algorithm: Algorithm,
        reason: String,
    },

    #[error("unknown algorithm '{0}'")]
    UnknownAlgorithm(String),
}

impl KeyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            KeyError::InvalidSeedLength { .. } | KeyError::UnknownAlgorithm(_) => {
                ErrorKind::InvalidInputLength
            }
            KeyError::InvalidKeySize { .. } | KeyError::KeypairMismatch => {
                ErrorKind::InvalidKeySize
            }
            KeyError::Primitive { .. } => ErrorKind::UnderlyingPrimitiveFailure,
        }
    }
}

impl From<KdfError> for KeyError {
    fn from(err: KdfError) -> Self {
        match err {
            KdfError::InvalidSeedLength { got } => KeyError::InvalidSeedLength { got },
        }
    }
}

// ---------------------------------------------------------------------------
// Algorithm
// ---------------------------------------------------------------------------

/// Signature algorithms a seed can be turned into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Algorithm {
    Ed25519,
    Dilithium2,
}

impl Algorithm {
    pub const ALL: [Algorithm; 2] = [Algorithm::Ed25519, Algorithm::Dilithium2];

    /// Static facts about the algorithm.
    pub fn info(&self) -> AlgorithmInfo {
        match self {
            Algorithm::Ed25519 => AlgorithmInfo {
                algorithm: *self,
                name: "Ed25519",
                public_key_len: ED25519_PUBLIC_KEY_LENGTH,
                private_key_len: ED25519_PRIVATE_KEY_LENGTH,
                signature_len: ED25519_SIGNATURE_LENGTH,
                security_level: "~128-bit classical",
                quantum_resistant: false,
                deterministic_signatures: true,
                experimental: false,
            },
            Algorithm::Dilithium2 => AlgorithmInfo {
                algorithm: *self,
                name: "CRYSTALS-Dilithium2 (ML-DSA-44 family)",
                public_key_len: DILITHIUM2_PUBLIC_KEY_LENGTH,
                private_key_len: DILITHIUM2_PRIVATE_KEY_LENGTH,
                signature_len: DILITHIUM2_SIGNATURE_LENGTH,
                security_level: "NIST level 2",
                quantum_resistant: true,
                deterministic_signatures: false,
                experimental: true,
            },
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Algorithm::Ed25519 => f.write_str("Ed25519"),
            Algorithm::Dilithium2 => f.write_str("Dilithium2"),
        }
    }
}

impl FromStr for Algorithm {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ed25519" => Ok(Algorithm::Ed25519),
            "dilithium2" | "ml-dsa-44" | "mldsa44" => Ok(Algorithm::Dilithium2),
            other => Err(KeyError::UnknownAlgorithm(other.to_string())),
        }
    }
}

/// Descriptive parameters for an [`Algorithm`].
///
/// `deterministic_signatures` is `false` for Dilithium2. That reads as "not
/// guaranteed deterministic", not "randomized": the bundled backend signs
/// deterministically today, but callers must not assume two signatures over
/// the same message compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlgorithmInfo {
    pub algorithm: Algorithm,
    pub name: &'static str,
    pub public_key_len: usize,
    pub private_key_len: usize,
    pub signature_len: usize,
    pub security_level: &'static str,
    pub quantum_resistant: bool,
    pub deterministic_signatures: bool,
    pub experimental: bool,
}

// ---------------------------------------------------------------------------
// KeyPair
// ---------------------------------------------------------------------------

/// A derived keypair.
///
/// `KeyPair` intentionally does NOT implement `Serialize`. Exporting private
/// keys goes through [`crate::identity::IdentityRecord`], deliberately.
///
/// # Examples
///
/// ```
/// use seedkey_core::crypto::keys::{Algorithm, KeyPair};
///
/// let seed = [1u8; 32];
/// let kp = KeyPair::derive(&seed, Algorithm::Ed25519).unwrap();
/// assert_eq!(kp.private_key(), &seed);
/// assert_eq!(kp.public_key().len(), 32);
/// ```
pub struct KeyPair {
    algorithm: Algorithm,
    public_key: Vec<u8>,
    private_key: Zeroizing<Vec<u8>>,
}

impl KeyPair {
    /// Derive a keypair from a 32-byte seed.
    pub fn derive(seed: &[u8], algorithm: Algorithm) -> Result<Self, KeyError> {
        match algorithm {
            Algorithm::Ed25519 => derive_ed25519(seed),
            Algorithm::Dilithium2 => derive_dilithium2(seed),
        }
    }

    /// Derive from a fresh ambient-random seed.
    pub fn generate(algorithm: Algorithm) -> Result<Self, KeyError> {
        let mut seed = Zeroizing::new([0u8; SEED_LENGTH]);
        ambient::fill_bytes(&mut seed[..]);
        Self::derive(&seed[..], algorithm)
    }

    /// Rebuild a keypair from stored key bytes, validating sizes.
    ///
    /// For Ed25519 the public key is re-derived from the private key and
    /// must match; a mismatch is [`KeyError::KeypairMismatch`].
    pub fn from_parts(
        algorithm: Algorithm,
        public_key: Vec<u8>,
        private_key: Vec<u8>,
    ) -> Result<Self, KeyError> {
        let private_key = Zeroizing::new(private_key);
        let info = algorithm.info();
        check_size(algorithm, "public", info.public_key_len, public_key.len())?;
        check_size(algorithm, "private", info.private_key_len, private_key.len())?;

        if algorithm == Algorithm::Ed25519 {
            let rederived = derive_ed25519(&private_key)?;
            if rederived.public_key != public_key {
                return Err(KeyError::KeypairMismatch);
            }
        }

        Ok(Self {
            algorithm,
            public_key,
            private_key,
        })
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    /// The private key bytes. Handle with care.
    pub fn private_key(&self) -> &[u8] {
        &self.private_key
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(&self.public_key)
    }

    pub fn private_key_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(self.private_key.as_slice()))
    }
}

impl Clone for KeyPair {
    /// Every clone of a private key is one more thing to protect.
    fn clone(&self) -> Self {
        Self {
            algorithm: self.algorithm,
            public_key: self.public_key.clone(),
            private_key: Zeroizing::new(self.private_key.to_vec()),
        }
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pk_hex = self.public_key_hex();
        let shown = &pk_hex[..pk_hex.len().min(16)];
        write!(f, "KeyPair({}, pub={}...)", self.algorithm, shown)
    }
}

impl PartialEq for KeyPair {
    /// Compared on public material only.
    fn eq(&self, other: &Self) -> bool {
        self.algorithm == other.algorithm && self.public_key == other.public_key
    }
}

impl Eq for KeyPair {}

fn check_size(
    algorithm: Algorithm,
    which: &'static str,
    expected: usize,
    got: usize,
) -> Result<(), KeyError> {
    if expected != got {
        return Err(KeyError::InvalidKeySize {
            algorithm,
            which,
            expected,
            got,
        });
    }
    Ok(())
}

fn seed_array(seed: &[u8]) -> Result<[u8; SEED_LENGTH], KeyError> {
    seed.try_into()
        .map_err(|_| KeyError::InvalidSeedLength { got: seed.len() })
}

// ---------------------------------------------------------------------------
// Derivation
// ---------------------------------------------------------------------------

/// Ed25519: `private = seed`, `public = [clamp(SHA-512(seed)[..32])]·B`.
pub fn derive_ed25519(seed: &[u8]) -> Result<KeyPair, KeyError> {
    let seed = Zeroizing::new(seed_array(seed)?);
    let signing_key = SigningKey::from_bytes(&seed);
    let public_key = signing_key.verifying_key().to_bytes().to_vec();
    tracing::debug!(algorithm = "Ed25519", "keypair derived from seed");
    Ok(KeyPair {
        algorithm: Algorithm::Ed25519,
        public_key,
        private_key: Zeroizing::new(seed.to_vec()),
    })
}

/// Dilithium2: native generator run under a deterministic ambient override.
pub fn derive_dilithium2(seed: &[u8]) -> Result<KeyPair, KeyError> {
    let seed = seed_array(seed)?;
    let backend = dilithium::backend().map_err(|reason| KeyError::Primitive {
        algorithm: Algorithm::Dilithium2,
        reason: reason.to_string(),
    })?;

    let source = DeterministicRandomSource::new(&seed, DILITHIUM2_RNG_DOMAIN)?;
    let ((public_key, private_key), intercepted) =
        ambient::with_override(source, || backend.generate_keypair());

    tracing::debug!(
        algorithm = "Dilithium2",
        rng_calls_intercepted = intercepted,
        public_key_len = public_key.len(),
        private_key_len = private_key.len(),
        "keypair derived under deterministic ambient override"
    );

    if !validate_dilithium_keypair(&public_key, &private_key) {
        tracing::warn!(
            public_key_len = public_key.len(),
            private_key_len = private_key.len(),
            "dilithium2 keypair failed size validation"
        );
        check_size(
            Algorithm::Dilithium2,
            "public",
            DILITHIUM2_PUBLIC_KEY_LENGTH,
            public_key.len(),
        )?;
        check_size(
            Algorithm::Dilithium2,
            "private",
            DILITHIUM2_PRIVATE_KEY_LENGTH,
            private_key.len(),
        )?;
    }

    Ok(KeyPair {
        algorithm: Algorithm::Dilithium2,
        public_key,
        private_key,
    })
}

/// Size check for a Dilithium2 keypair: 1312-byte public, 2528-byte private.
pub fn validate_dilithium_keypair(public_key: &[u8], private_key: &[u8]) -> bool {
    public_key.len() == DILITHIUM2_PUBLIC_KEY_LENGTH
        && private_key.len() == DILITHIUM2_PRIVATE_KEY_LENGTH
}
