//! # Dilithium2 Backend
//!
//! Thin adapter over `crystals-dilithium`'s level-2 parameter set (round-3
//! encoding: 1312-byte public keys, 2528-byte secret keys, 2420-byte
//! signatures).
//!
//! The native generator here behaves like the reference implementation: it
//! takes no seed and pulls its 32 bytes of key-generation randomness from
//! the ambient provider ([`crate::crypto::ambient`]). Deterministic
//! derivation is layered on top in [`crate::crypto::keys`] by overriding
//! that provider for the duration of one call.
//!
//! The backend is initialized lazily, once, behind a known-answer self-check.
//! If the check fails, every Dilithium2 call reports the cached failure and
//! the Ed25519 path carries on unaffected.
//!
//! **Experimental.** Dilithium2 keys and identifiers produced here are not
//! interoperable with FIPS 204 (ML-DSA-44) encodings.

use crystals_dilithium::dilithium2;
use std::panic;
use std::sync::OnceLock;
use zeroize::Zeroizing;

use crate::config::{
    DILITHIUM2_PRIVATE_KEY_LENGTH, DILITHIUM2_PUBLIC_KEY_LENGTH, DILITHIUM2_SIGNATURE_LENGTH,
};
use crate::crypto::ambient;

const KEYGEN_SEED_LENGTH: usize = 32;
const SELF_CHECK_MESSAGE: &[u8] = b"seedkey dilithium2 self-check";

/// Handle to an initialized, self-checked Dilithium2 implementation.
#[derive(Debug)]
pub struct Dilithium2Backend {
    _private: (),
}

static BACKEND: OnceLock<Result<Dilithium2Backend, String>> = OnceLock::new();

/// Get the process-wide backend, initializing it on first use.
///
/// The `Err` string describes why initialization failed; it is cached and
/// returned on every later call.
pub fn backend() -> Result<&'static Dilithium2Backend, &'static str> {
    BACKEND
        .get_or_init(Dilithium2Backend::initialize)
        .as_ref()
        .map_err(String::as_str)
}

impl Dilithium2Backend {
    fn initialize() -> Result<Self, String> {
        let backend = Self { _private: () };
        let seed = [0x5au8; KEYGEN_SEED_LENGTH];
        let (pk, sk) = backend.keypair_from_entropy(&seed);
        if pk.len() != DILITHIUM2_PUBLIC_KEY_LENGTH || sk.len() != DILITHIUM2_PRIVATE_KEY_LENGTH {
            return Err(format!(
                "self-check produced {}/{} byte keys",
                pk.len(),
                sk.len()
            ));
        }
        let sig = backend.sign(SELF_CHECK_MESSAGE, &sk)?;
        if !backend.verify(SELF_CHECK_MESSAGE, &sig, &pk) {
            return Err("self-check signature did not verify".into());
        }
        tracing::debug!("dilithium2 backend initialized");
        Ok(backend)
    }

    /// The native key generator: draws 32 bytes from the ambient provider.
    ///
    /// Returns `(public_key, secret_key)`.
    pub fn generate_keypair(&self) -> (Vec<u8>, Zeroizing<Vec<u8>>) {
        let mut entropy = Zeroizing::new([0u8; KEYGEN_SEED_LENGTH]);
        ambient::fill_bytes(&mut entropy[..]);
        self.keypair_from_entropy(&entropy[..])
    }

    fn keypair_from_entropy(&self, entropy: &[u8]) -> (Vec<u8>, Zeroizing<Vec<u8>>) {
        let kp = dilithium2::Keypair::generate(Some(entropy));
        let public = kp.public.to_bytes().to_vec();
        let secret = Zeroizing::new(kp.secret.to_bytes().to_vec());
        (public, secret)
    }

    /// Produce a detached signature.
    pub fn sign(&self, message: &[u8], secret_key: &[u8]) -> Result<Vec<u8>, String> {
        if secret_key.len() != DILITHIUM2_PRIVATE_KEY_LENGTH {
            return Err(format!(
                "dilithium2 secret key must be {} bytes, got {}",
                DILITHIUM2_PRIVATE_KEY_LENGTH,
                secret_key.len()
            ));
        }
        let sk = dilithium2::SecretKey::from_bytes(secret_key);
        Ok(sk.sign(message).to_vec())
    }

    /// Check a detached signature. Wrong-sized inputs are just `false`, and
    /// so is a panic inside the unpacking code on hostile bytes.
    pub fn verify(&self, message: &[u8], signature: &[u8], public_key: &[u8]) -> bool {
        if public_key.len() != DILITHIUM2_PUBLIC_KEY_LENGTH
            || signature.len() != DILITHIUM2_SIGNATURE_LENGTH
        {
            return false;
        }
        let mut sig = [0u8; DILITHIUM2_SIGNATURE_LENGTH];
        sig.copy_from_slice(signature);
        panic::catch_unwind(|| {
            let pk = dilithium2::PublicKey::from_bytes(public_key);
            pk.verify(message, &sig)
        })
        .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_initializes() {
        assert!(backend().is_ok());
    }

    #[test]
    fn native_keypair_sizes() {
        let b = backend().unwrap();
        let (pk, sk) = b.generate_keypair();
        assert_eq!(pk.len(), DILITHIUM2_PUBLIC_KEY_LENGTH);
        assert_eq!(sk.len(), DILITHIUM2_PRIVATE_KEY_LENGTH);
    }

    #[test]
    fn native_keypairs_differ_without_override() {
        let b = backend().unwrap();
        let (pk1, _) = b.generate_keypair();
        let (pk2, _) = b.generate_keypair();
        assert_ne!(pk1, pk2);
    }

    #[test]
    fn sign_verify_roundtrip() {
        let b = backend().unwrap();
        let (pk, sk) = b.generate_keypair();
        let sig = b.sign(b"hello", &sk).unwrap();
        assert_eq!(sig.len(), DILITHIUM2_SIGNATURE_LENGTH);
        assert!(b.verify(b"hello", &sig, &pk));
        assert!(!b.verify(b"hellO", &sig, &pk));
    }

    #[test]
    fn bundled_backend_signs_deterministically() {
        // Not part of the public contract; pins the current backend.
        let b = backend().unwrap();
        let (_, sk) = b.generate_keypair();
        assert_eq!(b.sign(b"m", &sk).unwrap(), b.sign(b"m", &sk).unwrap());
    }

    #[test]
    fn verify_rejects_wrong_sizes() {
        let b = backend().unwrap();
        let (pk, sk) = b.generate_keypair();
        let sig = b.sign(b"m", &sk).unwrap();
        assert!(!b.verify(b"m", &sig[..100], &pk));
        assert!(!b.verify(b"m", &sig, &pk[..32]));
        assert!(!b.verify(b"m", &[], &[]));
    }

    #[test]
    fn sign_rejects_wrong_key_size() {
        let b = backend().unwrap();
        assert!(b.sign(b"m", &[0u8; 32]).is_err());
    }
}
