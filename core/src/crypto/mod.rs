//! # Cryptographic Primitives for SeedKey
//!
//! Everything between "here are 32 bytes" and "here is a signature":
//!
//! - **kdf**: SHAKE256 expansion and the deterministic random source built on it.
//! - **ambient**: the process-wide secure-random interface, and its scoped override.
//! - **keys**: Ed25519 and Dilithium2 key derivation from a seed.
//! - **dilithium**: adapter over the Dilithium2 implementation.
//! - **signatures**: sign, verify, self test.
//!
//! Nothing here is novel. Ed25519 comes from ed25519-dalek, Dilithium2 from
//! crystals-dilithium, SHAKE256 from sha3. The one non-standard move is the
//! ambient override that makes Dilithium2 key generation reproducible, and it
//! is fenced off in its own module so nobody mistakes it for a primitive.

pub mod ambient;
pub mod dilithium;
pub mod kdf;
pub mod keys;
pub mod signatures;

pub use kdf::{expand, DeterministicRandomSource};
pub use keys::{validate_dilithium_keypair, Algorithm, AlgorithmInfo, KeyPair};
pub use signatures::{self_test, sign, verify, SelfTestReport, Signature};
