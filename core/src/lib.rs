// Copyright (c) 2026 SeedKey Contributors. MIT License.
// See LICENSE for details.

//! # SeedKey: Core Library
//!
//! From 32 random bytes to a signed message and a `did:key` identifier,
//! one step at a time, with every step inspectable.
//!
//! ```text
//! seed (PRNG | QRNG) ──► entropy report
//!        │
//!        ▼
//! key derivation (Ed25519 | Dilithium2) ──► did:key ──► DID document
//!        │
//!        ▼
//! sign / verify / self test            identity store (sled)
//! ```
//!
//! ## Modules
//!
//! - **seed**: local and remote seed sources.
//! - **entropy**: Shannon entropy, chi-square uniformity, a quality score.
//! - **crypto**: SHAKE256 expansion, the ambient RNG override, key
//!   derivation, signatures.
//! - **identity**: `did:key` encoding, DID documents, storable records.
//! - **storage**: the sled-backed identity store, export and import.
//! - **encoding**: hex, base64 and bit-string views of bytes.
//! - **config**: constants and runtime settings.
//! - **error**: the error taxonomy.
//!
//! ## Ground Rules
//!
//! 1. Ed25519 is standard. Dilithium2 determinism is a workaround and is
//!    labelled experimental everywhere it surfaces.
//! 2. Remote failures surface as errors. Nothing silently falls back.
//! 3. Key material never appears in logs, `Debug` output or error messages.

pub mod config;
pub mod crypto;
pub mod encoding;
pub mod entropy;
pub mod error;
pub mod identity;
pub mod seed;
pub mod storage;

pub use crypto::keys::{Algorithm, KeyPair};
pub use error::{Error, ErrorKind, Result};
pub use identity::{DerivedIdentity, DidKey, IdentifierCodec, IdentityRecord};
pub use seed::{Seed, SeedProvenance, SeedSource};
pub use storage::IdentityStore;
