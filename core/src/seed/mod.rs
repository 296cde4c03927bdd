//! # Seeds
//!
//! A seed is 32 bytes and a note about where they came from. That's it.
//! Everything downstream (keys, identifiers, signatures) is a pure function
//! of those 32 bytes, which is exactly why they deserve care:
//!
//! - Bytes are zeroized when the seed is dropped.
//! - `Debug` prints provenance, never bytes.
//!
//! Two sources:
//!
//! - **Local PRNG**: the ambient secure-random provider (OS CSPRNG).
//!   Synchronous, can't fail.
//! - **Remote QRNG**: an HTTP fetch, see [`qrng`]. Async, can fail, and
//!   when it fails you get the error. No silent fallback.

pub mod qrng;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use zeroize::Zeroizing;

use crate::config::{SeedKeyConfig, SEED_LENGTH};
use crate::crypto::ambient;
use crate::error::ErrorKind;
use qrng::{HttpQrngClient, QrngClient, QrngError, QrngMetadata};

/// Errors constructing or obtaining a seed.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("seed must be exactly 32 bytes, got {got}")]
    InvalidLength { got: usize },

    #[error("seed is not valid hex: {0}")]
    InvalidHex(String),

    #[error("unknown seed source '{0}' (expected prng or qrng)")]
    UnknownSource(String),

    #[error("no QRNG client configured")]
    QrngUnavailable,

    #[error(transparent)]
    Qrng(#[from] QrngError),
}

impl SeedError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SeedError::InvalidLength { .. } => ErrorKind::InvalidInputLength,
            SeedError::InvalidHex(_) | SeedError::UnknownSource(_) => ErrorKind::DecodeFormatError,
            SeedError::QrngUnavailable => ErrorKind::TransportFailure,
            SeedError::Qrng(e) => e.kind(),
        }
    }
}

/// Where a seed's bytes came from.
///
/// Serialized as `"PRNG"` / `"QRNG"`, which is also the identity store's
/// `generationType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SeedProvenance {
    #[serde(rename = "PRNG")]
    LocalPrng,
    #[serde(rename = "QRNG")]
    RemoteQrng,
}

impl fmt::Display for SeedProvenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeedProvenance::LocalPrng => f.write_str("PRNG"),
            SeedProvenance::RemoteQrng => f.write_str("QRNG"),
        }
    }
}

impl FromStr for SeedProvenance {
    type Err = SeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "prng" | "local" => Ok(SeedProvenance::LocalPrng),
            "qrng" | "remote" | "quantum" => Ok(SeedProvenance::RemoteQrng),
            other => Err(SeedError::UnknownSource(other.to_string())),
        }
    }
}

/// 32 secret bytes with provenance.
#[derive(Clone)]
pub struct Seed {
    bytes: Zeroizing<[u8; SEED_LENGTH]>,
    provenance: SeedProvenance,
    metadata: Option<QrngMetadata>,
}

impl Seed {
    /// Fresh seed from the local CSPRNG.
    pub fn generate_local() -> Self {
        let mut bytes = Zeroizing::new([0u8; SEED_LENGTH]);
        ambient::fill_bytes(&mut bytes[..]);
        tracing::debug!(provenance = %SeedProvenance::LocalPrng, "seed generated");
        Self {
            bytes,
            provenance: SeedProvenance::LocalPrng,
            metadata: None,
        }
    }

    /// Wrap bytes that came back from a QRNG fetch.
    pub fn from_qrng(fetch: qrng::QrngFetch) -> Self {
        Self {
            bytes: Zeroizing::new(fetch.bytes),
            provenance: SeedProvenance::RemoteQrng,
            metadata: Some(fetch.metadata),
        }
    }

    pub fn from_bytes(bytes: [u8; SEED_LENGTH], provenance: SeedProvenance) -> Self {
        Self {
            bytes: Zeroizing::new(bytes),
            provenance,
            metadata: None,
        }
    }

    /// Copy a 32-byte slice into a seed. Anything else is `InvalidLength`.
    pub fn try_from_slice(bytes: &[u8], provenance: SeedProvenance) -> Result<Self, SeedError> {
        let array: [u8; SEED_LENGTH] = bytes
            .try_into()
            .map_err(|_| SeedError::InvalidLength { got: bytes.len() })?;
        Ok(Self::from_bytes(array, provenance))
    }

    /// Parse 64 hex digits (an optional `0x` prefix is tolerated).
    pub fn from_hex(hex_str: &str, provenance: SeedProvenance) -> Result<Self, SeedError> {
        let digits = hex_str.trim().trim_start_matches("0x");
        let bytes = Zeroizing::new(
            hex::decode(digits).map_err(|e| SeedError::InvalidHex(e.to_string()))?,
        );
        Self::try_from_slice(&bytes, provenance)
    }

    pub fn as_bytes(&self) -> &[u8; SEED_LENGTH] {
        &self.bytes
    }

    pub fn to_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(&self.bytes[..]))
    }

    pub fn provenance(&self) -> SeedProvenance {
        self.provenance
    }

    pub fn metadata(&self) -> Option<&QrngMetadata> {
        self.metadata.as_ref()
    }
}

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Seed")
            .field("provenance", &self.provenance)
            .field("has_metadata", &self.metadata.is_some())
            .finish_non_exhaustive()
    }
}

/// Hands out seeds of either provenance.
#[derive(Clone)]
pub struct SeedSource {
    qrng: Option<Arc<dyn QrngClient>>,
}

impl SeedSource {
    /// A source that can only produce local seeds.
    pub fn local_only() -> Self {
        Self { qrng: None }
    }

    pub fn with_qrng(client: Arc<dyn QrngClient>) -> Self {
        Self { qrng: Some(client) }
    }

    /// Source backed by an [`HttpQrngClient`] built from the config.
    pub fn from_config(config: &SeedKeyConfig) -> Result<Self, SeedError> {
        let client = HttpQrngClient::from_config(config)?;
        Ok(Self::with_qrng(Arc::new(client)))
    }

    /// Produce a seed of the requested provenance.
    ///
    /// # Errors
    ///
    /// Only the remote path can fail: transport errors, non-2xx statuses
    /// and malformed bodies are all reported, never papered over.
    pub async fn generate_seed(&self, kind: SeedProvenance) -> Result<Seed, SeedError> {
        match kind {
            SeedProvenance::LocalPrng => Ok(Seed::generate_local()),
            SeedProvenance::RemoteQrng => {
                let client = self.qrng.as_ref().ok_or(SeedError::QrngUnavailable)?;
                let fetch = client.fetch().await?;
                tracing::debug!(provenance = %SeedProvenance::RemoteQrng, "seed generated");
                Ok(Seed::from_qrng(fetch))
            }
        }
    }
}

impl fmt::Debug for SeedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeedSource")
            .field("qrng", &self.qrng.is_some())
            .finish()
    }
}
