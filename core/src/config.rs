//! # Constants & Runtime Configuration
//!
//! Every magic number in SeedKey lives here: key and seed sizes, multicodec
//! tags, KDF domain labels, QRNG endpoint defaults. If you're hardcoding one
//! of these somewhere else, move it here.
//!
//! The runtime knobs (endpoint URL, timeout, the experimental Dilithium2 tag,
//! data directory) are grouped in [`SeedKeyConfig`], which the CLI fills in
//! from flags and `SEEDKEY_*` environment variables.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Seeds
// ---------------------------------------------------------------------------

/// Every seed is exactly 256 bits. No more, no less.
pub const SEED_LENGTH: usize = 32;

// ---------------------------------------------------------------------------
// Ed25519
// ---------------------------------------------------------------------------

/// Ed25519 secret key length. The 32-byte secret *is* the seed.
pub const ED25519_PRIVATE_KEY_LENGTH: usize = 32;

/// Ed25519 public (verifying) key length.
pub const ED25519_PUBLIC_KEY_LENGTH: usize = 32;

/// Ed25519 signature length.
pub const ED25519_SIGNATURE_LENGTH: usize = 64;

/// Registered multicodec prefix for `ed25519-pub` (varint 0xed).
pub const ED25519_MULTICODEC: [u8; 2] = [0xed, 0x01];

// ---------------------------------------------------------------------------
// Dilithium2
// ---------------------------------------------------------------------------

/// Dilithium2 public key length (NIST level 2 parameter set).
pub const DILITHIUM2_PUBLIC_KEY_LENGTH: usize = 1312;

/// Dilithium2 secret key length (round-3 encoding).
pub const DILITHIUM2_PRIVATE_KEY_LENGTH: usize = 2528;

/// Dilithium2 detached signature length.
pub const DILITHIUM2_SIGNATURE_LENGTH: usize = 2420;

/// Placeholder multicodec for Dilithium2 public keys. Not registered anywhere;
/// identifiers using it will not interoperate with other implementations.
pub const DILITHIUM2_EXPERIMENTAL_MULTICODEC: [u8; 2] = [0x12, 0x34];

/// Domain label for the deterministic RNG that feeds Dilithium2 keygen.
pub const DILITHIUM2_RNG_DOMAIN: &str = "DILITHIUM2-RNG";

// ---------------------------------------------------------------------------
// KDF
// ---------------------------------------------------------------------------

/// Initial pool size of a deterministic random source, in bytes.
pub const DETERMINISTIC_POOL_SIZE: usize = 4096;

/// Infix used to derive sub-labels when a deterministic pool grows.
pub const POOL_EXPANSION_INFIX: &str = "-EXPAND-";

// ---------------------------------------------------------------------------
// did:key
// ---------------------------------------------------------------------------

/// Every identifier starts with this, followed by a base58btc multibase.
pub const DID_KEY_PREFIX: &str = "did:key:";

/// Multibase prefix character for base58btc.
pub const MULTIBASE_BASE58BTC: char = 'z';

// ---------------------------------------------------------------------------
// QRNG
// ---------------------------------------------------------------------------

/// ANU Quantum Random Numbers JSON API, asking for 32 uint8 values.
pub const DEFAULT_QRNG_URL: &str = "https://qrng.anu.edu.au/API/jsonI.php?length=32&type=uint8";

/// Human-readable source name attached to locally synthesized metadata.
pub const DEFAULT_QRNG_SOURCE: &str = "ANU Quantum Random Number Generator";

/// Transport timeout for the QRNG fetch. The call is never retried.
pub const DEFAULT_QRNG_TIMEOUT: Duration = Duration::from_secs(10);

/// Largest QRNG response body we read. A well-formed one is well under 1 KiB.
pub const MAX_QRNG_BODY_BYTES: usize = 64 * 1024;

// ---------------------------------------------------------------------------
// Identity store
// ---------------------------------------------------------------------------

/// Version tag written into every export envelope.
pub const EXPORT_FORMAT_VERSION: &str = "1.0.0";

/// Default data directory for the identity store.
pub const DEFAULT_DATA_DIR: &str = ".seedkey";

// ---------------------------------------------------------------------------
// Runtime configuration
// ---------------------------------------------------------------------------

/// Runtime settings shared by the library and the CLI.
///
/// Everything has a sane default so `SeedKeyConfig::default()` works out of
/// the box against the public ANU endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SeedKeyConfig {
    /// URL of the QRNG endpoint (direct ANU API or a metadata-adding proxy).
    pub qrng_url: String,
    /// Transport timeout for the QRNG request, in seconds.
    pub qrng_timeout_secs: u64,
    /// Multicodec tag used for Dilithium2 identifiers.
    #[serde(with = "hex_tag")]
    pub dilithium2_tag: [u8; 2],
    /// Where the identity store lives.
    pub data_dir: PathBuf,
}

impl Default for SeedKeyConfig {
    fn default() -> Self {
        Self {
            qrng_url: DEFAULT_QRNG_URL.to_string(),
            qrng_timeout_secs: DEFAULT_QRNG_TIMEOUT.as_secs(),
            dilithium2_tag: DILITHIUM2_EXPERIMENTAL_MULTICODEC,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
        }
    }
}

impl SeedKeyConfig {
    /// QRNG timeout as a `Duration`.
    pub fn qrng_timeout(&self) -> Duration {
        Duration::from_secs(self.qrng_timeout_secs)
    }

    /// Parse a config from JSON. Missing fields fall back to defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Parses a 2-byte multicodec tag written as 4 hex digits (`"1234"`, `"0x1234"`).
pub fn parse_tag(s: &str) -> Option<[u8; 2]> {
    let digits = s.trim().trim_start_matches("0x").trim_start_matches("0X");
    let bytes = hex::decode(digits).ok()?;
    bytes.try_into().ok()
}

mod hex_tag {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(tag: &[u8; 2], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(tag))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<[u8; 2], D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_tag(&raw)
            .ok_or_else(|| de::Error::custom(format!("invalid multicodec tag '{}'", raw)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_size_constants() {
        assert_eq!(SEED_LENGTH, 32);
        assert_eq!(ED25519_PRIVATE_KEY_LENGTH, SEED_LENGTH);
        assert_eq!(ED25519_PUBLIC_KEY_LENGTH, 32);
        assert_eq!(DILITHIUM2_PUBLIC_KEY_LENGTH, 1312);
        assert_eq!(DILITHIUM2_PRIVATE_KEY_LENGTH, 2528);
    }

    #[test]
    fn test_multicodec_tags_are_distinct() {
        assert_ne!(ED25519_MULTICODEC, DILITHIUM2_EXPERIMENTAL_MULTICODEC);
    }

    #[test]
    fn test_parse_tag_variants() {
        assert_eq!(parse_tag("1234"), Some([0x12, 0x34]));
        assert_eq!(parse_tag("0xED01"), Some([0xed, 0x01]));
        assert_eq!(parse_tag("123"), None);
        assert_eq!(parse_tag("123456"), None);
        assert_eq!(parse_tag("zz00"), None);
    }

    #[test]
    fn test_config_defaults() {
        let cfg = SeedKeyConfig::default();
        assert_eq!(cfg.qrng_url, DEFAULT_QRNG_URL);
        assert_eq!(cfg.qrng_timeout(), DEFAULT_QRNG_TIMEOUT);
        assert_eq!(cfg.dilithium2_tag, DILITHIUM2_EXPERIMENTAL_MULTICODEC);
    }

    #[test]
    fn test_config_partial_json_uses_defaults() {
        let cfg = SeedKeyConfig::from_json(r#"{"dilithium2Tag": "abcd"}"#).unwrap();
        assert_eq!(cfg.dilithium2_tag, [0xab, 0xcd]);
        assert_eq!(cfg.qrng_url, DEFAULT_QRNG_URL);
    }

    #[test]
    fn test_config_rejects_bad_tag() {
        assert!(SeedKeyConfig::from_json(r#"{"dilithium2Tag": "nope"}"#).is_err());
    }

    #[test]
    fn test_config_json_roundtrip() {
        let cfg = SeedKeyConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(json.contains("\"dilithium2Tag\":\"1234\""));
        assert_eq!(SeedKeyConfig::from_json(&json).unwrap(), cfg);
    }
}
