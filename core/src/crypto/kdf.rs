//! # Deterministic Byte Expansion
//!
//! SHAKE256 turns a 32-byte seed into as many bytes as you like. Absorb
//! `seed ‖ domain`, squeeze `len` bytes. Same inputs, same output, forever;
//! change any input and the output changes unpredictably.
//!
//! [`DeterministicRandomSource`] wraps this in a cursor so it can stand in
//! for a system RNG when a third-party key generator insists on pulling its
//! own randomness. It starts with a 4 KiB pool and grows on demand; every
//! growth step squeezes from a fresh sub-label (`<domain>-EXPAND-<offset>`),
//! so extending the pool never replays bytes already handed out.
//!
//! This is a KDF for *demonstration-grade* determinism. The seed is the only
//! secret; anyone holding it can replay every byte this module produces.

use rand_core::{CryptoRng, RngCore};
use sha3::digest::{ExtendableOutput, Update, XofReader};
use sha3::Shake256;
use thiserror::Error;
use zeroize::Zeroize;

use crate::config::{DETERMINISTIC_POOL_SIZE, POOL_EXPANSION_INFIX, SEED_LENGTH};
use crate::error::ErrorKind;

/// Errors from the byte expander.
#[derive(Debug, Error)]
pub enum KdfError {
    #[error("seed must be exactly 32 bytes, got {got}")]
    InvalidSeedLength { got: usize },
}

impl KdfError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidInputLength
    }
}

/// Expand a 32-byte seed to `output_len` bytes under a domain label.
///
/// # Example
///
/// ```
/// use seedkey_core::crypto::kdf::expand;
///
/// let seed = [7u8; 32];
/// let a = expand(&seed, 64, "X").unwrap();
/// let b = expand(&seed, 64, "Y").unwrap();
/// assert_eq!(a.len(), 64);
/// assert_ne!(a, b);
/// ```
pub fn expand(seed: &[u8], output_len: usize, domain: &str) -> Result<Vec<u8>, KdfError> {
    if seed.len() != SEED_LENGTH {
        return Err(KdfError::InvalidSeedLength { got: seed.len() });
    }
    let mut out = vec![0u8; output_len];
    squeeze_into(seed, domain, &mut out);
    Ok(out)
}

fn squeeze_into(seed: &[u8], domain: &str, out: &mut [u8]) {
    let mut hasher = Shake256::default();
    hasher.update(seed);
    hasher.update(domain.as_bytes());
    let mut reader = hasher.finalize_xof();
    reader.read(out);
}

/// A stateful, replayable byte stream derived from a seed.
///
/// Successive [`take`](Self::take) calls return non-overlapping slices of
/// the expanded stream. Two sources built from the same `(seed, domain)`
/// and asked the same sequence of lengths produce identical bytes.
pub struct DeterministicRandomSource {
    seed: [u8; SEED_LENGTH],
    domain: String,
    pool: Vec<u8>,
    offset: usize,
    calls: usize,
}

impl DeterministicRandomSource {
    /// Build a source over `expand(seed, 4096, domain)`.
    pub fn new(seed: &[u8], domain: &str) -> Result<Self, KdfError> {
        let pool = expand(seed, DETERMINISTIC_POOL_SIZE, domain)?;
        let mut owned = [0u8; SEED_LENGTH];
        owned.copy_from_slice(seed);
        Ok(Self {
            seed: owned,
            domain: domain.to_string(),
            pool,
            offset: 0,
            calls: 0,
        })
    }

    /// Return the next `n` bytes of the stream, advancing the cursor.
    pub fn take(&mut self, n: usize) -> Vec<u8> {
        let mut out = vec![0u8; n];
        self.fill(&mut out);
        out
    }

    /// Fill `out` with the next `out.len()` bytes of the stream.
    pub fn fill(&mut self, out: &mut [u8]) {
        let end = self.offset + out.len();
        if end > self.pool.len() {
            self.grow(end);
        }
        out.copy_from_slice(&self.pool[self.offset..end]);
        self.offset = end;
        self.calls += 1;
    }

    /// Bytes handed out so far.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Number of `take`/`fill` calls served.
    pub fn calls(&self) -> usize {
        self.calls
    }

    /// Current pool length (consumed + buffered).
    pub fn pool_len(&self) -> usize {
        self.pool.len()
    }

    // One growth step per shortfall: at least double the pool, and always
    // enough to cover `required`. The sub-label is keyed by the current
    // offset, which strictly increases between growth steps.
    fn grow(&mut self, required: usize) {
        let extension_len = (self.pool.len() * 2).max(required - self.pool.len());
        let label = format!("{}{}{}", self.domain, POOL_EXPANSION_INFIX, self.offset);
        let start = self.pool.len();
        self.pool.resize(start + extension_len, 0);
        squeeze_into(&self.seed, &label, &mut self.pool[start..]);
        tracing::trace!(
            domain = %self.domain,
            offset = self.offset,
            pool_len = self.pool.len(),
            "deterministic pool expanded"
        );
    }
}

impl RngCore for DeterministicRandomSource {
    fn next_u32(&mut self) -> u32 {
        rand_core::impls::next_u32_via_fill(self)
    }

    fn next_u64(&mut self) -> u64 {
        rand_core::impls::next_u64_via_fill(self)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.fill(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
        self.fill(dest);
        Ok(())
    }
}

impl CryptoRng for DeterministicRandomSource {}

impl Drop for DeterministicRandomSource {
    fn drop(&mut self) {
        self.seed.zeroize();
        self.pool.zeroize();
    }
}

impl std::fmt::Debug for DeterministicRandomSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeterministicRandomSource")
            .field("domain", &self.domain)
            .field("offset", &self.offset)
            .field("pool_len", &self.pool.len())
            .finish()
    }
}
