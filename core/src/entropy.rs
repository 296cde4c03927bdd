//! # Entropy Analysis
//!
//! Scores how "random-looking" a byte buffer is. This is a teaching aid, not
//! a randomness test suite: a perfectly uniform counter passes with flying
//! colors, and 32 bytes are far too few for a meaningful statistical verdict.
//! It's still useful for showing why an all-zero seed is a terrible seed.
//!
//! Three numbers come out:
//!
//! - **Shannon entropy** over the 256-bin byte histogram, in bits (0–8).
//!   For `n` bytes it can never exceed `log2(n)`, so a 32-byte seed tops out
//!   at 5 bits even when every byte is distinct.
//! - **Uniformity**: a chi-square statistic against the flat expectation
//!   `n/256`, normalized as `100·(1 − χ²/(255·n))` and clamped at 0.
//!   `255·n` is the statistic for a buffer holding a single repeated value.
//! - **Quality score**: the rounded mean of entropy (as a percentage of 8
//!   bits) and uniformity, with a qualitative [`QualityLabel`].

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::error::ErrorKind;

/// Errors from entropy analysis. There is exactly one way to fail.
#[derive(Debug, Error)]
pub enum EntropyError {
    #[error("cannot analyze an empty buffer")]
    EmptyInput,
}

impl EntropyError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidInputLength
    }
}

/// Qualitative bucket for a quality score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QualityLabel {
    Excellent,
    Good,
    Acceptable,
    Low,
}

impl QualityLabel {
    /// Thresholds: 90 / 75 / 60.
    pub fn from_score(score: u8) -> Self {
        match score {
            90..=u8::MAX => QualityLabel::Excellent,
            75..=89 => QualityLabel::Good,
            60..=74 => QualityLabel::Acceptable,
            _ => QualityLabel::Low,
        }
    }
}

impl fmt::Display for QualityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            QualityLabel::Excellent => "Excellent",
            QualityLabel::Good => "Good",
            QualityLabel::Acceptable => "Acceptable",
            QualityLabel::Low => "Low",
        };
        f.write_str(s)
    }
}

/// Read-only summary of a byte buffer's statistical quality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntropyReport {
    /// Number of bytes analyzed.
    pub sample_len: usize,
    /// Shannon entropy in bits per byte, `0.0..=8.0`.
    pub shannon_entropy: f64,
    /// Raw chi-square statistic against the uniform expectation.
    pub chi_square: f64,
    /// Uniformity score, `0.0..=100.0`.
    pub uniformity: f64,
    /// Composite score, `0..=100`.
    pub quality_score: u8,
    /// Bucketed label for `quality_score`.
    pub label: QualityLabel,
}

/// Analyze a non-empty byte buffer.
///
/// # Example
///
/// ```
/// use seedkey_core::entropy::{analyze, QualityLabel};
///
/// let report = analyze(&[0u8; 32]).unwrap();
/// assert_eq!(report.label, QualityLabel::Low);
/// ```
pub fn analyze(bytes: &[u8]) -> Result<EntropyReport, EntropyError> {
    if bytes.is_empty() {
        return Err(EntropyError::EmptyInput);
    }

    let histogram = histogram(bytes);
    let n = bytes.len() as f64;

    let shannon_entropy = shannon(&histogram, n);
    let chi_square = chi_square(&histogram, n);

    let max_chi_square = 255.0 * n;
    let uniformity = (100.0 * (1.0 - chi_square / max_chi_square)).clamp(0.0, 100.0);

    let raw_score = ((shannon_entropy / 8.0 * 100.0) + uniformity) / 2.0;
    let quality_score = raw_score.round().clamp(0.0, 100.0) as u8;

    Ok(EntropyReport {
        sample_len: bytes.len(),
        shannon_entropy,
        chi_square,
        uniformity,
        quality_score,
        label: QualityLabel::from_score(quality_score),
    })
}

fn histogram(bytes: &[u8]) -> [u64; 256] {
    let mut counts = [0u64; 256];
    for &b in bytes {
        counts[b as usize] += 1;
    }
    counts
}

fn shannon(histogram: &[u64; 256], n: f64) -> f64 {
    let entropy: f64 = histogram
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / n;
            -p * p.log2()
        })
        .sum();
    // -0.0 for single-valued input reads oddly in reports.
    entropy.max(0.0)
}

fn chi_square(histogram: &[u64; 256], n: f64) -> f64 {
    let expected = n / 256.0;
    histogram
        .iter()
        .map(|&c| {
            let diff = c as f64 - expected;
            diff * diff / expected
        })
        .sum()
}
