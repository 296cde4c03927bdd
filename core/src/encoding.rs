//! Byte-to-text encodings used when showing keys, seeds and signatures.
//!
//! Hex is lowercase, base64 is the standard alphabet with padding, and the
//! binary form is 8 bits per byte, space separated. All three decode back.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodingError {
    #[error("invalid hex: {0}")]
    Hex(String),

    #[error("invalid base64: {0}")]
    Base64(String),

    #[error("invalid bit string: {0}")]
    Bits(String),
}

pub fn to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Accepts upper or lower case and an optional `0x` prefix.
pub fn from_hex(s: &str) -> Result<Vec<u8>, EncodingError> {
    let digits = s.trim();
    let digits = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
        .unwrap_or(digits);
    hex::decode(digits).map_err(|e| EncodingError::Hex(e.to_string()))
}

pub fn to_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

pub fn from_base64(s: &str) -> Result<Vec<u8>, EncodingError> {
    STANDARD
        .decode(s.trim())
        .map_err(|e| EncodingError::Base64(e.to_string()))
}

/// `[0x05, 0xff]` -> `"00000101 11111111"`.
pub fn to_bits(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:08b}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Inverse of [`to_bits`]. Whitespace between groups is optional, but the
/// total number of bits must be a multiple of 8.
pub fn from_bits(s: &str) -> Result<Vec<u8>, EncodingError> {
    let bits: Vec<char> = s.chars().filter(|c| !c.is_whitespace()).collect();
    if bits.len() % 8 != 0 {
        return Err(EncodingError::Bits(format!(
            "{} bits is not a whole number of bytes",
            bits.len()
        )));
    }
    bits.chunks(8)
        .map(|chunk| {
            chunk.iter().try_fold(0u8, |acc, c| match c {
                '0' => Ok(acc << 1),
                '1' => Ok((acc << 1) | 1),
                other => Err(EncodingError::Bits(format!("unexpected character '{}'", other))),
            })
        })
        .collect()
}

/// Length-checked comparison that doesn't short-circuit on the first
/// differing byte.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_roundtrip_and_prefix() {
        assert_eq!(to_hex(&[0xde, 0xad, 0x01]), "dead01");
        assert_eq!(from_hex("0xDEAD01").unwrap(), vec![0xde, 0xad, 0x01]);
        assert!(matches!(from_hex("xyz"), Err(EncodingError::Hex(_))));
    }

    #[test]
    fn base64_standard_alphabet() {
        assert_eq!(to_base64(b"seedkey"), "c2VlZGtleQ==");
        assert_eq!(from_base64("c2VlZGtleQ==").unwrap(), b"seedkey");
        assert_eq!(to_base64(&[0xfb, 0xff]), "+/8=");
        assert!(from_base64("!!!").is_err());
    }

    #[test]
    fn bits_format() {
        assert_eq!(to_bits(&[0x05, 0xff]), "00000101 11111111");
        assert_eq!(from_bits("00000101 11111111").unwrap(), vec![0x05, 0xff]);
        assert_eq!(from_bits("0000010111111111").unwrap(), vec![0x05, 0xff]);
        assert!(from_bits("0101").is_err());
        assert!(from_bits("00000002").is_err());
        assert_eq!(to_bits(&[]), "");
    }

    #[test]
    fn constant_time_eq_behaves() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"ab"));
        assert!(constant_time_eq(b"", b""));
    }
}
