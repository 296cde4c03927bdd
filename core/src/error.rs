//! # Error Taxonomy
//!
//! Each module owns a precise `thiserror` enum. This module rolls them up
//! into a single [`Error`] for callers that drive the whole pipeline, and
//! classifies every failure into one coarse [`ErrorKind`] that a front end
//! can switch on without matching dozens of variants.
//!
//! Messages never contain key material. Lengths, tags and HTTP status codes
//! are fine; bytes are not.

use serde::Serialize;
use thiserror::Error;

use crate::crypto::kdf::KdfError;
use crate::crypto::keys::KeyError;
use crate::crypto::signatures::SigningError;
use crate::entropy::EntropyError;
use crate::identity::did::DidError;
use crate::seed::qrng::QrngError;
use crate::seed::SeedError;
use crate::storage::StoreError;

/// Coarse failure classes, stable across module refactors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    /// Seed not 32 bytes, empty message or key, empty sample.
    InvalidInputLength,
    /// Remote seed fetch unreachable, timed out, or non-2xx.
    TransportFailure,
    /// Remote response missing or misshaped `data`.
    MalformedRemoteData,
    /// Post-generation key size validation failed.
    InvalidKeySize,
    /// Wrapped error from a third-party cryptographic primitive.
    UnderlyingPrimitiveFailure,
    /// Identifier string malformed on decode.
    DecodeFormatError,
    /// Identity store I/O or (de)serialization failure.
    Storage,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::InvalidInputLength => "invalid-input-length",
            ErrorKind::TransportFailure => "transport-failure",
            ErrorKind::MalformedRemoteData => "malformed-remote-data",
            ErrorKind::InvalidKeySize => "invalid-key-size",
            ErrorKind::UnderlyingPrimitiveFailure => "underlying-primitive-failure",
            ErrorKind::DecodeFormatError => "decode-format-error",
            ErrorKind::Storage => "storage",
        };
        f.write_str(name)
    }
}

/// Any failure the SeedKey pipeline can surface.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Seed(#[from] SeedError),

    #[error(transparent)]
    Qrng(#[from] QrngError),

    #[error(transparent)]
    Entropy(#[from] EntropyError),

    #[error(transparent)]
    Kdf(#[from] KdfError),

    #[error(transparent)]
    Key(#[from] KeyError),

    #[error(transparent)]
    Did(#[from] DidError),

    #[error(transparent)]
    Signing(#[from] SigningError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Seed(e) => e.kind(),
            Error::Qrng(e) => e.kind(),
            Error::Entropy(e) => e.kind(),
            Error::Kdf(e) => e.kind(),
            Error::Key(e) => e.kind(),
            Error::Did(e) => e.kind(),
            Error::Signing(e) => e.kind(),
            Error::Store(e) => e.kind(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_passes_through_module_errors() {
        let err: Error = KdfError::InvalidSeedLength { got: 3 }.into();
        assert_eq!(err.kind(), ErrorKind::InvalidInputLength);

        let err: Error = QrngError::MalformedData("short".into()).into();
        assert_eq!(err.kind(), ErrorKind::MalformedRemoteData);

        let err: Error = DidError::InvalidFormat("nope".into()).into();
        assert_eq!(err.kind(), ErrorKind::DecodeFormatError);
    }

    #[test]
    fn display_is_transparent() {
        let err: Error = KdfError::InvalidSeedLength { got: 3 }.into();
        assert_eq!(
            err.to_string(),
            KdfError::InvalidSeedLength { got: 3 }.to_string()
        );
    }

    #[test]
    fn kind_display_is_kebab_case() {
        assert_eq!(ErrorKind::InvalidKeySize.to_string(), "invalid-key-size");
        assert_eq!(
            ErrorKind::UnderlyingPrimitiveFailure.to_string(),
            "underlying-primitive-failure"
        );
    }
}
