//! # Quantum Random Number Fetch
//!
//! Fetches 32 bytes from a remote QRNG endpoint over HTTPS. Two endpoint
//! flavours are understood, told apart by the response body:
//!
//! - the ANU JSON API itself, `{"type":"uint8","length":32,"data":[...],"success":true}`;
//! - a proxy in front of it that adds a `metadata` object (verification id,
//!   timestamp, response time, SHA-256 of the upstream body, source name).
//!
//! Against the bare API we synthesize that metadata locally, so callers get
//! the same shape either way.
//!
//! Validation is strict. Missing `data`, anything that isn't an array of
//! exactly 32 integers in `0..=255`, or `success: false` is malformed. We
//! never pad, truncate, retry, or quietly fall back to local randomness: a
//! caller that asked for quantum bytes and got pseudo-random ones would have
//! no way to tell.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::config::{SeedKeyConfig, DEFAULT_QRNG_SOURCE, MAX_QRNG_BODY_BYTES, SEED_LENGTH};
use crate::error::ErrorKind;

/// Errors from the remote fetch.
#[derive(Debug, Error)]
pub enum QrngError {
    #[error("QRNG request failed: {0}")]
    Transport(String),

    #[error("QRNG endpoint returned HTTP {0}")]
    HttpStatus(u16),

    #[error("malformed QRNG response: {0}")]
    MalformedData(String),
}

impl QrngError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            QrngError::Transport(_) | QrngError::HttpStatus(_) => ErrorKind::TransportFailure,
            QrngError::MalformedData(_) => ErrorKind::MalformedRemoteData,
        }
    }
}

/// Provenance details for a remote seed. Pass-through only: nothing in the
/// pipeline checks these, they are kept so a user can audit where bytes
/// came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrngMetadata {
    pub verification_id: String,
    pub timestamp: String,
    /// Round-trip time of the upstream request, in milliseconds.
    pub response_time: u64,
    /// Lowercase hex SHA-256 of the upstream response body.
    pub response_hash: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

/// 32 validated bytes plus their provenance.
#[derive(Debug, Clone)]
pub struct QrngFetch {
    pub bytes: [u8; SEED_LENGTH],
    pub metadata: QrngMetadata,
}

/// Anything that can produce 32 remote random bytes.
///
/// The production implementation is [`HttpQrngClient`]; tests plug in
/// canned sources.
#[async_trait]
pub trait QrngClient: Send + Sync {
    async fn fetch(&self) -> Result<QrngFetch, QrngError>;
}

/// reqwest-backed client for the ANU API or a compatible proxy.
#[derive(Debug, Clone)]
pub struct HttpQrngClient {
    client: reqwest::Client,
    url: String,
}

impl HttpQrngClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, QrngError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| QrngError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn from_config(config: &SeedKeyConfig) -> Result<Self, QrngError> {
        Self::new(config.qrng_url.clone(), config.qrng_timeout())
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl QrngClient for HttpQrngClient {
    async fn fetch(&self) -> Result<QrngFetch, QrngError> {
        let started = Instant::now();
        let timestamp = chrono::Utc::now().to_rfc3339();
        tracing::debug!(url = %self.url, "requesting quantum random bytes");

        let response = self
            .client
            .get(&self.url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| QrngError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "QRNG endpoint returned an error status");
            return Err(QrngError::HttpStatus(status.as_u16()));
        }

        let body = read_capped_body(response).await?;
        let response_time = started.elapsed().as_millis() as u64;

        let parsed = parse_qrng_response(&body)?;
        let metadata = match parsed.metadata {
            Some(metadata) => metadata,
            None => QrngMetadata {
                verification_id: uuid::Uuid::new_v4().to_string(),
                timestamp,
                response_time,
                response_hash: hex::encode(Sha256::digest(body.as_bytes())),
                source: DEFAULT_QRNG_SOURCE.to_string(),
                endpoint: Some(self.url.clone()),
            },
        };

        tracing::debug!(
            verification_id = %metadata.verification_id,
            response_time_ms = response_time,
            "quantum random bytes received"
        );

        Ok(QrngFetch {
            bytes: parsed.bytes,
            metadata,
        })
    }
}

/// Read the response body, refusing anything over [`MAX_QRNG_BODY_BYTES`].
///
/// A declared `Content-Length` over the cap is rejected before reading;
/// otherwise chunks are accumulated until the cap is crossed.
async fn read_capped_body(mut response: reqwest::Response) -> Result<String, QrngError> {
    let too_large = || {
        QrngError::MalformedData(format!(
            "response body exceeds {} bytes",
            MAX_QRNG_BODY_BYTES
        ))
    };

    if let Some(len) = response.content_length() {
        if len > MAX_QRNG_BODY_BYTES as u64 {
            tracing::warn!(content_length = len, "QRNG response too large");
            return Err(too_large());
        }
    }

    let mut body = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| QrngError::Transport(e.to_string()))?
    {
        if body.len() + chunk.len() > MAX_QRNG_BODY_BYTES {
            tracing::warn!("QRNG response grew past the body limit");
            return Err(too_large());
        }
        body.extend_from_slice(&chunk);
    }

    String::from_utf8(body)
        .map_err(|e| QrngError::MalformedData(format!("response is not UTF-8: {}", e)))
}

/// Result of [`parse_qrng_response`]. `metadata` is `None` for the bare API.
#[derive(Debug, Clone)]
pub struct ParsedQrngResponse {
    pub bytes: [u8; SEED_LENGTH],
    pub metadata: Option<QrngMetadata>,
}

/// Validate a QRNG response body and pull out exactly 32 bytes.
pub fn parse_qrng_response(body: &str) -> Result<ParsedQrngResponse, QrngError> {
    let json: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| QrngError::MalformedData(format!("response is not JSON: {}", e)))?;

    if json.get("success").and_then(|v| v.as_bool()) == Some(false) {
        return Err(QrngError::MalformedData(
            "endpoint reported success: false".into(),
        ));
    }

    let data = json
        .get("data")
        .ok_or_else(|| QrngError::MalformedData("missing `data` field".into()))?
        .as_array()
        .ok_or_else(|| QrngError::MalformedData("`data` is not an array".into()))?;

    if data.len() != SEED_LENGTH {
        return Err(QrngError::MalformedData(format!(
            "expected {} values, got {}",
            SEED_LENGTH,
            data.len()
        )));
    }

    let mut bytes = [0u8; SEED_LENGTH];
    for (i, value) in data.iter().enumerate() {
        bytes[i] = value
            .as_u64()
            .and_then(|v| u8::try_from(v).ok())
            .ok_or_else(|| {
                QrngError::MalformedData(format!("`data[{}]` is not a byte: {}", i, value))
            })?;
    }

    // Metadata from a proxy is optional and advisory. If it doesn't parse,
    // treat the response as coming from the bare API.
    let metadata = match json.get("metadata") {
        Some(raw) => match serde_json::from_value::<QrngMetadata>(raw.clone()) {
            Ok(m) => Some(m),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unparseable QRNG metadata");
                None
            }
        },
        None => None,
    };

    Ok(ParsedQrngResponse { bytes, metadata })
}
