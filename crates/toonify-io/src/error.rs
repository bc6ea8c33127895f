//! Errors surfaced by the I/O layer.

use image::error::{DecodingError, EncodingError, ImageFormatHint};
use image::{ImageError, ImageFormat};
use serde::{Deserialize, Serialize};
use toonify_pipeline::PipelineError;

use crate::upload::UploadError;

/// Everything that can go wrong between receiving bytes and returning a
/// PNG.
///
/// Uses custom `Serialize`/`Deserialize` because `image::ImageError`
/// does not implement serde traits. The `Decode` and `Encode` variants
/// are serialized as their `Display` strings.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// The upload was refused before decoding.
    #[error(transparent)]
    Upload(#[from] UploadError),

    /// The bytes could not be decoded as an image.
    #[error("failed to decode image: {0}")]
    Decode(#[source] ImageError),

    /// The result could not be encoded as PNG.
    #[error("failed to encode PNG: {0}")]
    Encode(#[source] ImageError),

    /// The stylization pipeline failed.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

/// Serde-compatible proxy for `ProcessError`.
///
/// A deserialized `Decode` or `Encode` carries a generic image error
/// holding the original message; the typed error cannot be rebuilt.
#[derive(Serialize, Deserialize)]
enum ProcessErrorProxy {
    Upload(UploadError),
    Decode(String),
    Encode(String),
    Pipeline(PipelineError),
}

impl Serialize for ProcessError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let proxy = match self {
            Self::Upload(e) => ProcessErrorProxy::Upload(e.clone()),
            Self::Decode(e) => ProcessErrorProxy::Decode(e.to_string()),
            Self::Encode(e) => ProcessErrorProxy::Encode(e.to_string()),
            Self::Pipeline(e) => ProcessErrorProxy::Pipeline(e.clone()),
        };
        proxy.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ProcessError {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let proxy = ProcessErrorProxy::deserialize(deserializer)?;
        Ok(match proxy {
            ProcessErrorProxy::Upload(e) => Self::Upload(e),
            ProcessErrorProxy::Decode(msg) => Self::Decode(ImageError::Decoding(
                DecodingError::new(ImageFormatHint::Unknown, msg),
            )),
            ProcessErrorProxy::Encode(msg) => Self::Encode(ImageError::Encoding(
                EncodingError::new(ImageFormatHint::Exact(ImageFormat::Png), msg),
            )),
            ProcessErrorProxy::Pipeline(e) => Self::Pipeline(e),
        })
    }
}

/// The `{"error": "..."}` body returned to clients when a request fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable failure message.
    pub error: String,
}

impl From<&ProcessError> for ErrorResponse {
    fn from(err: &ProcessError) -> Self {
        Self {
            error: err.to_string(),
        }
    }
}

impl ErrorResponse {
    /// Serialize to a JSON string.
    ///
    /// # Errors
    ///
    /// Returns a `serde_json::Error` if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
