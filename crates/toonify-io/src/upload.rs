//! Upload constraints checked before any decoding work.

use image::ImageFormat;
use serde::{Deserialize, Serialize};

/// Largest accepted upload: 5 MiB.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Why an upload was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum UploadError {
    /// No bytes were supplied.
    #[error("no image data was uploaded")]
    Empty,

    /// The payload exceeds [`MAX_UPLOAD_BYTES`].
    #[error("upload of {size} bytes exceeds the {limit} byte limit")]
    TooLarge {
        /// Payload size in bytes.
        size: usize,
        /// The enforced limit.
        limit: usize,
    },

    /// The declared MIME type is not an image type.
    #[error("only image uploads are accepted, got {mime:?}")]
    NotAnImage {
        /// The declared MIME type.
        mime: String,
    },

    /// The bytes do not start with any known image signature.
    #[error("unrecognized image format")]
    UnrecognizedFormat,
}

/// Check an upload and sniff its format.
///
/// `mime` is the content type declared by the sender, if any. It must
/// start with `image/`; the bytes themselves must also carry a known
/// image signature.
///
/// # Errors
///
/// Returns the first [`UploadError`] that applies, in the order
/// empty, too large, not an image, unrecognized format.
pub fn validate_upload(bytes: &[u8], mime: Option<&str>) -> Result<ImageFormat, UploadError> {
    if bytes.is_empty() {
        return Err(UploadError::Empty);
    }
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(UploadError::TooLarge {
            size: bytes.len(),
            limit: MAX_UPLOAD_BYTES,
        });
    }
    if let Some(mime) = mime
        && !mime.trim().to_ascii_lowercase().starts_with("image/")
    {
        return Err(UploadError::NotAnImage {
            mime: mime.to_string(),
        });
    }
    image::guess_format(bytes).map_err(|_| UploadError::UnrecognizedFormat)
}
