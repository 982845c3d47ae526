use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// MIME type assumed when a generated image arrives without one.
pub const DEFAULT_MIME_TYPE: &str = "image/png";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PayloadError {
    #[error("Invalid data URL: {0}")]
    InvalidDataUrl(String),

    #[error("Payload is not valid base64: {0}")]
    InvalidBase64(String),
}

/// An encoded image: MIME type plus base64 text.
///
/// The generation core never looks inside `data`; only the remote generator
/// and the export command decode it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePayload {
    pub mime_type: String,
    pub data: String,
}

impl ImagePayload {
    pub fn new(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Encode raw image bytes.
    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self::new(mime_type, STANDARD.encode(bytes))
    }

    /// Parse `data:<mime>;base64,<data>`.
    pub fn from_data_url(url: &str) -> Result<Self, PayloadError> {
        let rest = url
            .strip_prefix("data:")
            .ok_or_else(|| PayloadError::InvalidDataUrl("missing 'data:' prefix".to_string()))?;
        let (header, data) = rest
            .split_once(',')
            .ok_or_else(|| PayloadError::InvalidDataUrl("missing ',' separator".to_string()))?;
        let mime_type = header.strip_suffix(";base64").ok_or_else(|| {
            PayloadError::InvalidDataUrl("only base64 data URLs are supported".to_string())
        })?;
        if mime_type.is_empty() {
            return Err(PayloadError::InvalidDataUrl("empty MIME type".to_string()));
        }
        if data.is_empty() {
            return Err(PayloadError::InvalidDataUrl("empty payload".to_string()));
        }
        Ok(Self::new(mime_type, data))
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }

    /// Decode the base64 text back into raw bytes.
    pub fn decode(&self) -> Result<Vec<u8>, PayloadError> {
        STANDARD
            .decode(self.data.as_bytes())
            .map_err(|e| PayloadError::InvalidBase64(e.to_string()))
    }

    /// Size of the encoded text in bytes.
    pub fn encoded_len(&self) -> usize {
        self.data.len()
    }

    /// File extension for the MIME type, used when exporting.
    pub fn extension(&self) -> &str {
        match self.mime_type.as_str() {
            "image/jpeg" | "image/jpg" => "jpg",
            "image/webp" => "webp",
            "image/gif" => "gif",
            _ => "png",
        }
    }
}
