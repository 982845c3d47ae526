//! Typed error hierarchy for the generation core.
//!
//! Four enums cover the subsystems:
//! - `StoreError`: durable storage failures
//! - `GenerationError`: the remote operation did not yield an image
//! - `SourceError`: loading or decoding a source image
//! - `OrchestratorError`: everything `submit` can return, including validation

use productviz_common::PayloadError;
use thiserror::Error;

/// Errors from the artifact store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage capacity exceeded: {needed} bytes needed, {limit} bytes allowed")]
    CapacityExceeded { needed: u64, limit: u64 },

    #[error("Corrupt record for artifact {id}: {message}")]
    CorruptRecord { id: String, message: String },

    #[error("Database lock poisoned")]
    LockPoisoned,

    #[error("Storage task failed: {0}")]
    Task(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Errors from the remote image generation call.
///
/// Every non-success outcome collapses into one of these, each carrying a
/// readable message for the session's error detail.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Image generation request failed: {0}")]
    Transport(String),

    #[error("Image generation service returned {status}: {message}")]
    Service { status: u16, message: String },

    #[error("Malformed response from image generation service: {0}")]
    MalformedResponse(String),

    #[error("No image generated.")]
    NoImage,

    #[error("Image generation is not configured: {0}")]
    NotConfigured(String),
}

/// Errors from reading or decoding a source image.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Failed to read source image at {path}: {source}")]
    ReadFailed {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported source type '{mime_type}': only images are accepted")]
    NotAnImage { mime_type: String },

    #[error("Source image is {size} bytes, larger than the {limit} byte limit")]
    TooLarge { size: u64, limit: u64 },

    #[error(transparent)]
    Payload(#[from] PayloadError),
}

/// Errors from the generation orchestrator.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Prompt cannot be empty")]
    EmptyPrompt,

    #[error("No source image configured. Set one with 'productviz source set <file>'")]
    NoSourceConfigured,

    #[error("A generation is already in progress")]
    AlreadyRunning,

    #[error("Unknown scenario '{0}'")]
    UnknownScenario(String),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("Generated image could not be saved: {0}")]
    Storage(#[from] StoreError),
}

impl OrchestratorError {
    /// Validation failures are raised before any state change.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::EmptyPrompt
                | Self::NoSourceConfigured
                | Self::AlreadyRunning
                | Self::UnknownScenario(_)
        )
    }
}
