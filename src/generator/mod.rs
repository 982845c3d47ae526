//! Remote image generation.
//!
//! The orchestrator only sees [`ImageGenerator`]: one opaque async call that
//! either yields an image or a [`GenerationError`]. No retries happen here.

pub mod gemini;

use async_trait::async_trait;
use productviz_common::ImagePayload;

use crate::errors::GenerationError;

pub use gemini::GeminiGenerator;

#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Produce a new image from `source` following `prompt`.
    async fn generate(
        &self,
        source: &ImagePayload,
        prompt: &str,
    ) -> Result<ImagePayload, GenerationError>;
}
