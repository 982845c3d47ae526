//! Shared domain types for productviz.
//!
//! - [`Artifact`]: one generated image with its prompt, provenance and creation time
//! - [`ImagePayload`]: an encoded image blob with its MIME type (data-URL codec)
//! - [`GenerationRequest`]: a single, never-persisted request handed to the orchestrator

pub mod artifact;
pub mod payload;

pub use artifact::{Artifact, ArtifactKind, GenerationRequest};
pub use payload::{DEFAULT_MIME_TYPE, ImagePayload, PayloadError};
