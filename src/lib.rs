pub mod config;
pub mod errors;
pub mod generator;
pub mod history;
pub mod init;
pub mod logging;
pub mod orchestrator;
pub mod progress;
pub mod scenarios;
pub mod source;
pub mod store;
pub mod ui;

pub use productviz_common::{Artifact, ArtifactKind, ImagePayload};
