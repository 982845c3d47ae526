//! Durable artifact storage.
//!
//! [`ArtifactStore`] is the seam between the history cache and whatever
//! persists artifacts. The production implementation is
//! [`SqliteArtifactStore`]; tests substitute in-memory doubles.

pub mod db;

use async_trait::async_trait;
use productviz_common::Artifact;

use crate::errors::StoreError;

pub use db::{ArtifactDb, DbHandle, SqliteArtifactStore};

/// Key-value persistence for artifacts, keyed by artifact id.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Persist an artifact. Retrying with an id that is already stored is a no-op.
    async fn put(&self, artifact: &Artifact) -> Result<(), StoreError>;

    /// Remove an artifact. Deleting an unknown id is not an error.
    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    /// All stored artifacts, oldest first (creation time, then insertion order).
    async fn list_all(&self) -> Result<Vec<Artifact>, StoreError>;
}
