//! The base source image that generations derive from.
//!
//! The orchestrator only reads the slot. It is written by `productviz source`
//! and persisted as a data URL in the store's settings table.

use std::path::Path;
use std::sync::RwLock;

use productviz_common::ImagePayload;

use crate::errors::{SourceError, StoreError};
use crate::store::SqliteArtifactStore;

/// Settings key holding the persisted source data URL.
pub const SOURCE_SETTING_KEY: &str = "source_image";

#[derive(Debug, Default)]
pub struct BaseSource {
    current: RwLock<Option<ImagePayload>>,
}

impl BaseSource {
    pub fn new(initial: Option<ImagePayload>) -> Self {
        Self {
            current: RwLock::new(initial),
        }
    }

    /// Restore the persisted source. An unreadable stored value is ignored.
    pub async fn load_from(store: &SqliteArtifactStore) -> Result<Self, StoreError> {
        let initial = match store.get_setting(SOURCE_SETTING_KEY).await? {
            Some(url) => match ImagePayload::from_data_url(&url) {
                Ok(payload) => Some(payload),
                Err(e) => {
                    tracing::warn!(error = %e, "ignoring unreadable stored source image");
                    None
                }
            },
            None => None,
        };
        Ok(Self::new(initial))
    }

    pub fn get(&self) -> Option<ImagePayload> {
        self.current.read().ok().and_then(|guard| guard.clone())
    }

    pub fn is_set(&self) -> bool {
        self.current.read().map(|g| g.is_some()).unwrap_or(false)
    }

    /// Replace the in-memory value only.
    pub fn set(&self, payload: Option<ImagePayload>) {
        if let Ok(mut guard) = self.current.write() {
            *guard = payload;
        }
    }

    /// Update memory and write through to the store.
    ///
    /// Returns whether the value was persisted. A failed write is logged and
    /// the in-memory value is kept, so the source still works this session.
    pub async fn set_persisted(&self, store: &SqliteArtifactStore, payload: ImagePayload) -> bool {
        let url = payload.to_data_url();
        self.set(Some(payload));
        match store.set_setting(SOURCE_SETTING_KEY, &url).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "failed to persist source image");
                false
            }
        }
    }

    pub async fn clear_persisted(&self, store: &SqliteArtifactStore) -> Result<(), StoreError> {
        store.delete_setting(SOURCE_SETTING_KEY).await?;
        self.set(None);
        Ok(())
    }
}

/// Read an image file into a payload, enforcing type and size limits.
pub async fn load_source_file(path: &Path, max_bytes: u64) -> Result<ImagePayload, SourceError> {
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    if mime.type_() != mime_guess::mime::IMAGE {
        return Err(SourceError::NotAnImage {
            mime_type: mime.essence_str().to_string(),
        });
    }

    let read_failed = |source| SourceError::ReadFailed {
        path: path.to_path_buf(),
        source,
    };

    let size = tokio::fs::metadata(path).await.map_err(read_failed)?.len();
    if size > max_bytes {
        return Err(SourceError::TooLarge {
            size,
            limit: max_bytes,
        });
    }

    let bytes = tokio::fs::read(path).await.map_err(read_failed)?;
    tracing::debug!(path = %path.display(), size, mime = %mime, "loaded source image");
    Ok(ImagePayload::from_bytes(mime.essence_str(), &bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_load_source_file_png() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logo.png");
        std::fs::write(&path, b"\x89PNG\r\n\x1a\nfake").unwrap();

        let payload = load_source_file(&path, 1024).await.unwrap();
        assert_eq!(payload.mime_type, "image/png");
        assert_eq!(payload.decode().unwrap(), b"\x89PNG\r\n\x1a\nfake");
    }

    #[tokio::test]
    async fn test_load_source_file_rejects_non_image() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "hello").unwrap();

        let err = load_source_file(&path, 1024).await.unwrap_err();
        assert!(matches!(err, SourceError::NotAnImage { .. }));
    }

    #[tokio::test]
    async fn test_load_source_file_rejects_large_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("big.jpg");
        std::fs::write(&path, vec![0u8; 64]).unwrap();

        let err = load_source_file(&path, 32).await.unwrap_err();
        assert!(matches!(err, SourceError::TooLarge { size: 64, limit: 32 }));
    }

    #[tokio::test]
    async fn test_load_source_file_missing() {
        let dir = tempdir().unwrap();
        let err = load_source_file(&dir.path().join("gone.png"), 1024)
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::ReadFailed { .. }));
    }

    #[tokio::test]
    async fn test_persisted_source_survives_reload() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("history.db");
        let payload = ImagePayload::from_bytes("image/webp", b"source");

        {
            let store = SqliteArtifactStore::open(&db_path, None).unwrap();
            let source = BaseSource::load_from(&store).await.unwrap();
            assert!(!source.is_set());
            assert!(source.set_persisted(&store, payload.clone()).await);
        }

        let store = SqliteArtifactStore::open(&db_path, None).unwrap();
        let source = BaseSource::load_from(&store).await.unwrap();
        assert_eq!(source.get(), Some(payload));

        source.clear_persisted(&store).await.unwrap();
        assert!(source.get().is_none());
        assert!(!BaseSource::load_from(&store).await.unwrap().is_set());
    }

    #[tokio::test]
    async fn test_corrupt_stored_source_is_ignored() {
        let store = SqliteArtifactStore::open_in_memory().unwrap();
        store.set_setting(SOURCE_SETTING_KEY, "garbage").await.unwrap();

        let source = BaseSource::load_from(&store).await.unwrap();
        assert!(source.get().is_none());
    }
}
