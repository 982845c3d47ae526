use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use productviz_common::{Artifact, ArtifactKind, ImagePayload};
use rusqlite::{Connection, OptionalExtension, params};

use super::ArtifactStore;
use crate::errors::StoreError;

/// Async-safe handle to the artifact database.
///
/// Wraps `ArtifactDb` behind `Arc<Mutex>` and runs all access on tokio's
/// blocking thread pool via `spawn_blocking`, keeping synchronous SQLite
/// I/O off the async worker threads.
#[derive(Clone)]
pub struct DbHandle {
    inner: Arc<std::sync::Mutex<ArtifactDb>>,
}

impl DbHandle {
    pub fn new(db: ArtifactDb) -> Self {
        Self {
            inner: Arc::new(std::sync::Mutex::new(db)),
        }
    }

    /// Run a closure with access to the database on a blocking thread.
    /// All data passed into `f` must be owned (`'static`).
    pub async fn call<F, R>(&self, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&ArtifactDb) -> Result<R, StoreError> + Send + 'static,
        R: Send + 'static,
    {
        let db = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let guard = db.lock().map_err(|_| StoreError::LockPoisoned)?;
            f(&guard)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

/// Synchronous SQLite access for artifacts and settings.
pub struct ArtifactDb {
    conn: Connection,
    /// Cumulative payload cap in bytes; `None` means unlimited.
    max_payload_bytes: Option<u64>,
}

impl ArtifactDb {
    /// Open (or create) a SQLite database at the given path and run migrations.
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Unavailable(format!(
                    "Failed to create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
        let conn = Connection::open(path)?;
        let db = Self {
            conn,
            max_payload_bytes: None,
        };
        db.init()?;
        Ok(db)
    }

    /// Create an in-memory SQLite database (for testing).
    pub fn new_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn,
            max_payload_bytes: None,
        };
        db.init()?;
        Ok(db)
    }

    /// Cap the cumulative stored payload size.
    pub fn with_max_payload_bytes(mut self, limit: Option<u64>) -> Self {
        self.max_payload_bytes = limit;
        self
    }

    fn init(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS artifacts (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                mime_type TEXT NOT NULL,
                data TEXT NOT NULL,
                prompt TEXT NOT NULL,
                kind TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_artifacts_created ON artifacts(created_at, seq);

            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            ",
        )?;
        Ok(())
    }

    // ── Artifacts ─────────────────────────────────────────────────────

    pub fn insert_artifact(&self, artifact: &Artifact) -> Result<(), StoreError> {
        if self.contains(&artifact.id)? {
            return Ok(());
        }

        if let Some(limit) = self.max_payload_bytes {
            let needed = self.total_payload_bytes()? + artifact.payload.encoded_len() as u64;
            if needed > limit {
                return Err(StoreError::CapacityExceeded { needed, limit });
            }
        }

        self.conn.execute(
            "INSERT INTO artifacts (id, mime_type, data, prompt, kind, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO NOTHING",
            params![
                artifact.id,
                artifact.payload.mime_type,
                artifact.payload.data,
                artifact.prompt,
                artifact.kind.as_str(),
                format_timestamp(&artifact.created_at),
            ],
        )?;
        Ok(())
    }

    pub fn delete_artifact(&self, id: &str) -> Result<bool, StoreError> {
        let affected = self
            .conn
            .execute("DELETE FROM artifacts WHERE id = ?1", params![id])?;
        Ok(affected > 0)
    }

    pub fn list_artifacts(&self) -> Result<Vec<Artifact>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, mime_type, data, prompt, kind, created_at
             FROM artifacts ORDER BY created_at ASC, seq ASC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(ArtifactRow {
                    id: row.get(0)?,
                    mime_type: row.get(1)?,
                    data: row.get(2)?,
                    prompt: row.get(3)?,
                    kind: row.get(4)?,
                    created_at: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(ArtifactRow::into_artifact).collect()
    }

    pub fn contains(&self, id: &str) -> Result<bool, StoreError> {
        let found = self
            .conn
            .query_row("SELECT 1 FROM artifacts WHERE id = ?1", params![id], |_| {
                Ok(())
            })
            .optional()?;
        Ok(found.is_some())
    }

    pub fn count(&self) -> Result<usize, StoreError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM artifacts", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn total_payload_bytes(&self) -> Result<u64, StoreError> {
        let total: i64 = self.conn.query_row(
            "SELECT COALESCE(SUM(LENGTH(data)), 0) FROM artifacts",
            [],
            |row| row.get(0),
        )?;
        Ok(total as u64)
    }

    // ── Settings ──────────────────────────────────────────────────────

    pub fn get_setting(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn set_setting(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn delete_setting(&self, key: &str) -> Result<(), StoreError> {
        self.conn
            .execute("DELETE FROM settings WHERE key = ?1", params![key])?;
        Ok(())
    }
}

/// Fixed-width RFC 3339 with nanoseconds, so text order matches time order
/// and timestamps survive a round-trip exactly.
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

// ── Internal row helpers ──────────────────────────────────────────────

struct ArtifactRow {
    id: String,
    mime_type: String,
    data: String,
    prompt: String,
    kind: String,
    created_at: String,
}

impl ArtifactRow {
    fn into_artifact(self) -> Result<Artifact, StoreError> {
        let kind = ArtifactKind::from_str(&self.kind).map_err(|message| {
            StoreError::CorruptRecord {
                id: self.id.clone(),
                message,
            }
        })?;
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|e| StoreError::CorruptRecord {
                id: self.id.clone(),
                message: format!("invalid created_at '{}': {}", self.created_at, e),
            })?
            .with_timezone(&Utc);

        Ok(Artifact {
            id: self.id,
            payload: ImagePayload::new(self.mime_type, self.data),
            prompt: self.prompt,
            kind,
            created_at,
        })
    }
}

// ── Async store ───────────────────────────────────────────────────────

/// [`ArtifactStore`] backed by SQLite.
#[derive(Clone)]
pub struct SqliteArtifactStore {
    db: DbHandle,
}

impl SqliteArtifactStore {
    pub fn new(db: ArtifactDb) -> Self {
        Self {
            db: DbHandle::new(db),
        }
    }

    /// Open the database at `path` with an optional payload cap.
    pub fn open(path: &Path, max_payload_bytes: Option<u64>) -> Result<Self, StoreError> {
        let db = ArtifactDb::new(path)?.with_max_payload_bytes(max_payload_bytes);
        Ok(Self::new(db))
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Ok(Self::new(ArtifactDb::new_in_memory()?))
    }

    pub async fn count(&self) -> Result<usize, StoreError> {
        self.db.call(|db| db.count()).await
    }

    pub async fn get_setting(&self, key: &str) -> Result<Option<String>, StoreError> {
        let key = key.to_string();
        self.db.call(move |db| db.get_setting(&key)).await
    }

    pub async fn set_setting(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let key = key.to_string();
        let value = value.to_string();
        self.db.call(move |db| db.set_setting(&key, &value)).await
    }

    pub async fn delete_setting(&self, key: &str) -> Result<(), StoreError> {
        let key = key.to_string();
        self.db.call(move |db| db.delete_setting(&key)).await
    }
}

#[async_trait]
impl ArtifactStore for SqliteArtifactStore {
    async fn put(&self, artifact: &Artifact) -> Result<(), StoreError> {
        let artifact = artifact.clone();
        self.db.call(move |db| db.insert_artifact(&artifact)).await
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let id = id.to_string();
        self.db
            .call(move |db| db.delete_artifact(&id).map(|_| ()))
            .await
    }

    async fn list_all(&self) -> Result<Vec<Artifact>, StoreError> {
        self.db.call(|db| db.list_artifacts()).await
    }
}

// ── Tests ─────────────────────────────────────────────────────────────
