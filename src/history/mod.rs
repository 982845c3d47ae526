//! Bounded, write-through history of generated artifacts.
//!
//! The cache keeps a newest-first copy of everything in the [`ArtifactStore`]
//! and enforces the maximum history size. Store writes happen before memory is
//! touched, so a failed write never leaves a phantom entry behind. Evictions
//! are the exception: the oldest entry leaves memory immediately and its store
//! delete runs in the background, where a failure is only logged. A pending
//! delete for an id is always awaited before that id is written again.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use productviz_common::Artifact;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::errors::StoreError;
use crate::store::ArtifactStore;

/// Outcome of [`HistoryCache::load`]. Loading never fails hard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadReport {
    /// History was read from the store; `count` artifacts are in memory.
    Loaded { count: usize, trimmed: usize },
    /// The store could not be read; the cache starts empty.
    Degraded(String),
}

impl LoadReport {
    pub fn is_degraded(&self) -> bool {
        matches!(self, LoadReport::Degraded(_))
    }
}

/// Result of a successful insert.
#[derive(Debug, Clone)]
pub struct InsertOutcome {
    /// Updated newest-first sequence.
    pub history: Vec<Artifact>,
    /// Id of the artifact dropped to stay within the size bound, if any.
    pub evicted: Option<String>,
}

pub struct HistoryCache {
    store: Arc<dyn ArtifactStore>,
    max_size: usize,
    /// Newest first. Held across store calls so insert/remove look atomic.
    entries: Mutex<Vec<Artifact>>,
    /// Background eviction deletes by artifact id.
    evictions: StdMutex<HashMap<String, JoinHandle<()>>>,
}

impl HistoryCache {
    /// A `max_size` of zero is treated as one.
    pub fn new(store: Arc<dyn ArtifactStore>, max_size: usize) -> Self {
        Self {
            store,
            max_size: max_size.max(1),
            entries: Mutex::new(Vec::new()),
            evictions: StdMutex::new(HashMap::new()),
        }
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Replace memory with the store's contents.
    ///
    /// Extras beyond `max_size` (left over from a larger limit) are dropped
    /// oldest-first with best-effort deletes.
    pub async fn load(&self) -> LoadReport {
        let mut entries = self.entries.lock().await;
        self.settle_evictions().await;
        match self.store.list_all().await {
            Ok(mut artifacts) => {
                artifacts.reverse();
                let mut trimmed = 0;
                while artifacts.len() > self.max_size {
                    if let Some(oldest) = artifacts.pop() {
                        self.spawn_eviction(oldest.id);
                        trimmed += 1;
                    }
                }
                if trimmed > 0 {
                    tracing::info!(trimmed, max_size = self.max_size, "trimmed history to size limit");
                }
                let count = artifacts.len();
                *entries = artifacts;
                tracing::debug!(count, "history loaded");
                LoadReport::Loaded { count, trimmed }
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to load history, starting empty");
                entries.clear();
                LoadReport::Degraded(e.to_string())
            }
        }
    }

    /// Persist `artifact` and prepend it, evicting the oldest entry when the
    /// bound is exceeded. On a store failure memory is untouched.
    ///
    /// Inserting an id already in memory changes nothing, matching the store,
    /// which keeps the original row and its position.
    pub async fn insert(&self, artifact: Artifact) -> Result<InsertOutcome, StoreError> {
        let mut entries = self.entries.lock().await;
        if entries.iter().any(|a| a.id == artifact.id) {
            tracing::debug!(artifact_id = %artifact.id, "artifact already in history");
            return Ok(InsertOutcome {
                history: entries.clone(),
                evicted: None,
            });
        }

        // An earlier eviction of this id must land before the row is rewritten.
        let pending = match self.evictions.lock() {
            Ok(mut handles) => handles.remove(&artifact.id),
            Err(_) => None,
        };
        if let Some(handle) = pending {
            join_eviction(&artifact.id, handle).await;
        }

        self.store.put(&artifact).await?;
        entries.insert(0, artifact);

        let mut evicted = None;
        if entries.len() > self.max_size
            && let Some(oldest) = entries.pop()
        {
            tracing::debug!(artifact_id = %oldest.id, "evicting oldest artifact");
            self.spawn_eviction(oldest.id.clone());
            evicted = Some(oldest.id);
        }

        Ok(InsertOutcome {
            history: entries.clone(),
            evicted,
        })
    }

    /// Delete from the store, then from memory. Unknown ids succeed.
    pub async fn remove(&self, id: &str) -> Result<bool, StoreError> {
        let mut entries = self.entries.lock().await;
        self.store.delete(id).await?;
        let before = entries.len();
        entries.retain(|a| a.id != id);
        Ok(entries.len() != before)
    }

    pub async fn snapshot(&self) -> Vec<Artifact> {
        self.entries.lock().await.clone()
    }

    pub async fn latest(&self) -> Option<Artifact> {
        self.entries.lock().await.first().cloned()
    }

    pub async fn get(&self, id: &str) -> Option<Artifact> {
        self.entries.lock().await.iter().find(|a| a.id == id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Wait for every background eviction delete issued so far.
    pub async fn settle_evictions(&self) {
        let pending: Vec<(String, JoinHandle<()>)> = match self.evictions.lock() {
            Ok(mut handles) => handles.drain().collect(),
            Err(_) => return,
        };
        for (id, handle) in pending {
            join_eviction(&id, handle).await;
        }
    }

    /// Fire-and-forget delete of a captured id. Never re-derives "oldest".
    fn spawn_eviction(&self, id: String) {
        let id_key = id.clone();
        let store = Arc::clone(&self.store);
        let handle = tokio::spawn(async move {
            if let Err(e) = store.delete(&id).await {
                tracing::warn!(artifact_id = %id, error = %e, "eviction delete failed");
            }
        });
        if let Ok(mut handles) = self.evictions.lock() {
            handles.retain(|_, h| !h.is_finished());
            handles.insert(id_key, handle);
        }
    }
}

async fn join_eviction(id: &str, handle: JoinHandle<()>) {
    if let Err(e) = handle.await {
        tracing::warn!(artifact_id = %id, error = %e, "eviction task did not complete");
    }
}
