use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::Mutex;

use crate::model::Roadmap;

/// Fixed name of the durable entry holding the history list.
pub const HISTORY_KEY: &str = "roadmap-history-storage";
pub const HISTORY_LIMIT: usize = 10;

#[async_trait]
pub trait HistoryBackend: Send + Sync {
    async fn read(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>>;
    async fn write(&self, key: &str, bytes: &[u8]) -> anyhow::Result<()>;
}

/// Stores each key as `<base_dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct LocalFsBackend {
    base_dir: PathBuf,
}

impl LocalFsBackend {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.base_dir.join(format!("{key}.json"))
    }
}

#[async_trait]
impl HistoryBackend for LocalFsBackend {
    async fn read(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        let path = self.path_for(key);
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err).with_context(|| format!("read: {}", path.display())),
        }
    }

    async fn write(&self, key: &str, bytes: &[u8]) -> anyhow::Result<()> {
        write_atomic(&self.path_for(key), bytes).await
    }
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("path has no parent: {}", path.display()))?;
    fs::create_dir_all(parent)
        .await
        .with_context(|| format!("create parent dir: {}", parent.display()))?;

    let tmp_path = path.with_extension(format!("tmp.{}", uuid::Uuid::new_v4().simple()));
    fs::write(&tmp_path, bytes)
        .await
        .with_context(|| format!("write tmp: {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path)
        .await
        .with_context(|| format!("rename tmp to final: {}", path.display()))?;
    Ok(())
}

/// Keeps entries for the life of the process only.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryBackend for MemoryBackend {
    async fn read(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn write(&self, key: &str, bytes: &[u8]) -> anyhow::Result<()> {
        self.entries
            .lock()
            .await
            .insert(key.to_owned(), bytes.to_vec());
        Ok(())
    }
}

/// Backend whose writes always fail; reads see nothing stored.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct FailingBackend;

#[cfg(test)]
#[async_trait]
impl HistoryBackend for FailingBackend {
    async fn read(&self, _key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(None)
    }

    async fn write(&self, key: &str, _bytes: &[u8]) -> anyhow::Result<()> {
        anyhow::bail!("disk full while writing {key}")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("serialize history: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedHistory {
    history: Vec<Roadmap>,
}

/// Bounded, most-recent-first list of roadmaps, unique by case-insensitive topic.
pub struct HistoryStore {
    backend: Arc<dyn HistoryBackend>,
    entries: Vec<Roadmap>,
}

impl HistoryStore {
    /// Empty store; call [`HistoryStore::load`] to restore persisted entries.
    pub fn new(backend: Arc<dyn HistoryBackend>) -> Self {
        Self {
            backend,
            entries: Vec::new(),
        }
    }

    pub async fn open(backend: Arc<dyn HistoryBackend>) -> Self {
        let mut store = Self::new(backend);
        store.load().await;
        store
    }

    /// Replaces the in-memory list with the persisted one.
    ///
    /// An unreadable or corrupt payload leaves the store empty.
    pub async fn load(&mut self) {
        self.entries = match self.backend.read(HISTORY_KEY).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<PersistedHistory>(&bytes) {
                Ok(persisted) => normalize(persisted.history),
                Err(err) => {
                    tracing::warn!(
                        key = HISTORY_KEY,
                        error = %err,
                        "corrupt history; starting empty"
                    );
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(err) => {
                tracing::warn!(
                    key = HISTORY_KEY,
                    error = ?err,
                    "read history failed; starting empty"
                );
                Vec::new()
            }
        };
        tracing::debug!(entries = self.entries.len(), "history loaded");
    }

    pub async fn save(&self) -> Result<(), HistoryError> {
        let payload = PersistedHistory {
            history: self.entries.clone(),
        };
        let bytes = serde_json::to_vec_pretty(&payload)?;
        self.backend.write(HISTORY_KEY, &bytes).await?;
        Ok(())
    }

    pub fn entries(&self) -> &[Roadmap] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn find(&self, topic: &str) -> Option<&Roadmap> {
        self.entries.iter().find(|r| r.same_topic(topic))
    }

    pub async fn add_roadmap_to_history(&mut self, roadmap: Roadmap) -> Result<(), HistoryError> {
        self.insert(roadmap);
        self.save().await
    }

    pub async fn clear_history(&mut self) -> Result<(), HistoryError> {
        self.entries.clear();
        self.save().await
    }

    fn insert(&mut self, roadmap: Roadmap) {
        self.entries.retain(|r| !r.same_topic(&roadmap.topic));
        self.entries.insert(0, roadmap);
        self.entries.truncate(HISTORY_LIMIT);
    }
}

fn normalize(entries: Vec<Roadmap>) -> Vec<Roadmap> {
    let mut seen = HashSet::new();
    let mut out = entries
        .into_iter()
        .filter(|r| seen.insert(r.topic.to_lowercase()))
        .collect::<Vec<_>>();
    out.truncate(HISTORY_LIMIT);
    out
}
