//! File-based storage adapter.
//!
//! Each key is stored as one YAML file under the base directory; the key's
//! `/`-separated segments become nested directories. A file holds an
//! envelope of the item's version and value.
//!
//! A batch is written in two phases: every item is staged to a temporary
//! file first, and the staged files are renamed into place only once all
//! of them were written. A failed staging write leaves the stored batch
//! untouched. The renames themselves are not atomic as a group, so a crash
//! between two renames can still leave a partial batch on disk.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parley_core::error::EngineError;
use parley_core::storage::{Storage, StoredItem};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, warn};

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    version: i64,
    value: Value,
}

fn io_error(path: &Path, e: &std::io::Error) -> EngineError {
    EngineError::Infrastructure(format!("{}: {e}", path.display()))
}

/// Versioned key-value store persisted as YAML files.
#[derive(Debug)]
pub struct FileStorage {
    base_path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStorage {
    /// Stores items under `base_path`, which is created on first save.
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Maps a key to its file. Empty, `.` and `..` segments are rejected so
    /// keys cannot escape the base directory.
    fn file_path(&self, key: &str) -> Result<PathBuf, EngineError> {
        let segments: Vec<&str> = key.split('/').collect();
        if segments
            .iter()
            .any(|segment| segment.is_empty() || *segment == "." || *segment == "..")
        {
            return Err(EngineError::Infrastructure(format!(
                "invalid storage key {key:?}"
            )));
        }
        let mut path = self.base_path.clone();
        if let Some((last, parents)) = segments.split_last() {
            path.extend(parents);
            path.push(format!("{last}.yaml"));
        }
        Ok(path)
    }

    async fn read_envelope(&self, key: &str) -> Result<Option<Envelope>, EngineError> {
        let path = self.file_path(key)?;
        if !fs::try_exists(&path).await.map_err(|e| io_error(&path, &e))? {
            return Ok(None);
        }
        let yaml = fs::read_to_string(&path)
            .await
            .map_err(|e| io_error(&path, &e))?;
        let envelope = serde_yaml::from_str(&yaml).map_err(|e| {
            EngineError::Serialization(format!("{}: {e}", path.display()))
        })?;
        Ok(Some(envelope))
    }

    /// Writes `envelope` next to its target file and returns the staged
    /// and final paths. Nothing is visible to `load` until the rename.
    async fn stage_envelope(
        &self,
        key: &str,
        envelope: &Envelope,
    ) -> Result<(PathBuf, PathBuf), EngineError> {
        let path = self.file_path(key)?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .await
                .map_err(|e| io_error(dir, &e))?;
        }
        let yaml = serde_yaml::to_string(envelope)
            .map_err(|e| EngineError::Serialization(format!("{}: {e}", path.display())))?;

        let staging = path.with_extension("yaml.tmp");
        fs::write(&staging, yaml)
            .await
            .map_err(|e| io_error(&staging, &e))?;
        Ok((staging, path))
    }

    async fn discard_staged(staged: &[(PathBuf, PathBuf)]) {
        for (staging, _) in staged {
            if let Err(e) = fs::remove_file(staging).await {
                warn!(path = %staging.display(), error = %e, "could not remove staged file");
            }
        }
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn load(&self, key: &str) -> Result<Option<StoredItem>, EngineError> {
        Ok(self.read_envelope(key).await?.map(|envelope| StoredItem {
            key: key.to_owned(),
            value: envelope.value,
            version: envelope.version,
        }))
    }

    async fn save(&self, items: &[StoredItem]) -> Result<(), EngineError> {
        let _guard = self.write_lock.lock().await;

        for item in items {
            let actual = self
                .read_envelope(&item.key)
                .await?
                .map_or(0, |envelope| envelope.version);
            if actual != item.version {
                return Err(EngineError::ConcurrencyConflict {
                    key: item.key.clone(),
                    expected: item.version,
                    actual,
                });
            }
        }

        let mut staged = Vec::with_capacity(items.len());
        for item in items {
            let envelope = Envelope {
                version: item.version + 1,
                value: item.value.clone(),
            };
            match self.stage_envelope(&item.key, &envelope).await {
                Ok(paths) => staged.push(paths),
                Err(e) => {
                    Self::discard_staged(&staged).await;
                    return Err(e);
                }
            }
        }

        for (staging, path) in &staged {
            fs::rename(staging, path)
                .await
                .map_err(|e| io_error(path, &e))?;
        }
        debug!(count = items.len(), base = %self.base_path.display(), "items saved");
        Ok(())
    }
}
