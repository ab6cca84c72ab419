use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::model::Forest;

/// Error type for forest persistence
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("could not read {path}: {source}")]
    ReadError { path: PathBuf, source: io::Error },
    #[error("could not write {path}: {source}")]
    WriteError { path: PathBuf, source: io::Error },
    #[error("stored tasks at {path} are corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("could not serialize tasks: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Whole-forest key-value persistence
pub trait Store {
    /// Load the forest saved under `key`; `Ok(None)` if nothing was saved
    fn load(&self, key: &str) -> Result<Option<Forest>, StoreError>;
    /// Replace whatever is saved under `key`
    fn save(&self, key: &str, forest: &Forest) -> Result<(), StoreError>;
}

/// Stores each key as `<dir>/<key>.json`
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        JsonFileStore { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    /// Move an unreadable file aside so the next save does not destroy it.
    /// Later loads then see no file at all, so one corruption leaves one backup.
    fn quarantine(&self, key: &str, path: &Path) {
        let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
        let backup = self.dir.join(format!("{}.corrupt-{}.json", key, stamp));
        match fs::rename(path, &backup) {
            Ok(()) => warn!(backup = %backup.display(), "moved the corrupt task file aside"),
            Err(e) => warn!(error = %e, "could not move the corrupt task file aside"),
        }
    }
}

impl Store for JsonFileStore {
    fn load(&self, key: &str) -> Result<Option<Forest>, StoreError> {
        let path = self.path_for(key);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::ReadError { path, source: e }),
        };
        match serde_json::from_str::<Forest>(&content) {
            Ok(forest) => Ok(Some(forest)),
            Err(e) => {
                self.quarantine(key, &path);
                Err(StoreError::Corrupt { path, source: e })
            }
        }
    }

    fn save(&self, key: &str, forest: &Forest) -> Result<(), StoreError> {
        let path = self.path_for(key);
        let content = serde_json::to_string_pretty(forest)?;
        fs::create_dir_all(&self.dir).map_err(|e| StoreError::WriteError {
            path: self.dir.clone(),
            source: e,
        })?;
        atomic_write(&path, content.as_bytes()).map_err(|e| StoreError::WriteError {
            path: path.clone(),
            source: e,
        })?;
        info!(path = %path.display(), tasks = forest.len(), "saved tasks");
        Ok(())
    }
}

/// In-process store, for embedding and tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Forest>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// What is currently saved under `key`
    pub fn get(&self, key: &str) -> Option<Forest> {
        self.entries.lock().ok()?.get(key).cloned()
    }
}

impl Store for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<Forest>, StoreError> {
        Ok(self.get(key))
    }

    fn save(&self, key: &str, forest: &Forest) -> Result<(), StoreError> {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), forest.clone());
        }
        Ok(())
    }
}

/// Write via a temp file in the same directory, then rename over `path`.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Task, TaskKind};
    use tempfile::TempDir;

    #[test]
    fn save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path());
        let forest = Forest::sample();

        store.save("tasks", &forest).unwrap();
        assert!(dir.path().join("tasks.json").exists());
        let loaded = store.load("tasks").unwrap().unwrap();
        assert_eq!(loaded, forest);
    }

    #[test]
    fn load_missing_returns_none() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path());
        assert!(store.load("tasks").unwrap().is_none());
    }

    #[test]
    fn save_creates_directory() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested").join("data"));
        store
            .save("tasks", &Forest::new(vec![Task::with_id("a", "A", TaskKind::Todo)]))
            .unwrap();
        assert_eq!(store.load("tasks").unwrap().unwrap().len(), 1);
    }

    fn backups(dir: &Path) -> Vec<PathBuf> {
        fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with("tasks.corrupt-"))
            .map(|e| e.path())
            .collect()
    }

    #[test]
    fn corrupt_file_is_reported_and_kept() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("tasks.json"), "not json {{{").unwrap();
        let store = JsonFileStore::new(dir.path());

        let result = store.load("tasks");
        assert!(matches!(result, Err(StoreError::Corrupt { .. })));

        let kept = backups(dir.path());
        assert_eq!(kept.len(), 1);
        assert_eq!(fs::read_to_string(&kept[0]).unwrap(), "not json {{{");
    }

    #[test]
    fn repeated_loads_back_up_a_corrupt_file_once() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("tasks.json"), "not json {{{").unwrap();
        let store = JsonFileStore::new(dir.path());

        assert!(store.load("tasks").is_err());
        assert!(store.load("tasks").unwrap().is_none());
        assert!(store.load("tasks").unwrap().is_none());
        assert_eq!(backups(dir.path()).len(), 1);
        assert!(!dir.path().join("tasks.json").exists());
    }

    #[test]
    fn non_array_json_is_corrupt() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("tasks.json"), r#"{"id":"x"}"#).unwrap();
        let store = JsonFileStore::new(dir.path());
        assert!(store.load("tasks").is_err());
    }

    #[test]
    fn memory_store() {
        let store = MemoryStore::new();
        assert!(store.load("k").unwrap().is_none());
        store.save("k", &Forest::sample()).unwrap();
        assert_eq!(store.get("k").unwrap(), Forest::sample());
    }
}
