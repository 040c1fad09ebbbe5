//! Persistence backends for the label cache.
//!
//! The whole [`LabelMap`] is loaded and saved as one document. There is no
//! per-key write and no locking: two processes sharing a store can lose
//! each other's additions (last full write wins).

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::warn;

use crate::types::LabelMap;
use crate::{HuginnError, Result};

/// Whole-document storage for cached labels.
pub trait LabelStore: Send + Sync {
    /// Load every cached entry. An absent store is an empty map.
    fn load_all(&self) -> Result<LabelMap>;

    /// Replace the stored document with `labels`.
    fn save_all(&self, labels: &LabelMap) -> Result<()>;
}

/// JSON document on the local filesystem.
///
/// Shape: `{ "<image reference>": [ {"Name": .., "Confidence": .., ..}, .. ] }`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn store_error(&self, message: impl Into<String>) -> HuginnError {
        HuginnError::CacheStore {
            path: self.path.clone(),
            message: message.into(),
        }
    }
}

impl LabelStore for JsonFileStore {
    /// Missing, empty and unreadable files load as an empty map; a file
    /// that reads but does not parse is an error.
    fn load_all(&self) -> Result<LabelMap> {
        let content = match std::fs::read(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(LabelMap::new()),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to read label cache, starting empty");
                return Ok(LabelMap::new());
            }
        };
        if content.iter().all(u8::is_ascii_whitespace) {
            return Ok(LabelMap::new());
        }
        serde_json::from_slice(&content)
            .map_err(|e| self.store_error(format!("corrupt label cache: {e}")))
    }

    /// Atomic write via tmp + rename.
    fn save_all(&self, labels: &LabelMap) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                self.store_error(format!("failed to create directory {}: {e}", parent.display()))
            })?;
        }

        let json = serde_json::to_vec(labels)?;
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, &json).map_err(|e| {
            self.store_error(format!("failed to write {}: {e}", tmp_path.display()))
        })?;
        std::fs::rename(&tmp_path, &self.path).map_err(|e| {
            self.store_error(format!("failed to rename {}: {e}", tmp_path.display()))
        })?;

        Ok(())
    }
}

/// In-memory store, mainly for tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    labels: Mutex<LabelMap>,
    saves: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing document.
    pub fn with_labels(labels: LabelMap) -> Self {
        Self {
            labels: Mutex::new(labels),
            saves: AtomicUsize::new(0),
        }
    }

    /// Copy of the current document.
    pub fn snapshot(&self) -> LabelMap {
        self.labels
            .lock()
            .map(|labels| labels.clone())
            .unwrap_or_default()
    }

    /// Number of `save_all` calls so far.
    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl LabelStore for MemoryStore {
    fn load_all(&self) -> Result<LabelMap> {
        Ok(self.snapshot())
    }

    fn save_all(&self, labels: &LabelMap) -> Result<()> {
        let mut stored = self
            .labels
            .lock()
            .map_err(|_| HuginnError::Configuration("label store lock poisoned".to_string()))?;
        *stored = labels.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Label;

    fn sample() -> LabelMap {
        LabelMap::from([(
            "img1".to_string(),
            vec![Label::new("Cat", 95.0), Label::new("Pet", 80.5)],
        )])
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("labels.json"));
        assert!(store.load_all().unwrap().is_empty());
    }

    #[test]
    fn empty_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.json");
        std::fs::write(&path, "").unwrap();
        assert!(JsonFileStore::new(path).load_all().unwrap().is_empty());
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.json");
        std::fs::write(&path, "this is not valid json").unwrap();

        let err = JsonFileStore::new(&path).load_all().unwrap_err();
        assert!(matches!(err, HuginnError::CacheStore { .. }));
        assert!(err.to_string().contains("corrupt label cache"));
    }

    #[test]
    fn invalid_utf8_is_an_error_and_file_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.json");
        let bytes = b"{\"old\":[{\"Name\":\"Dog\xFF\",\"Confidence\":99}]}".to_vec();
        std::fs::write(&path, &bytes).unwrap();

        let err = JsonFileStore::new(&path).load_all().unwrap_err();
        assert!(matches!(err, HuginnError::CacheStore { .. }));
        assert_eq!(std::fs::read(&path).unwrap(), bytes);
    }

    #[test]
    fn whitespace_only_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.json");
        std::fs::write(&path, " \n\t").unwrap();
        assert!(JsonFileStore::new(path).load_all().unwrap().is_empty());
    }

    #[test]
    fn unreadable_path_loads_empty() {
        // A directory exists at the path but cannot be read as a file.
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.json");
        std::fs::create_dir(&path).unwrap();

        assert!(JsonFileStore::new(&path).load_all().unwrap().is_empty());
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("labels.json"));

        store.save_all(&sample()).unwrap();
        assert_eq!(store.load_all().unwrap(), sample());
        assert!(!dir.path().join("labels.json.tmp").exists());
    }

    #[test]
    fn save_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deep").join("nested").join("labels.json");

        JsonFileStore::new(&path).save_all(&sample()).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn save_overwrites_whole_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("labels.json"));
        store.save_all(&sample()).unwrap();

        let replacement = LabelMap::from([("img2".to_string(), vec![Label::new("Dog", 99.0)])]);
        store.save_all(&replacement).unwrap();

        let loaded = store.load_all().unwrap();
        assert!(!loaded.contains_key("img1"));
        assert!(loaded.contains_key("img2"));
    }

    #[test]
    fn on_disk_shape_is_map_of_label_lists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.json");
        JsonFileStore::new(&path).save_all(&sample()).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["img1"][0]["Name"], "Cat");
        assert_eq!(raw["img1"][1]["Confidence"], 80.5);
    }

    #[test]
    fn memory_store_counts_saves() {
        let store = MemoryStore::new();
        assert_eq!(store.saves(), 0);
        store.save_all(&sample()).unwrap();
        assert_eq!(store.saves(), 1);
        assert_eq!(store.load_all().unwrap(), sample());
    }
}
