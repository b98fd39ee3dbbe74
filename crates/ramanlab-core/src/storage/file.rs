use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::KeyValueStore;

/// Session file name in the data directory
const SESSION_FILE: &str = "session.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    entries: BTreeMap<String, String>,
    updated_at: Option<DateTime<Utc>>,
}

/// Key-value store backed by a single JSON file.
///
/// The whole map is held in memory and rewritten on every mutation. Writes go
/// to a temporary file first and are renamed into place so a crash never
/// leaves a half-written session file behind.
pub struct FileStore {
    path: PathBuf,
    state: Mutex<StoreFile>,
}

impl FileStore {
    /// Open (or lazily create) the store inside `dir`
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let path = dir.as_ref().join(SESSION_FILE);
        let state = if path.exists() {
            let contents =
                std::fs::read_to_string(&path).context("Failed to read session file")?;
            serde_json::from_str(&contents).context("Failed to parse session file")?
        } else {
            StoreFile::default()
        };
        debug!(path = %path.display(), keys = state.entries.len(), "Session file opened");

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// When the file was last written, if ever
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.state.lock().updated_at
    }

    fn persist(&self, state: &StoreFile) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create session directory")?;
        }
        let contents = serde_json::to_string_pretty(state)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, contents).context("Failed to write session file")?;
        std::fs::rename(&tmp, &self.path).context("Failed to replace session file")?;
        Ok(())
    }

    fn mutate(&self, apply: impl FnOnce(&mut BTreeMap<String, String>) -> bool) -> Result<()> {
        let mut state = self.state.lock();
        let mut next = StoreFile {
            entries: state.entries.clone(),
            updated_at: Some(Utc::now()),
        };
        if !apply(&mut next.entries) {
            return Ok(());
        }
        self.persist(&next)?;
        *state = next;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.state.lock().entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.mutate(|entries| {
            entries.insert(key.to_string(), value.to_string());
            true
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.mutate(|entries| entries.remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();

        let store = FileStore::open(dir.path()).unwrap();
        assert!(store.updated_at().is_none());
        store.set("access_token", "A1").unwrap();
        store.set("refresh_token", "R1").unwrap();
        assert!(store.updated_at().is_some());
        drop(store);

        let reopened = FileStore::open(dir.path()).unwrap();
        assert_eq!(reopened.get("access_token").unwrap().as_deref(), Some("A1"));
        assert_eq!(reopened.get("refresh_token").unwrap().as_deref(), Some("R1"));
    }

    #[test]
    fn test_remove_absent_key_does_not_write() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();

        store.remove("user_info").unwrap();
        assert!(!store.path().exists());
        assert!(store.updated_at().is_none());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(SESSION_FILE), "{not json").unwrap();
        assert!(FileStore::open(dir.path()).is_err());
    }
}
