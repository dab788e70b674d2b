use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ============================================================================
// State Sink
// ============================================================================

/// Errors raised by a state sink
#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to access state file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize state: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("state sink is read-only, cannot store '{0}'")]
    ReadOnly(String),
}

/// Key/value sink where read results are recorded
///
/// Keys are attribute keys (`acl`, `logentries`, `package`); values are the
/// normalized declared shape of the attribute.
pub trait StateStore {
    /// Last value recorded for a key
    fn get(&self, key: &str) -> Option<Value>;

    /// Record a value for a key
    fn set(&mut self, key: &str, value: Value) -> Result<(), StateError>;
}

// ============================================================================
// In-memory State
// ============================================================================

/// State kept in memory, optionally refusing writes
#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    values: BTreeMap<String, Value>,
    read_only: bool,
}

impl MemoryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose `set` always fails
    pub fn read_only() -> Self {
        Self {
            values: BTreeMap::new(),
            read_only: true,
        }
    }

    /// Seed a value regardless of the read-only flag
    pub fn with(mut self, key: &str, value: Value) -> Self {
        self.values.insert(key.to_string(), value);
        self
    }

    pub fn values(&self) -> &BTreeMap<String, Value> {
        &self.values
    }
}

impl StateStore for MemoryState {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) -> Result<(), StateError> {
        if self.read_only {
            return Err(StateError::ReadOnly(key.to_string()));
        }
        self.values.insert(key.to_string(), value);
        Ok(())
    }
}

// ============================================================================
// File State
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StateDocument {
    #[serde(default)]
    values: BTreeMap<String, Value>,
    last_updated: DateTime<Utc>,
}

impl Default for StateDocument {
    fn default() -> Self {
        Self {
            values: BTreeMap::new(),
            last_updated: Utc::now(),
        }
    }
}

/// State persisted to a JSON file, written through on every `set`
#[derive(Debug, Clone)]
pub struct FileState {
    path: PathBuf,
    document: StateDocument,
}

impl FileState {
    /// Load state from disk, or start empty if the file doesn't exist
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, StateError> {
        let path = path.into();

        if !path.exists() {
            log::debug!("State file {} does not exist, using empty state", path.display());
            return Ok(Self {
                path,
                document: StateDocument::default(),
            });
        }

        let content = fs::read_to_string(&path).map_err(|source| StateError::Io {
            path: path.clone(),
            source,
        })?;
        let document: StateDocument = serde_json::from_str(&content)?;

        log::debug!("Loaded state from {}", path.display());
        Ok(Self { path, document })
    }

    /// Save state to disk, refreshing the timestamp
    pub fn save(&mut self) -> Result<(), StateError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|source| StateError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        self.document.last_updated = Utc::now();
        let content = serde_json::to_string_pretty(&self.document)?;
        fs::write(&self.path, content).map_err(|source| StateError::Io {
            path: self.path.clone(),
            source,
        })?;

        log::debug!("Saved state to {}", self.path.display());
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.document.last_updated
    }
}

impl StateStore for FileState {
    fn get(&self, key: &str) -> Option<Value> {
        self.document.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) -> Result<(), StateError> {
        self.document.values.insert(key.to_string(), value);
        self.save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_memory_state_set_and_get() {
        let mut state = MemoryState::new();
        assert!(state.get("acl").is_none());

        state.set("acl", json!([{ "name": "a" }])).unwrap();
        assert_eq!(state.get("acl"), Some(json!([{ "name": "a" }])));
    }

    #[test]
    fn test_memory_state_read_only_rejects_writes() {
        let mut state = MemoryState::read_only().with("package", json!([]));
        assert!(matches!(
            state.set("acl", json!([])),
            Err(StateError::ReadOnly(key)) if key == "acl"
        ));
        assert_eq!(state.get("package"), Some(json!([])));
    }

    #[test]
    fn test_file_state_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let state = FileState::load(dir.path().join("state.json")).unwrap();
        assert!(state.get("acl").is_none());
    }

    #[test]
    fn test_file_state_writes_through() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("state.json");

        let mut state = FileState::load(&path).unwrap();
        state.set("logentries", json!([{ "name": "a", "port": 20000 }])).unwrap();
        assert!(path.exists());

        let reloaded = FileState::load(&path).unwrap();
        assert_eq!(
            reloaded.get("logentries"),
            Some(json!([{ "name": "a", "port": 20000 }]))
        );
    }

    #[test]
    fn test_file_state_rejects_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(FileState::load(&path), Err(StateError::Serialize(_))));
    }
}
