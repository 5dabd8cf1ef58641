//! Durable view state
//!
//! The current state is stored as one JSON blob under a single key. Storage
//! problems never reach callers: an unavailable backend turns every
//! operation into a no-op, and read/write failures are logged.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, info, warn};

use crate::constants::{config::APP_DIR, storage};
use crate::error::StorageError;
use crate::types::State;

/// A string key-value store that survives page loads
pub trait KeyValueStorage {
    /// `false` when the host has no durable storage (private mode, sandboxed frame)
    fn is_available(&self) -> bool {
        true
    }

    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

/// In-memory storage. Clones share the same entries, so a test can keep a
/// handle and inspect what the engine wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.raw(key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

/// Storage backed by a JSON object on disk, used by the CLI
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<data dir>/customviews/storage.json`
    pub fn default_path() -> PathBuf {
        let mut path = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(APP_DIR);
        path.push(storage::FILE_NAME);
        path
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(source) => Err(StorageError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let io_err = |source| StorageError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let contents = serde_json::to_string_pretty(map)?;
        fs::write(&self.path, contents).map_err(io_err)
    }
}

impl Default for FileStorage {
    fn default() -> Self {
        Self::new(Self::default_path())
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read_map()?.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut map = self.read_map()?;
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map)
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        let mut map = self.read_map()?;
        if map.remove(key).is_some() {
            self.write_map(&map)?;
        }
        Ok(())
    }
}

/// A host without durable storage
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableStorage;

impl KeyValueStorage for UnavailableStorage {
    fn is_available(&self) -> bool {
        false
    }

    fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::Unavailable)
    }

    fn set(&mut self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Unavailable)
    }

    fn remove(&mut self, _key: &str) -> Result<(), StorageError> {
        Err(StorageError::Unavailable)
    }
}

/// Reads and writes the persisted state blob
pub struct PersistenceStore {
    backend: Box<dyn KeyValueStorage>,
}

impl PersistenceStore {
    pub fn new(backend: Box<dyn KeyValueStorage>) -> Self {
        let store = Self { backend };
        store.report_legacy_keys();
        store
    }

    pub fn is_available(&self) -> bool {
        self.backend.is_available()
    }

    /// Store `state`, or remove the stored blob when `None`
    pub fn persist(&mut self, state: Option<&State>) {
        if !self.is_available() {
            return;
        }
        let Some(state) = state else {
            self.clear();
            return;
        };

        let json = match serde_json::to_string(state) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "Failed to serialize state for persistence");
                return;
            }
        };
        if let Err(e) = self.backend.set(storage::STATE_KEY, &json) {
            warn!(error = %e, "Failed to persist state");
        } else {
            debug!(state = %json, "Persisted state");
        }
    }

    /// The stored state, if there is one and it parses
    pub fn load(&self) -> Option<State> {
        let raw = self.read_raw()?;
        match serde_json::from_str::<State>(&raw) {
            Ok(state) => Some(state),
            Err(e) => {
                // A bare state id from the old three-key scheme lands here too
                warn!(value = %raw, error = %e, "Ignoring unreadable persisted state");
                None
            }
        }
    }

    pub fn clear(&mut self) {
        if !self.is_available() {
            return;
        }
        if let Err(e) = self.backend.remove(storage::STATE_KEY) {
            warn!(error = %e, "Failed to clear persisted state");
        } else {
            info!("Cleared persisted state");
        }
    }

    pub fn has_persisted_data(&self) -> bool {
        self.read_raw().is_some()
    }

    fn read_raw(&self) -> Option<String> {
        if !self.is_available() {
            return None;
        }
        self.backend
            .get(storage::STATE_KEY)
            .inspect_err(|e| warn!(error = %e, "Failed to read persisted state"))
            .ok()
            .flatten()
    }

    fn report_legacy_keys(&self) {
        if !self.is_available() {
            return;
        }
        for key in [storage::LEGACY_PROFILE_KEY, storage::LEGACY_CUSTOM_STATE_KEY] {
            if let Ok(Some(_)) = self.backend.get(key) {
                info!(key = %key, "Found legacy storage key, ignoring it");
            }
        }
    }
}
