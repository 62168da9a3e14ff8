use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use super::domain::ReviewerRole;

const SESSION_KEY: &str = "reviewer_session";

/// Key-value persistence port for client-side state.
pub trait SessionStore: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>, SessionError>;
    fn write(&self, key: &str, value: &str) -> Result<(), SessionError>;
    fn remove(&self, key: &str) -> Result<(), SessionError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session storage unavailable: {0}")]
    Storage(String),
    #[error("stored session is corrupt: {0}")]
    Corrupt(String),
    #[error("no reviewer session; sign in first")]
    Missing,
}

/// Authenticated reviewer, injected wherever the role or token is needed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewerSession {
    pub user_id: String,
    pub display_name: String,
    pub role: ReviewerRole,
    pub access_token: String,
}

impl ReviewerSession {
    pub fn load(store: &dyn SessionStore) -> Result<Option<Self>, SessionError> {
        match store.read(SESSION_KEY)? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|err| SessionError::Corrupt(err.to_string())),
            None => Ok(None),
        }
    }

    pub fn require(store: &dyn SessionStore) -> Result<Self, SessionError> {
        Self::load(store)?.ok_or(SessionError::Missing)
    }

    pub fn save(&self, store: &dyn SessionStore) -> Result<(), SessionError> {
        let raw =
            serde_json::to_string(self).map_err(|err| SessionError::Storage(err.to_string()))?;
        store.write(SESSION_KEY, &raw)
    }

    pub fn clear(store: &dyn SessionStore) -> Result<(), SessionError> {
        store.remove(SESSION_KEY)
    }
}

/// Process-local store, used by tests and the demo.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl SessionStore for MemorySessionStore {
    fn read(&self, key: &str) -> Result<Option<String>, SessionError> {
        let guard = self.entries.lock().expect("session mutex poisoned");
        Ok(guard.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), SessionError> {
        let mut guard = self.entries.lock().expect("session mutex poisoned");
        guard.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), SessionError> {
        let mut guard = self.entries.lock().expect("session mutex poisoned");
        guard.remove(key);
        Ok(())
    }
}

/// JSON object on disk holding every key.
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_entries(&self) -> Result<BTreeMap<String, String>, SessionError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(raw) => {
                serde_json::from_str(&raw).map_err(|err| SessionError::Corrupt(err.to_string()))
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(err) => Err(SessionError::Storage(err.to_string())),
        }
    }

    fn store_entries(&self, entries: &BTreeMap<String, String>) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| SessionError::Storage(err.to_string()))?;
        }
        let raw = serde_json::to_string_pretty(entries)
            .map_err(|err| SessionError::Storage(err.to_string()))?;
        fs::write(&self.path, raw).map_err(|err| SessionError::Storage(err.to_string()))
    }
}

impl SessionStore for FileSessionStore {
    fn read(&self, key: &str) -> Result<Option<String>, SessionError> {
        let _guard = self.lock.lock().expect("session file mutex poisoned");
        Ok(self.load_entries()?.remove(key))
    }

    fn write(&self, key: &str, value: &str) -> Result<(), SessionError> {
        let _guard = self.lock.lock().expect("session file mutex poisoned");
        let mut entries = self.load_entries()?;
        entries.insert(key.to_string(), value.to_string());
        self.store_entries(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), SessionError> {
        let _guard = self.lock.lock().expect("session file mutex poisoned");
        let mut entries = self.load_entries()?;
        if entries.remove(key).is_some() {
            self.store_entries(&entries)?;
        }
        Ok(())
    }
}
