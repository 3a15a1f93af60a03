//! Token storage boundary
//!
//! Two key-value slots hold the session's secrets:
//! - the credential (bearer) token lives in durable storage and survives restarts
//! - the CSRF token lives in session-scoped storage
//!
//! Both are cleared together on logout.

use log::{debug, warn};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Storage key of the credential token
pub const CREDENTIAL_TOKEN_KEY: &str = "auth_token";
/// Storage key of the CSRF token
pub const CSRF_TOKEN_KEY: &str = "csrf_token";

/// Minimal string key-value store
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory store, lives as long as the process
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.values).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        lock(&self.values).insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        lock(&self.values).remove(key);
    }
}

/// JSON-file backed store, written through on every change
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    values: Mutex<HashMap<String, String>>,
}

impl FileStore {
    /// Open the store at `path`, loading existing values if the file exists
    ///
    /// A missing file is an empty store. An unreadable or corrupt file is an error.
    pub fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e),
        };
        debug!("Opened token store at {:?}", path);
        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, values: &HashMap<String, String>) {
        let result = serde_json::to_string_pretty(values)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
            .and_then(|content| {
                if let Some(parent) = self.path.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(&self.path, content)
            });
        if let Err(e) = result {
            warn!("Failed to write token store {:?}: {}", self.path, e);
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.values).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        let mut values = lock(&self.values);
        values.insert(key.to_string(), value.to_string());
        self.persist(&values);
    }

    fn remove(&self, key: &str) {
        let mut values = lock(&self.values);
        if values.remove(key).is_some() {
            self.persist(&values);
        }
    }
}

/// The credential and CSRF token slots
#[derive(Clone)]
pub struct TokenStorage {
    durable: Arc<dyn KeyValueStore>,
    session: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for TokenStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStorage")
            .field("has_credential", &self.credential_token().is_some())
            .field("has_csrf", &self.csrf_token().is_some())
            .finish()
    }
}

impl TokenStorage {
    pub fn new(durable: Arc<dyn KeyValueStore>, session: Arc<dyn KeyValueStore>) -> Self {
        Self { durable, session }
    }

    /// Both slots in memory, for tests and ephemeral sessions
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), Arc::new(MemoryStore::new()))
    }

    /// Stored credential token, ignoring empty values
    pub fn credential_token(&self) -> Option<String> {
        self.durable
            .get(CREDENTIAL_TOKEN_KEY)
            .filter(|token| !token.is_empty())
    }

    pub fn set_credential_token(&self, token: &str) {
        self.durable.set(CREDENTIAL_TOKEN_KEY, token);
    }

    pub fn clear_credential_token(&self) {
        self.durable.remove(CREDENTIAL_TOKEN_KEY);
    }

    /// Stored CSRF token, ignoring empty values
    pub fn csrf_token(&self) -> Option<String> {
        self.session
            .get(CSRF_TOKEN_KEY)
            .filter(|token| !token.is_empty())
    }

    pub fn set_csrf_token(&self, token: &str) {
        self.session.set(CSRF_TOKEN_KEY, token);
    }

    pub fn clear_csrf_token(&self) {
        self.session.remove(CSRF_TOKEN_KEY);
    }

    /// Remove both tokens
    pub fn clear(&self) {
        self.clear_credential_token();
        self.clear_csrf_token();
    }
}
