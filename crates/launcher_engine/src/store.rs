//! Session token persistence.
//!
//! A flat string key-value store where an absent key reads as `""` and
//! writing `""` deletes the key, plus [`SessionStore`], the session context
//! handed to whoever needs the token or username.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Mutex, MutexGuard};

use launcher_logging::{launcher_debug, launcher_warn};
use thiserror::Error;

use crate::persist::{read_if_exists, AtomicFileWriter, PersistError};

pub const ACCESS_TOKEN_KEY: &str = "accessToken";
pub const USERNAME_KEY: &str = "username";

const SESSION_FILENAME: &str = "session.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
    #[error("serialize error: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> String;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn apply(values: &mut BTreeMap<String, String>, key: &str, value: &str) {
    if value.is_empty() {
        values.remove(key);
    } else {
        values.insert(key.to_string(), value.to_string());
    }
}

#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        lock(&self.values).contains_key(key)
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> String {
        lock(&self.values).get(key).cloned().unwrap_or_default()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        apply(&mut lock(&self.values), key, value);
        Ok(())
    }
}

/// JSON object file in the state directory, rewritten atomically on every set.
#[derive(Debug)]
pub struct FileKeyValueStore {
    dir: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl FileKeyValueStore {
    /// Loads `session.json` from `dir`. A missing or unreadable file starts
    /// empty; the next write replaces it.
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let values = load_values(&dir.join(SESSION_FILENAME));
        Self {
            dir,
            values: Mutex::new(values),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(SESSION_FILENAME)
    }
}

fn load_values(path: &Path) -> BTreeMap<String, String> {
    let content = match read_if_exists(path) {
        Ok(Some(text)) => text,
        Ok(None) => return BTreeMap::new(),
        Err(err) => {
            launcher_warn!("Failed to read session store {:?}: {}", path, err);
            return BTreeMap::new();
        }
    };
    match serde_json::from_str::<BTreeMap<String, String>>(&content) {
        Ok(values) => values,
        Err(err) => {
            launcher_warn!("Ignoring malformed session store {:?}: {}", path, err);
            BTreeMap::new()
        }
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> String {
        lock(&self.values).get(key).cloned().unwrap_or_default()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut values = lock(&self.values);
        apply(&mut values, key, value);
        let writer = AtomicFileWriter::new(self.dir.clone());
        if values.is_empty() {
            writer.remove(SESSION_FILENAME)?;
        } else {
            writer.write(SESSION_FILENAME, &serde_json::to_string_pretty(&*values)?)?;
        }
        Ok(())
    }
}

/// A token paired with a non-empty username.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSession {
    pub access_token: String,
    pub username: String,
}

/// Snapshot sent to subscribers after every write, changed or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionChange {
    pub access_token: String,
    pub username: String,
}

/// Session context: token and username with change notification.
///
/// There is no conflict detection; concurrent writers overwrite each other in
/// completion order.
pub struct SessionStore {
    backend: Box<dyn KeyValueStore>,
    subscribers: Mutex<Vec<mpsc::Sender<SessionChange>>>,
}

impl SessionStore {
    pub fn new(backend: impl KeyValueStore + 'static) -> Self {
        Self {
            backend: Box::new(backend),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn token(&self) -> String {
        self.backend.get(ACCESS_TOKEN_KEY)
    }

    pub fn username(&self) -> String {
        self.backend.get(USERNAME_KEY)
    }

    /// The stored session, if the token has a username to go with it.
    pub fn session(&self) -> Option<StoredSession> {
        let access_token = self.token();
        let username = self.username();
        if access_token.is_empty() || username.is_empty() {
            return None;
        }
        Some(StoredSession {
            access_token,
            username,
        })
    }

    pub fn set_session(&self, access_token: &str, username: &str) -> Result<(), StoreError> {
        self.backend.set(USERNAME_KEY, username)?;
        self.backend.set(ACCESS_TOKEN_KEY, access_token)?;
        self.notify();
        Ok(())
    }

    /// Drops the token but keeps the username as a future login hint.
    pub fn clear_token(&self) -> Result<(), StoreError> {
        self.backend.set(ACCESS_TOKEN_KEY, "")?;
        self.notify();
        Ok(())
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        self.backend.set(ACCESS_TOKEN_KEY, "")?;
        self.backend.set(USERNAME_KEY, "")?;
        self.notify();
        Ok(())
    }

    pub fn subscribe(&self) -> mpsc::Receiver<SessionChange> {
        let (tx, rx) = mpsc::channel();
        lock(&self.subscribers).push(tx);
        rx
    }

    fn notify(&self) {
        let change = SessionChange {
            access_token: self.token(),
            username: self.username(),
        };
        let mut subscribers = lock(&self.subscribers);
        subscribers.retain(|tx| tx.send(change.clone()).is_ok());
        launcher_debug!("Session change delivered to {} subscriber(s)", subscribers.len());
    }
}
