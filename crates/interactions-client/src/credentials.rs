//! Token and site-preference persistence

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Lifetime of a stored value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageScope {
    /// Dropped when the session ends
    Session,
    /// Survives restarts
    Durable,
}

/// Key-value store for credentials and preferences.
///
/// A key lives in at most one scope; setting it in one scope removes it from
/// the other. Expired values read as absent.
pub trait CredentialStore: Send + Sync + fmt::Debug {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, scope: StorageScope, key: &str, value: &str, ttl: Option<Duration>)
    -> Result<()>;

    /// Remove `key` from both scopes
    fn remove(&self, key: &str) -> Result<()>;

    /// Drop every session-scoped value
    fn clear_session(&self) -> Result<()>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredValue {
    value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<DateTime<Utc>>,
}

impl StoredValue {
    fn new(value: &str, ttl: Option<Duration>) -> Self {
        Self {
            value: value.to_string(),
            expires_at: ttl
                .and_then(|ttl| chrono::Duration::from_std(ttl).ok())
                .and_then(|ttl| Utc::now().checked_add_signed(ttl)),
        }
    }

    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Utc::now() >= at)
    }
}

#[derive(Debug, Default)]
struct ScopedValues {
    session: HashMap<String, StoredValue>,
    durable: HashMap<String, StoredValue>,
}

impl ScopedValues {
    /// Value for `key` and whether an expired durable value was purged
    fn get(&mut self, key: &str) -> (Option<String>, bool) {
        let mut purged_durable = false;
        if self.session.get(key).is_some_and(StoredValue::is_expired) {
            self.session.remove(key);
        }
        if self.durable.get(key).is_some_and(StoredValue::is_expired) {
            self.durable.remove(key);
            purged_durable = true;
        }
        let value = self
            .session
            .get(key)
            .or_else(|| self.durable.get(key))
            .map(|v| v.value.clone());
        (value, purged_durable)
    }

    /// Returns whether the durable scope changed
    fn set(&mut self, scope: StorageScope, key: &str, value: StoredValue) -> bool {
        match scope {
            StorageScope::Session => {
                self.session.insert(key.to_string(), value);
                self.durable.remove(key).is_some()
            }
            StorageScope::Durable => {
                self.session.remove(key);
                self.durable.insert(key.to_string(), value);
                true
            }
        }
    }

    /// Returns whether the durable scope changed
    fn remove(&mut self, key: &str) -> bool {
        self.session.remove(key);
        self.durable.remove(key).is_some()
    }
}

/// Process-local store; nothing survives the process
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    values: Mutex<ScopedValues>,
}

impl MemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.lock().get(key).0)
    }

    fn set(
        &self,
        scope: StorageScope,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<()> {
        self.values
            .lock()
            .set(scope, key, StoredValue::new(value, ttl));
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.values.lock().remove(key);
        Ok(())
    }

    fn clear_session(&self) -> Result<()> {
        self.values.lock().session.clear();
        Ok(())
    }
}

/// Store whose durable scope is a JSON file; session values stay in memory.
///
/// Writes go to a temporary file that is renamed over the target.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    values: Mutex<ScopedValues>,
}

impl FileCredentialStore {
    /// Open the store at `path`, loading durable values if the file exists
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let durable = match std::fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => HashMap::new(),
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                Error::Storage(format!("corrupt credential file {}: {e}", path.display()))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                return Err(Error::Storage(format!(
                    "failed to read {}: {e}",
                    path.display()
                )));
            }
        };

        tracing::debug!(path = %path.display(), entries = durable.len(), "Opened credential store");
        Ok(Self {
            path,
            values: Mutex::new(ScopedValues {
                session: HashMap::new(),
                durable,
            }),
        })
    }

    /// `~/.config/interactions-client/credentials.json`
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        std::env::var_os("HOME").map(|home| {
            PathBuf::from(home)
                .join(".config")
                .join("interactions-client")
                .join("credentials.json")
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, durable: &HashMap<String, StoredValue>) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::Storage(format!("failed to create {}: {e}", parent.display()))
            })?;
        }

        let payload = serde_json::to_vec_pretty(durable)
            .map_err(|e| Error::Storage(format!("failed to encode credentials: {e}")))?;
        let temp_path = self.path.with_extension("json.tmp");

        std::fs::write(&temp_path, payload).map_err(|e| {
            Error::Storage(format!("failed to write {}: {e}", temp_path.display()))
        })?;
        std::fs::rename(&temp_path, &self.path).map_err(|e| {
            Error::Storage(format!("failed to replace {}: {e}", self.path.display()))
        })
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let mut values = self.values.lock();
        let (value, purged) = values.get(key);
        if purged {
            self.persist(&values.durable)?;
        }
        Ok(value)
    }

    fn set(
        &self,
        scope: StorageScope,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let mut values = self.values.lock();
        if values.set(scope, key, StoredValue::new(value, ttl)) {
            self.persist(&values.durable)?;
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut values = self.values.lock();
        if values.remove(key) {
            self.persist(&values.durable)?;
        }
        Ok(())
    }

    fn clear_session(&self) -> Result<()> {
        self.values.lock().session.clear();
        Ok(())
    }
}
