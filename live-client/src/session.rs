//! Session storage
//!
//! Key/value store holding the bearer token and role, using the same keys
//! the browser build keeps in `localStorage`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::error::{ClientError, ClientResult};

pub const TOKEN_KEY: &str = "token";
/// Legacy token key, read when `token` is absent
pub const AUTH_TOKEN_KEY: &str = "auth_token";
pub const USER_ROLE_KEY: &str = "user_role";

pub trait SessionStore: Send + Sync + std::fmt::Debug {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> ClientResult<()>;
    fn remove(&self, key: &str) -> ClientResult<()>;

    /// Bearer token (`token`, then `auth_token`); empty strings count as missing
    fn token(&self) -> Option<String> {
        self.get(TOKEN_KEY)
            .filter(|t| !t.is_empty())
            .or_else(|| self.get(AUTH_TOKEN_KEY).filter(|t| !t.is_empty()))
    }

    fn role(&self) -> Option<String> {
        self.get(USER_ROLE_KEY).filter(|r| !r.is_empty())
    }

    /// Drop all session keys (logout)
    fn clear(&self) -> ClientResult<()> {
        for key in [TOKEN_KEY, AUTH_TOKEN_KEY, USER_ROLE_KEY] {
            self.remove(key)?;
        }
        Ok(())
    }
}

fn lock(values: &Mutex<HashMap<String, String>>) -> MutexGuard<'_, HashMap<String, String>> {
    values.lock().unwrap_or_else(|e| e.into_inner())
}

/// Process-local session
#[derive(Debug, Default)]
pub struct MemorySession {
    values: Mutex<HashMap<String, String>>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        let session = Self::new();
        lock(&session.values).insert(TOKEN_KEY.to_string(), token.into());
        session
    }
}

impl SessionStore for MemorySession {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.values).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> ClientResult<()> {
        lock(&self.values).insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> ClientResult<()> {
        lock(&self.values).remove(key);
        Ok(())
    }
}

/// Session persisted as a JSON object on disk
#[derive(Debug)]
pub struct FileSession {
    path: PathBuf,
    values: Mutex<HashMap<String, String>>,
}

impl FileSession {
    /// Open (or lazily create) the session file
    pub fn open(path: impl AsRef<Path>) -> ClientResult<Self> {
        let path = path.as_ref().to_path_buf();
        let values = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .map_err(|e| ClientError::Session(format!("read {}: {e}", path.display())))?;
            serde_json::from_str(&content)?
        } else {
            HashMap::new()
        };
        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    fn persist(&self, values: &HashMap<String, String>) -> ClientResult<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| ClientError::Session(format!("create {}: {e}", parent.display())))?;
        }
        let content = serde_json::to_string_pretty(values)?;
        std::fs::write(&self.path, content)
            .map_err(|e| ClientError::Session(format!("write {}: {e}", self.path.display())))
    }
}

impl SessionStore for FileSession {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.values).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> ClientResult<()> {
        let mut values = lock(&self.values);
        values.insert(key.to_string(), value.to_string());
        self.persist(&values)
    }

    fn remove(&self, key: &str) -> ClientResult<()> {
        let mut values = lock(&self.values);
        if values.remove(key).is_some() {
            self.persist(&values)?;
        }
        Ok(())
    }
}
