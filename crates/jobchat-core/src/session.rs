//! Process-wide session values, most importantly the login token.

use anyhow::Result;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

pub const TOKEN_KEY: &str = "token";

/// Anything that can hand out the current authentication token.
///
/// Read at the moment of each send; `None` is an expected state.
pub trait TokenSource: Send + Sync {
    fn token(&self) -> Option<String>;
}

/// Shared key-value store populated by the login flow.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    values: Arc<RwLock<HashMap<String, String>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let values = self.values.read().unwrap_or_else(PoisonError::into_inner);
        values.get(key).cloned()
    }

    pub fn set(&self, key: &str, value: &str) {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_string(), value.to_string());
    }

    pub fn remove(&self, key: &str) -> Option<String> {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        values.remove(key)
    }

    /// Load a JSON object of string values. A missing file gives an empty store.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let content = fs::read_to_string(path)?;
        let values: HashMap<String, String> = serde_json::from_str(&content)?;
        Ok(Self {
            values: Arc::new(RwLock::new(values)),
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let values = self.values.read().unwrap_or_else(PoisonError::into_inner);
        fs::write(path, serde_json::to_string_pretty(&*values)?)?;
        Ok(())
    }
}

impl TokenSource for SessionStore {
    fn token(&self) -> Option<String> {
        self.get(TOKEN_KEY).filter(|t| !t.trim().is_empty())
    }
}
