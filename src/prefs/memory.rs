//! In-memory preference backend for ephemeral sessions and tests

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use super::{PrefError, PreferenceBackend};

/// Process-local backend. Nothing survives a restart.
#[derive(Debug)]
pub struct MemoryBackend {
    values: RwLock<HashMap<String, String>>,
    available: AtomicBool,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            values: RwLock::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Simulate the store going away (or coming back)
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> Result<(), PrefError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(PrefError::unavailable(self.describe(), "store is offline"))
        }
    }
}

#[async_trait]
impl PreferenceBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, PrefError> {
        self.ensure_available()?;
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), PrefError> {
        self.ensure_available()?;
        self.values
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
