//! Key/value preference persistence
//!
//! `PreferenceStore` is the only thing screens talk to. The actual storage is an
//! injected `PreferenceBackend` so the same flow runs against the on-disk store
//! or an in-memory one.

pub mod file;
pub mod memory;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

pub use file::FileBackend;
pub use memory::MemoryBackend;

/// Key under which the membership screen keeps the member's display name
pub const USER_NAME_KEY: &str = "user_name";

#[derive(Debug, Error)]
pub enum PrefError {
    /// Zero-length identifier, rejected before any I/O
    #[error("preference key must not be empty")]
    EmptyKey,

    /// The underlying store could not be opened, read, parsed or written
    #[error("preference storage unavailable ({location}): {reason}")]
    StorageUnavailable { location: String, reason: String },
}

impl PrefError {
    pub fn unavailable(location: impl Into<String>, reason: impl ToString) -> Self {
        PrefError::StorageUnavailable {
            location: location.into(),
            reason: reason.to_string(),
        }
    }
}

/// Storage collaborator: single value per key, replace on write
#[async_trait]
pub trait PreferenceBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, PrefError>;

    async fn put(&self, key: &str, value: &str) -> Result<(), PrefError>;

    /// Human readable location, used in logs and CLI output
    fn describe(&self) -> String;
}

#[derive(Clone)]
pub struct PreferenceStore {
    backend: Arc<dyn PreferenceBackend>,
}

impl PreferenceStore {
    pub fn new(backend: Arc<dyn PreferenceBackend>) -> Self {
        Self { backend }
    }

    pub fn describe(&self) -> String {
        self.backend.describe()
    }

    /// Read the value for `key`. A key that was never written reads as "".
    pub async fn load(&self, key: &str) -> Result<String, PrefError> {
        check_key(key)?;
        let value = self.backend.get(key).await?;
        tracing::debug!("Loaded preference '{}' (present: {})", key, value.is_some());
        Ok(value.unwrap_or_default())
    }

    /// Replace the value for `key`. Returns once the backend reports it durable.
    pub async fn save(&self, key: &str, value: &str) -> Result<(), PrefError> {
        check_key(key)?;
        self.backend.put(key, value).await?;
        tracing::info!("Saved preference '{}' to {}", key, self.backend.describe());
        Ok(())
    }
}

fn check_key(key: &str) -> Result<(), PrefError> {
    if key.is_empty() {
        return Err(PrefError::EmptyKey);
    }
    Ok(())
}
