//! Durable preference backend
//!
//! All preferences live in one flat TOML table (`prefs.toml`) in the data
//! directory. A write replaces the whole document through a temp file and a
//! rename, so a reader sees either the previous document or the new one.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use super::{PrefError, PreferenceBackend};

const PREFS_FILE: &str = "prefs.toml";

type PrefTable = BTreeMap<String, String>;

// Makes temp names unique across backends in this process; the pid covers other processes
static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug)]
pub struct FileBackend {
    dir: PathBuf,
    path: PathBuf,
    // Serializes read-modify-write cycles within this process
    write_lock: Mutex<()>,
}

impl FileBackend {
    /// Open (creating if needed) the store in `dir`
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, PrefError> {
        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| PrefError::unavailable(dir.display().to_string(), e))?;

        let path = dir.join(PREFS_FILE);
        tracing::debug!("Preference store at {}", path.display());

        Ok(Self {
            dir: dir.to_path_buf(),
            path,
            write_lock: Mutex::new(()),
        })
    }

    fn unavailable(&self, reason: impl ToString) -> PrefError {
        PrefError::unavailable(self.path.display().to_string(), reason)
    }

    async fn read_table(&self) -> Result<PrefTable, PrefError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => toml::from_str(&content).map_err(|e| {
                tracing::warn!("Preferences file is corrupt: {}", e);
                self.unavailable(format!("corrupt preferences file: {}", e))
            }),
            // Nothing written yet
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(PrefTable::new()),
            Err(e) => Err(self.unavailable(e)),
        }
    }

    async fn write_table(&self, table: &PrefTable) -> Result<(), PrefError> {
        let content = toml::to_string(table).map_err(|e| self.unavailable(e))?;
        let tmp_path = self.dir.join(format!(
            ".{}.{}.{}.tmp",
            PREFS_FILE,
            std::process::id(),
            TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));

        let result: std::io::Result<()> = async {
            let mut file = tokio::fs::File::create(&tmp_path).await?;
            file.write_all(content.as_bytes()).await?;
            file.flush().await?;
            file.sync_all().await?;
            drop(file);
            tokio::fs::rename(&tmp_path, &self.path).await?;
            self.sync_dir().await
        }
        .await;

        if let Err(e) = result {
            tracing::warn!("Failed to write preferences: {}", e);
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(self.unavailable(e));
        }
        Ok(())
    }

    /// Make the rename itself durable
    #[cfg(unix)]
    async fn sync_dir(&self) -> std::io::Result<()> {
        tokio::fs::File::open(&self.dir).await?.sync_all().await
    }

    #[cfg(not(unix))]
    async fn sync_dir(&self) -> std::io::Result<()> {
        Ok(())
    }
}

#[async_trait]
impl PreferenceBackend for FileBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, PrefError> {
        let mut table = self.read_table().await?;
        Ok(table.remove(key))
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), PrefError> {
        let _guard = self.write_lock.lock().await;

        let mut table = self.read_table().await?;
        table.insert(key.to_string(), value.to_string());
        self.write_table(&table).await
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prefs::{PreferenceStore, USER_NAME_KEY};
    use std::sync::Arc;

    fn assert_no_temp_files(dir: &Path) {
        let leftovers: Vec<_> = std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "Temp files left behind: {:?}", leftovers);
    }

    #[tokio::test]
    async fn test_fresh_directory_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferenceStore::new(Arc::new(FileBackend::open(dir.path()).await.unwrap()));

        assert_eq!(store.load(USER_NAME_KEY).await.unwrap(), "");
        assert!(!dir.path().join(PREFS_FILE).exists(), "Loading must not create the file");
    }

    #[tokio::test]
    async fn test_value_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = PreferenceStore::new(Arc::new(FileBackend::open(dir.path()).await.unwrap()));
            store.save(USER_NAME_KEY, "Alex").await.unwrap();
            store.save(USER_NAME_KEY, "Sam").await.unwrap();
        }

        let store = PreferenceStore::new(Arc::new(FileBackend::open(dir.path()).await.unwrap()));
        assert_eq!(store.load(USER_NAME_KEY).await.unwrap(), "Sam");
    }

    #[tokio::test]
    async fn test_save_keeps_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::open(dir.path()).await.unwrap();

        backend.put("theme", "dark").await.unwrap();
        backend.put(USER_NAME_KEY, "Alex \"the\" = member").await.unwrap();

        assert_eq!(backend.get("theme").await.unwrap().as_deref(), Some("dark"));
        assert_eq!(
            backend.get(USER_NAME_KEY).await.unwrap().as_deref(),
            Some("Alex \"the\" = member")
        );
        assert_no_temp_files(dir.path());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(PREFS_FILE), "user_name = \"Alex").unwrap();

        let store = PreferenceStore::new(Arc::new(FileBackend::open(dir.path()).await.unwrap()));
        let err = store.load(USER_NAME_KEY).await.unwrap_err();
        assert!(matches!(err, PrefError::StorageUnavailable { .. }));

        // A save must not paper over the corrupt document either
        assert!(store.save(USER_NAME_KEY, "Sam").await.is_err());
    }

    #[tokio::test]
    async fn test_open_fails_when_dir_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "x").unwrap();

        let err = FileBackend::open(blocker.join("nested")).await.unwrap_err();
        assert!(matches!(err, PrefError::StorageUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_overlapping_saves_leave_one_complete_value() {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferenceStore::new(Arc::new(FileBackend::open(dir.path()).await.unwrap()));

        let names = ["Alex", "Sam", "Jo", "Kim"];
        let handles: Vec<_> = names
            .iter()
            .map(|name| {
                let store = store.clone();
                let name = name.to_string();
                tokio::spawn(async move { store.save(USER_NAME_KEY, &name).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let value = store.load(USER_NAME_KEY).await.unwrap();
        assert!(names.contains(&value.as_str()), "Unexpected value: {}", value);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_two_backends_on_one_directory_never_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let first = Arc::new(FileBackend::open(dir.path()).await.unwrap());
        let second = Arc::new(FileBackend::open(dir.path()).await.unwrap());

        let handles: Vec<_> = (0..60)
            .map(|i| {
                let backend = if i % 2 == 0 { first.clone() } else { second.clone() };
                tokio::spawn(async move {
                    backend.put(USER_NAME_KEY, &"x".repeat(5000 + i)).await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let value = first.get(USER_NAME_KEY).await.unwrap().unwrap();
        assert!(value.len() >= 5000 && value.chars().all(|c| c == 'x'));
        assert_eq!(second.get(USER_NAME_KEY).await.unwrap().as_deref(), Some(value.as_str()));
        assert_no_temp_files(dir.path());
    }
}
