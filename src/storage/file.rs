//! File-backed key-value store.
//!
//! One file per key under a directory. File names are derived from a hash of
//! the key so arbitrary keys (`shelfwise:saved_books`) map to safe names.
//! Each key also has a sibling `.lock` file; [`KeyValueStore::lock`] takes an
//! exclusive OS lock on it, which every process sharing the directory honors.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use async_trait::async_trait;
use fs2::FileExt;
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tokio::fs;
use tokio::task::JoinError;

use super::{KeyLock, KeyValueStore, StorageError};

/// Key-value store persisting each key as a JSON file
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Use `dir` as the storage directory (created lazily on first write)
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the file holding `key`
    pub fn path_for(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.dir.join(format!("{}.json", hex::encode(&digest[..8])))
    }

    /// Path of the lock file guarding `key`
    pub fn lock_path_for(&self, key: &str) -> PathBuf {
        self.path_for(key).with_extension("lock")
    }
}

fn blocking_failed(e: JoinError) -> StorageError {
    StorageError::Unavailable(format!("blocking file task failed: {}", e))
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key);

        match fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir).await?;

        let dir = self.dir.clone();
        let path = self.path_for(key);
        let value = value.to_string();

        // Unique temp file beside the target, then an atomic rename over it
        tokio::task::spawn_blocking(move || -> Result<(), StorageError> {
            let mut tmp = NamedTempFile::new_in(&dir)?;
            tmp.write_all(value.as_bytes())?;
            tmp.persist(&path).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(blocking_failed)?
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn lock(&self, key: &str) -> Result<KeyLock, StorageError> {
        fs::create_dir_all(&self.dir).await?;
        let path = self.lock_path_for(key);

        let file = tokio::task::spawn_blocking(move || -> std::io::Result<std::fs::File> {
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(false)
                .open(&path)?;

            // Blocks until every other holder has dropped its guard
            file.lock_exclusive()?;
            Ok(file)
        })
        .await
        .map_err(blocking_failed)??;

        Ok(KeyLock::held(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_key_is_none() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::new(temp.path().join("store"));

        assert_eq!(store.get("nothing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_get_remove() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::new(temp.path().join("store"));

        store.set("shelfwise:saved_books", "[]").await.unwrap();
        assert_eq!(
            store.get("shelfwise:saved_books").await.unwrap().as_deref(),
            Some("[]")
        );

        store.set("shelfwise:saved_books", "[1]").await.unwrap();
        assert_eq!(
            store.get("shelfwise:saved_books").await.unwrap().as_deref(),
            Some("[1]")
        );

        store.remove("shelfwise:saved_books").await.unwrap();
        assert_eq!(store.get("shelfwise:saved_books").await.unwrap(), None);

        // Removing twice is fine
        store.remove("shelfwise:saved_books").await.unwrap();
    }

    #[test]
    fn test_path_is_stable_and_safe() {
        let store = FileStore::new("/tmp/shelfwise");
        let a = store.path_for("@odd:key/with slashes");
        let b = store.path_for("@odd:key/with slashes");

        assert_eq!(a, b);
        assert_eq!(a.parent(), Some(Path::new("/tmp/shelfwise")));
        let name = a.file_name().unwrap().to_string_lossy().to_string();
        assert_eq!(name.len(), 16 + ".json".len());
        assert_eq!(
            store.lock_path_for("@odd:key/with slashes"),
            a.with_extension("lock")
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writers_never_collide() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("store");

        let mut handles = Vec::new();
        for i in 0..16 {
            // One instance per writer, as separate processes would have
            let store = FileStore::new(&dir);
            handles.push(tokio::spawn(async move {
                store.set("shelfwise:saved_books", &format!("[{}]", i)).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let store = FileStore::new(&dir);
        let value = store.get("shelfwise:saved_books").await.unwrap().unwrap();
        assert!(value.starts_with('[') && value.ends_with(']'));

        // Only the data file is left behind
        let names: Vec<String> = std::fs::read_dir(&dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names.len(), 1, "{:?}", names);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_lock_excludes_other_instances() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("store");
        let first = FileStore::new(&dir);
        let second = Arc::new(FileStore::new(&dir));

        let held = first.lock("shelfwise:saved_books").await.unwrap();

        let waiter = {
            let second = second.clone();
            tokio::spawn(async move { second.lock("shelfwise:saved_books").await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!waiter.is_finished());

        drop(held);
        let guard = tokio::time::timeout(Duration::from_secs(5), waiter)
            .await
            .expect("lock was not released")
            .unwrap()
            .unwrap();
        drop(guard);
    }
}
