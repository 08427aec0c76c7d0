//! Key-value persistence primitive.
//!
//! The library keeps its whole state as one string value under one key, so
//! this layer offers get/set/remove of strings plus an exclusive per-key lock
//! for read-modify-write cycles. Values are opaque here; callers own their
//! serialization.

pub mod file;
pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Errors from a key-value backend
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Exclusive hold on a key across a read-modify-write cycle.
///
/// Released when dropped.
#[derive(Debug, Default)]
pub struct KeyLock {
    _file: Option<std::fs::File>,
}

impl KeyLock {
    /// Guard backed by an OS lock on `file`
    pub fn held(file: std::fs::File) -> Self {
        Self { _file: Some(file) }
    }
}

/// String key-value storage
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value; `None` when the key is absent
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value, replacing any previous one
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete a key; deleting an absent key is not an error
    async fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Hold `key` against writers that share this backend's storage,
    /// including other processes. Backends private to one process hand out
    /// an empty guard.
    async fn lock(&self, _key: &str) -> Result<KeyLock, StorageError> {
        Ok(KeyLock::default())
    }
}
