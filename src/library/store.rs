//! Persisted list of saved books.
//!
//! The whole list lives as one JSON array under [`SAVED_BOOKS_KEY`]. Every
//! mutation reads the entire blob, changes the list in memory and writes the
//! entire blob back. Each cycle runs under two locks: an async mutex orders
//! calls on one `LibraryStore`, and the backend's key lock (an OS file lock
//! for [`FileStore`](crate::storage::FileStore)) orders it against other
//! stores and other processes sharing the same directory. No cycle can lose
//! another's update.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::domain::{Book, SavedBook};
use crate::storage::{KeyValueStore, StorageError};

/// Storage key holding the saved-books blob
pub const SAVED_BOOKS_KEY: &str = "shelfwise:saved_books";

/// Errors from library mutations
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("Failed to save book: {0}")]
    Save(#[source] StorageError),

    #[error("Failed to remove book: {0}")]
    Remove(#[source] StorageError),

    #[error("Failed to update read progress: {0}")]
    Progress(#[source] StorageError),

    #[error("Failed to clear saved books: {0}")]
    Clear(#[source] StorageError),
}

/// The user's saved books, backed by a key-value store
pub struct LibraryStore {
    kv: Arc<dyn KeyValueStore>,

    /// Orders read-modify-write cycles within this process
    write_lock: Mutex<()>,
}

impl LibraryStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            write_lock: Mutex::new(()),
        }
    }

    /// Read the raw list in stored order. Any failure reads as empty.
    async fn load(&self) -> Vec<SavedBook> {
        let raw = match self.kv.get(SAVED_BOOKS_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!(error = %e, "Failed to read saved books, treating as empty");
                return Vec::new();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(books) => books,
            Err(e) => {
                warn!(error = %e, "Saved books blob is malformed, treating as empty");
                Vec::new()
            }
        }
    }

    async fn store(&self, books: &[SavedBook]) -> Result<(), StorageError> {
        let json = serde_json::to_string(books)
            .map_err(|e| StorageError::Unavailable(format!("serialize saved books: {}", e)))?;
        self.kv.set(SAVED_BOOKS_KEY, &json).await
    }

    /// All saved books, most recently saved first
    pub async fn list(&self) -> Vec<SavedBook> {
        let mut books = self.load().await;
        books.sort_by(|a, b| b.saved_at.cmp(&a.saved_at));
        books
    }

    /// A saved book by id
    pub async fn get(&self, id: &str) -> Option<SavedBook> {
        self.load().await.into_iter().find(|b| b.id() == id)
    }

    /// Whether a book with this id is saved
    pub async fn is_saved(&self, id: &str) -> bool {
        self.load().await.iter().any(|b| b.id() == id)
    }

    /// Books with reading activity, most recent first
    pub async fn recently_read(&self, limit: usize) -> Vec<SavedBook> {
        let mut books: Vec<SavedBook> = self
            .load()
            .await
            .into_iter()
            .filter(|b| b.last_read_at.is_some())
            .collect();

        books.sort_by(|a, b| b.last_read_at.cmp(&a.last_read_at));
        books.truncate(limit);
        books
    }

    /// Save a book.
    ///
    /// A book already in the list gets its catalog fields replaced while its
    /// progress and timestamps are kept. A new book goes to the head of the
    /// list with progress 0.
    pub async fn save(&self, book: &Book) -> Result<(), LibraryError> {
        self.save_at(book, Utc::now()).await
    }

    pub(crate) async fn save_at(&self, book: &Book, now: DateTime<Utc>) -> Result<(), LibraryError> {
        let _guard = self.write_lock.lock().await;
        let _held = self.kv.lock(SAVED_BOOKS_KEY).await.map_err(LibraryError::Save)?;
        let mut books = self.load().await;

        if let Some(existing) = books.iter_mut().find(|b| b.id() == book.id) {
            existing.book = Book {
                is_enhancing: false,
                ..book.clone()
            };
            debug!(id = %book.id, "Updated saved book");
        } else {
            books.insert(0, SavedBook::new(book.clone(), now));
            debug!(id = %book.id, "Added saved book");
        }

        self.store(&books).await.map_err(LibraryError::Save)?;
        info!(title = %book.title, "Book saved");
        Ok(())
    }

    /// Remove a book by id. Unknown ids are ignored.
    pub async fn remove(&self, id: &str) -> Result<(), LibraryError> {
        let _guard = self.write_lock.lock().await;
        let _held = self.kv.lock(SAVED_BOOKS_KEY).await.map_err(LibraryError::Remove)?;
        let mut books = self.load().await;
        let before = books.len();
        books.retain(|b| b.id() != id);

        if books.len() == before {
            debug!(%id, "Remove requested for unsaved book");
        }

        self.store(&books).await.map_err(LibraryError::Remove)?;
        info!(%id, "Book removed");
        Ok(())
    }

    /// Set read progress, clamped to 0..=100, and stamp `last_read_at`.
    /// Unknown ids are ignored.
    pub async fn update_progress(&self, id: &str, progress: i32) -> Result<(), LibraryError> {
        let _guard = self.write_lock.lock().await;
        let _held = self
            .kv
            .lock(SAVED_BOOKS_KEY)
            .await
            .map_err(LibraryError::Progress)?;
        let mut books = self.load().await;

        let Some(book) = books.iter_mut().find(|b| b.id() == id) else {
            debug!(%id, "Progress update for unsaved book ignored");
            return Ok(());
        };

        book.read_progress = progress.clamp(0, 100) as u8;
        book.last_read_at = Some(Utc::now());
        let clamped = book.read_progress;

        self.store(&books).await.map_err(LibraryError::Progress)?;
        info!(%id, progress = clamped, "Read progress updated");
        Ok(())
    }

    /// Drop every saved book
    pub async fn clear(&self) -> Result<(), LibraryError> {
        let _guard = self.write_lock.lock().await;
        let _held = self.kv.lock(SAVED_BOOKS_KEY).await.map_err(LibraryError::Clear)?;
        self.kv
            .remove(SAVED_BOOKS_KEY)
            .await
            .map_err(LibraryError::Clear)?;
        info!("All saved books cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use chrono::Duration;

    fn store() -> (LibraryStore, Arc<MemoryStore>) {
        let kv = Arc::new(MemoryStore::new());
        (LibraryStore::new(kv.clone()), kv)
    }

    fn book(id: &str, title: &str) -> Book {
        Book::new(id, title).with_author("Someone")
    }

    #[tokio::test]
    async fn test_list_sorted_by_saved_at_desc() {
        let (library, _) = store();
        let t0 = Utc::now();

        library.save_at(&book("a", "First"), t0).await.unwrap();
        library
            .save_at(&book("b", "Second"), t0 + Duration::seconds(10))
            .await
            .unwrap();
        library
            .save_at(&book("c", "Third"), t0 - Duration::seconds(10))
            .await
            .unwrap();

        let ids: Vec<String> = library.list().await.iter().map(|b| b.id().to_string()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[tokio::test]
    async fn test_resave_replaces_fields_keeps_tracking() {
        let (library, _) = store();
        let t0 = Utc::now() - Duration::days(1);

        library.save_at(&book("a", "Old Title"), t0).await.unwrap();
        library.update_progress("a", 40).await.unwrap();
        let before = library.get("a").await.unwrap();

        library.save(&book("a", "New Title")).await.unwrap();
        let after = library.get("a").await.unwrap();

        assert_eq!(library.list().await.len(), 1);
        assert_eq!(after.title, "New Title");
        assert_eq!(after.read_progress, 40);
        assert_eq!(after.saved_at, t0);
        assert_eq!(after.last_read_at, before.last_read_at);
    }

    #[tokio::test]
    async fn test_corrupt_blob_reads_empty() {
        let (library, kv) = store();
        kv.set(SAVED_BOOKS_KEY, "{not json").await.unwrap();

        assert!(library.list().await.is_empty());
        assert!(!library.is_saved("a").await);

        // A write over a corrupt blob starts a fresh list
        library.save(&book("a", "Recovered")).await.unwrap();
        assert_eq!(library.list().await.len(), 1);
    }

    #[tokio::test]
    async fn test_write_failure_propagates() {
        let (library, kv) = store();
        kv.fail_writes(true);

        let err = library.save(&book("a", "Title")).await.unwrap_err();
        assert!(matches!(err, LibraryError::Save(_)));
        assert!(err.to_string().starts_with("Failed to save book"));

        assert!(matches!(
            library.clear().await.unwrap_err(),
            LibraryError::Clear(_)
        ));
    }

    #[tokio::test]
    async fn test_progress_on_unknown_id_is_noop() {
        let (library, kv) = store();
        library.update_progress("ghost", 50).await.unwrap();

        assert!(kv.get(SAVED_BOOKS_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_saves_are_not_lost() {
        let (library, _) = store();
        let library = Arc::new(library);

        let mut handles = Vec::new();
        for i in 0..10 {
            let library = library.clone();
            handles.push(tokio::spawn(async move {
                library.save(&book(&format!("id-{}", i), "Title")).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(library.list().await.len(), 10);
    }
}
