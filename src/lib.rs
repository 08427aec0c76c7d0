//! shelfwise - book discovery with a persisted reading list
//!
//! Searches a remote book catalog as the user types, enriches the book on
//! screen with its author's biography and community ratings, and keeps a
//! list of saved books with reading progress.
//!
//! # Architecture
//!
//! Every surface is a small state machine publishing snapshots over a
//! `tokio::sync::watch` channel:
//! - Search results belong to the latest debounced query only
//! - Enrichment merges into a book only while that book is still shown
//! - Each browse category loads and fails on its own
//!
//! # Modules
//!
//! - `adapters`: Remote services (Google Books catalog, Open Library works)
//! - `core`: Debouncing, search sessions, enrichment, category loading
//! - `domain`: Data structures (Book, SavedBook) and display helpers
//! - `library`: The saved-books store
//! - `storage`: Key-value persistence backends
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Search the catalog
//! shelfwise search "dune"
//!
//! # Show an enriched book
//! shelfwise show 9780441013593
//!
//! # Save it and record progress
//! shelfwise saved add 9780441013593
//! shelfwise saved progress <id> 40
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod library;
pub mod storage;

// Re-export main types at crate root for convenience
pub use adapters::{CatalogError, CatalogService, GoogleBooksClient, OpenLibraryClient, WorkService};
pub use core::{BookEnricher, CategoryAggregator, Debouncer, SearchSession};
pub use domain::{Book, SavedBook};
pub use library::{LibraryError, LibraryStore};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
