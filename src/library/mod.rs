//! The user's persisted reading list.
//!
//! # Storage Layout
//!
//! ```text
//! ~/.shelfwise/
//! └── store/
//!     ├── <sha256(key)[0:16]>.json   # JSON array of SavedBook
//!     └── <sha256(key)[0:16]>.lock   # held across each read-modify-write
//! ```

pub mod store;

pub use store::{LibraryError, LibraryStore, SAVED_BOOKS_KEY};
