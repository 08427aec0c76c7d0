//! Domain types for shelfwise.
//!
//! - Book: a catalog record, with defaults for every optional field
//! - SavedBook: a book in the persisted reading list
//! - text: cleanup and display helpers for book fields

pub mod book;
pub mod text;

// Re-export commonly used types
pub use book::{Book, IndustryIdentifier, SavedBook, ISBN_10, ISBN_13, UNKNOWN_AUTHOR, UNKNOWN_TITLE};
