//! Book records as the rest of the crate sees them.
//!
//! A [`Book`] is always built from an external catalog and carries defaults for
//! every field except its `id`. A [`SavedBook`] is a book the user kept, plus
//! the tracking fields the library store owns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Title used when the catalog does not provide one
pub const UNKNOWN_TITLE: &str = "Unknown Title";

/// Author used when the catalog does not provide any
pub const UNKNOWN_AUTHOR: &str = "Unknown Author";

/// Identifier kinds understood by the enrichment chain
pub const ISBN_13: &str = "ISBN_13";
pub const ISBN_10: &str = "ISBN_10";

/// An industry identifier attached to a catalog volume
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndustryIdentifier {
    /// Identifier kind, e.g. `ISBN_13`, `ISBN_10`, `OTHER`
    #[serde(rename = "type")]
    pub kind: String,

    /// The identifier value
    pub identifier: String,
}

impl IndustryIdentifier {
    pub fn new(kind: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            identifier: identifier.into(),
        }
    }

    /// Whether this identifier is an ISBN-10 or ISBN-13
    pub fn is_isbn(&self) -> bool {
        self.kind == ISBN_13 || self.kind == ISBN_10
    }
}

/// A catalog book.
///
/// `id` never changes once assigned. An empty `id` means the book has no
/// catalog identity (e.g. the placeholder shown when nothing was selected).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Book {
    pub id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub description: Option<String>,
    pub thumbnail: Option<String>,
    /// Free-form; not guaranteed to parse as a date
    pub published_date: String,
    pub page_count: u32,
    pub categories: Vec<String>,
    /// 0 means "no rating"
    pub average_rating: f64,
    pub ratings_count: u64,
    pub language: String,
    pub preview_link: String,
    pub info_link: String,
    pub author_bio: Option<String>,
    pub industry_identifiers: Vec<IndustryIdentifier>,

    /// Set while enrichment is running. Never persisted.
    #[serde(skip)]
    pub is_enhancing: bool,
}

impl Book {
    /// Create a book with the given identity and defaults everywhere else
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            language: "en".to_string(),
            ..Default::default()
        }
    }

    /// Stand-in record used when no book was provided
    pub fn placeholder() -> Self {
        Self {
            title: UNKNOWN_TITLE.to_string(),
            authors: vec![UNKNOWN_AUTHOR.to_string()],
            language: "en".to_string(),
            ..Default::default()
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.authors.push(author.into());
        self
    }

    pub fn with_identifier(mut self, kind: &str, identifier: impl Into<String>) -> Self {
        self.industry_identifiers
            .push(IndustryIdentifier::new(kind, identifier));
        self
    }

    /// Whether the book has a catalog identity
    pub fn has_id(&self) -> bool {
        !self.id.is_empty()
    }

    /// The ISBN to look the book up by: ISBN-13 first, ISBN-10 otherwise.
    pub fn isbn(&self) -> Option<&str> {
        let find = |kind: &str| {
            self.industry_identifiers
                .iter()
                .find(|id| id.kind == kind && !id.identifier.trim().is_empty())
                .map(|id| id.identifier.as_str())
        };

        find(ISBN_13).or_else(|| find(ISBN_10))
    }

    /// Both ISBN variants, when present
    pub fn isbns(&self) -> (Option<&str>, Option<&str>) {
        let find = |kind: &str| {
            self.industry_identifiers
                .iter()
                .find(|id| id.kind == kind)
                .map(|id| id.identifier.as_str())
        };
        (find(ISBN_10), find(ISBN_13))
    }

    /// Whether the book carries at least one ISBN-10/13 identifier
    pub fn has_isbn(&self) -> bool {
        self.industry_identifiers.iter().any(IndustryIdentifier::is_isbn)
    }

    /// A book is displayable when it has an id, a title and a named author.
    pub fn is_valid(&self) -> bool {
        !self.id.trim().is_empty()
            && !self.title.trim().is_empty()
            && self.authors.iter().any(|a| !a.trim().is_empty())
    }

    /// Whether the book has a meaningful rating
    pub fn has_rating(&self) -> bool {
        self.average_rating > 0.0
    }
}

/// A book in the user's persisted list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedBook {
    #[serde(flatten)]
    pub book: Book,

    /// When the book was first saved
    pub saved_at: DateTime<Utc>,

    /// Percent read, 0-100
    #[serde(default)]
    pub read_progress: u8,

    /// Last time progress changed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_read_at: Option<DateTime<Utc>>,
}

impl SavedBook {
    /// Track a book saved for the first time at `now`
    pub fn new(book: Book, now: DateTime<Utc>) -> Self {
        Self {
            book: Book {
                is_enhancing: false,
                ..book
            },
            saved_at: now,
            read_progress: 0,
            last_read_at: Some(now),
        }
    }

    pub fn id(&self) -> &str {
        &self.book.id
    }
}

impl std::ops::Deref for SavedBook {
    type Target = Book;

    fn deref(&self) -> &Book {
        &self.book
    }
}
