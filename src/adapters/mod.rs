//! Adapter interfaces for the two remote book services.
//!
//! - `CatalogService`: free-text search over a book catalog (Google Books)
//! - `WorkService`: work/author/ratings lookups keyed by ISBN (Open Library)
//!
//! Orchestrators only see these traits, so tests drive them with in-process
//! fakes and the CLI wires in the HTTP clients.

pub mod google_books;
pub mod open_library;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Book;

pub use google_books::GoogleBooksClient;
pub use open_library::OpenLibraryClient;

/// Default number of results per search request
pub const DEFAULT_MAX_RESULTS: u32 = 20;

/// Result ordering for catalog searches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderBy {
    #[default]
    Relevance,
    Newest,
}

impl OrderBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderBy::Relevance => "relevance",
            OrderBy::Newest => "newest",
        }
    }
}

/// Kind of printed material to search
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrintType {
    All,
    #[default]
    Books,
    Magazines,
}

impl PrintType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrintType::All => "all",
            PrintType::Books => "books",
            PrintType::Magazines => "magazines",
        }
    }
}

/// A catalog search request
#[derive(Debug, Clone, PartialEq)]
pub struct SearchParams {
    pub query: String,
    pub max_results: u32,
    pub start_index: Option<u32>,
    pub order_by: OrderBy,
    pub print_type: PrintType,
}

impl SearchParams {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            max_results: DEFAULT_MAX_RESULTS,
            start_index: None,
            order_by: OrderBy::default(),
            print_type: PrintType::default(),
        }
    }

    pub fn with_max_results(mut self, max_results: u32) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_order_by(mut self, order_by: OrderBy) -> Self {
        self.order_by = order_by;
        self
    }

    pub fn with_start_index(mut self, start_index: u32) -> Self {
        self.start_index = Some(start_index);
        self
    }
}

/// Errors from the catalog service. The display text is what users see.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("API key invalid or quota exceeded. Please check your configuration.")]
    Forbidden,

    #[error("Too many requests. Please try again later.")]
    RateLimited,

    #[error("HTTP error! status: {0}")]
    Http(u16),

    #[error("Failed to fetch books. Please try again.")]
    Transport(#[source] reqwest::Error),

    #[error("Unexpected catalog response: {0}")]
    Decode(String),
}

impl CatalogError {
    /// Map a non-success HTTP status to its error
    pub fn from_status(status: u16) -> Self {
        match status {
            403 => CatalogError::Forbidden,
            429 => CatalogError::RateLimited,
            other => CatalogError::Http(other),
        }
    }
}

/// Free-text book search
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// Human-readable service name
    fn name(&self) -> &str;

    /// Search the catalog. Only books carrying an ISBN are returned.
    async fn search(&self, params: &SearchParams) -> Result<Vec<Book>, CatalogError>;

    /// Look a single book up by ISBN (hyphens and spaces are ignored)
    async fn lookup_isbn(&self, isbn: &str) -> Result<Option<Book>, CatalogError> {
        let clean: String = isbn
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-')
            .collect();
        if clean.is_empty() {
            return Ok(None);
        }

        let params = SearchParams::new(format!("isbn:{}", clean)).with_max_results(1);
        Ok(self.search(&params).await?.into_iter().next())
    }
}

/// A resolved work and the authors linked to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkRef {
    /// Work key, e.g. `/works/OL893415W`
    pub key: String,

    /// Author keys, e.g. `/authors/OL79034A`; may be empty
    pub author_keys: Vec<String>,
}

/// Aggregate rating for a work
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingSummary {
    pub average: f64,
    pub count: u64,
}

/// Errors from the work enrichment service
#[derive(Debug, Error)]
pub enum WorkServiceError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected response: {0}")]
    Decode(String),
}

/// Secondary lookups used to enrich a catalog book.
///
/// Absent data (404, empty lists, non-2xx responses) is `Ok(None)`. `Err` is
/// reserved for failures to reach the service at all.
#[async_trait]
pub trait WorkService: Send + Sync {
    fn name(&self) -> &str;

    /// Resolve an ISBN to its work and author keys
    async fn work_for_isbn(&self, isbn: &str) -> Result<Option<WorkRef>, WorkServiceError>;

    /// Fetch an author's biography
    async fn author_bio(&self, author_key: &str) -> Result<Option<String>, WorkServiceError>;

    /// Fetch the rating summary of a work
    async fn work_ratings(&self, work_key: &str) -> Result<Option<RatingSummary>, WorkServiceError>;
}
