//! Google Books volumes API client.
//!
//! Endpoint: GET {base}/volumes?q=...&maxResults=...&printType=...&orderBy=...
//! Auth: optional `key` query parameter

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use super::{CatalogError, CatalogService, SearchParams};
use crate::config::CatalogSettings;
use crate::domain::text::{sanitize_description, secure_url};
use crate::domain::{Book, IndustryIdentifier, UNKNOWN_AUTHOR, UNKNOWN_TITLE};

/// Default API root
pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/books/v1";

/// Google Books client
pub struct GoogleBooksClient {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

/// Response from the volumes endpoint
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumesResponse {
    #[serde(default)]
    pub total_items: u64,
    #[serde(default)]
    pub items: Option<Vec<VolumeItem>>,
}

/// One catalog volume
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeItem {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub volume_info: Option<VolumeInfo>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VolumeInfo {
    pub title: Option<String>,
    pub authors: Option<Vec<String>>,
    pub published_date: Option<String>,
    pub description: Option<String>,
    pub industry_identifiers: Option<Vec<IndustryIdentifier>>,
    pub page_count: Option<u32>,
    pub categories: Option<Vec<String>>,
    pub average_rating: Option<f64>,
    pub ratings_count: Option<u64>,
    pub image_links: Option<ImageLinks>,
    pub language: Option<String>,
    pub preview_link: Option<String>,
    pub info_link: Option<String>,
}

/// Cover image variants, smallest to largest
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageLinks {
    pub small_thumbnail: Option<String>,
    pub thumbnail: Option<String>,
    pub small: Option<String>,
    pub medium: Option<String>,
    pub large: Option<String>,
    pub extra_large: Option<String>,
}

impl ImageLinks {
    /// The largest available image, served over https
    pub fn best(&self) -> Option<String> {
        [
            &self.extra_large,
            &self.large,
            &self.medium,
            &self.thumbnail,
            &self.small,
            &self.small_thumbnail,
        ]
        .into_iter()
        .flatten()
        .find_map(|url| secure_url(url))
    }
}

impl VolumeItem {
    /// Convert to a `Book`, filling defaults. Items without an id are dropped.
    pub fn into_book(self) -> Option<Book> {
        let id = self.id.filter(|id| !id.trim().is_empty())?;
        let info = self.volume_info.unwrap_or_default();

        Some(Book {
            id,
            title: info
                .title
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
            authors: info
                .authors
                .filter(|a| !a.is_empty())
                .unwrap_or_else(|| vec![UNKNOWN_AUTHOR.to_string()]),
            description: info
                .description
                .map(|d| sanitize_description(&d))
                .filter(|d| !d.is_empty()),
            thumbnail: info.image_links.and_then(|links| links.best()),
            published_date: info.published_date.unwrap_or_default(),
            page_count: info.page_count.unwrap_or(0),
            categories: info.categories.unwrap_or_default(),
            average_rating: 0.0,
            ratings_count: 0,
            language: info.language.unwrap_or_else(|| "en".to_string()),
            preview_link: info.preview_link.unwrap_or_default(),
            info_link: info.info_link.unwrap_or_default(),
            author_bio: None,
            industry_identifiers: info.industry_identifiers.unwrap_or_default(),
            is_enhancing: false,
        })
    }
}

impl VolumesResponse {
    /// Books carrying at least one ISBN; the rest are dropped
    pub fn into_books(self) -> Vec<Book> {
        let matched = self.total_items;
        let items = self.items.unwrap_or_default();
        let total = items.len();

        let books: Vec<Book> = items
            .into_iter()
            .filter_map(VolumeItem::into_book)
            .filter(Book::has_isbn)
            .collect();

        debug!(matched, total, with_isbn = books.len(), "Filtered catalog items");
        books
    }
}

impl GoogleBooksClient {
    /// Create a client against `base_url`
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            client: reqwest::Client::new(),
        }
    }

    /// Create from config
    pub fn from_settings(settings: &CatalogSettings) -> Self {
        if settings.api_key.is_none() {
            warn!("Google Books API key not configured. Rate limits may apply.");
        }
        Self::new(settings.base_url.clone(), settings.api_key.clone())
    }

    /// Query string pairs for a request
    fn query_pairs(&self, params: &SearchParams) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("q", params.query.clone()),
            ("maxResults", params.max_results.to_string()),
            ("printType", params.print_type.as_str().to_string()),
            ("orderBy", params.order_by.as_str().to_string()),
        ];

        if let Some(start) = params.start_index.filter(|s| *s > 0) {
            pairs.push(("startIndex", start.to_string()));
        }
        if let Some(ref key) = self.api_key {
            pairs.push(("key", key.clone()));
        }

        pairs
    }
}

#[async_trait]
impl CatalogService for GoogleBooksClient {
    fn name(&self) -> &str {
        "google_books"
    }

    #[instrument(skip(self, params), fields(query = %params.query))]
    async fn search(&self, params: &SearchParams) -> Result<Vec<Book>, CatalogError> {
        if params.query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/volumes", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .query(&self.query_pairs(params))
            .send()
            .await
            .map_err(CatalogError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Catalog search failed");
            return Err(CatalogError::from_status(status.as_u16()));
        }

        let body: VolumesResponse = response
            .json()
            .await
            .map_err(|e| CatalogError::Decode(e.to_string()))?;

        Ok(body.into_books())
    }
}
