//! Open Library client for work, author and ratings lookups.
//!
//! - GET {base}/isbn/{isbn}.json        → edition with linked works
//! - GET {base}{work_key}.json          → work with linked authors
//! - GET {base}{author_key}.json        → author with optional bio
//! - GET {base}{work_key}/ratings.json  → rating summary

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::{RatingSummary, WorkRef, WorkService, WorkServiceError};
use crate::config::EnrichmentSettings;

/// Default API root
pub const DEFAULT_BASE_URL: &str = "https://openlibrary.org";

/// Open Library client
pub struct OpenLibraryClient {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct KeyRef {
    key: String,
}

#[derive(Debug, Deserialize)]
struct Edition {
    #[serde(default)]
    works: Vec<KeyRef>,
}

#[derive(Debug, Deserialize)]
struct WorkAuthor {
    author: KeyRef,
}

#[derive(Debug, Deserialize)]
struct Work {
    #[serde(default)]
    authors: Vec<WorkAuthor>,
}

/// Author bio is either a plain string or `{"type": ..., "value": ...}`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Bio {
    Text(String),
    Typed { value: String },
}

impl Bio {
    fn into_text(self) -> String {
        match self {
            Bio::Text(text) | Bio::Typed { value: text } => text,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Author {
    #[serde(default)]
    bio: Option<Bio>,
}

#[derive(Debug, Deserialize)]
struct Ratings {
    #[serde(default)]
    summary: Option<RatingsSummary>,
}

#[derive(Debug, Deserialize)]
struct RatingsSummary {
    #[serde(default)]
    average: Option<f64>,
    #[serde(default)]
    count: Option<u64>,
}

impl OpenLibraryClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Create from config
    pub fn from_settings(settings: &EnrichmentSettings) -> Self {
        Self::new(settings.base_url.clone())
    }

    /// GET a JSON document. Non-2xx and undecodable bodies are `None`.
    async fn fetch<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, WorkServiceError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            debug!(%url, status = status.as_u16(), "Lookup returned no data");
            return Ok(None);
        }

        match response.json::<T>().await {
            Ok(body) => Ok(Some(body)),
            Err(e) => {
                debug!(%url, error = %e, "Lookup returned malformed data");
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl WorkService for OpenLibraryClient {
    fn name(&self) -> &str {
        "open_library"
    }

    #[instrument(skip(self))]
    async fn work_for_isbn(&self, isbn: &str) -> Result<Option<WorkRef>, WorkServiceError> {
        let Some(edition) = self.fetch::<Edition>(&format!("/isbn/{}.json", isbn)).await? else {
            return Ok(None);
        };

        let Some(work_key) = edition.works.into_iter().next().map(|w| w.key) else {
            debug!("No works linked to ISBN");
            return Ok(None);
        };

        let Some(work) = self.fetch::<Work>(&format!("{}.json", work_key)).await? else {
            return Ok(None);
        };

        Ok(Some(WorkRef {
            key: work_key,
            author_keys: work.authors.into_iter().map(|a| a.author.key).collect(),
        }))
    }

    #[instrument(skip(self))]
    async fn author_bio(&self, author_key: &str) -> Result<Option<String>, WorkServiceError> {
        let author = self.fetch::<Author>(&format!("{}.json", author_key)).await?;

        Ok(author
            .and_then(|a| a.bio)
            .map(Bio::into_text)
            .filter(|bio| !bio.trim().is_empty()))
    }

    #[instrument(skip(self))]
    async fn work_ratings(&self, work_key: &str) -> Result<Option<RatingSummary>, WorkServiceError> {
        let ratings = self
            .fetch::<Ratings>(&format!("{}/ratings.json", work_key))
            .await?;

        Ok(ratings.and_then(|r| r.summary).map(|s| RatingSummary {
            average: s.average.unwrap_or(0.0),
            count: s.count.unwrap_or(0),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bio_variants() {
        let plain: Author = serde_json::from_str(r#"{"bio": "Born in Tacoma."}"#).unwrap();
        assert_eq!(plain.bio.unwrap().into_text(), "Born in Tacoma.");

        let typed: Author = serde_json::from_str(
            r#"{"bio": {"type": "/type/text", "value": "Born in Tacoma."}}"#,
        )
        .unwrap();
        assert_eq!(typed.bio.unwrap().into_text(), "Born in Tacoma.");

        let missing: Author = serde_json::from_str(r#"{"name": "X"}"#).unwrap();
        assert!(missing.bio.is_none());
    }

    #[test]
    fn test_work_authors_decode() {
        let work: Work = serde_json::from_str(
            r#"{"key": "/works/OL893415W", "authors": [{"author": {"key": "/authors/OL79034A"}, "type": {"key": "/type/author_role"}}]}"#,
        )
        .unwrap();
        assert_eq!(work.authors[0].author.key, "/authors/OL79034A");

        let edition: Edition = serde_json::from_str(r#"{"title": "Dune"}"#).unwrap();
        assert!(edition.works.is_empty());
    }

    #[test]
    fn test_ratings_decode() {
        let ratings: Ratings = serde_json::from_str(
            r#"{"summary": {"average": 4.2, "count": 117}, "counts": {"1": 2, "2": 3, "3": 10, "4": 40, "5": 62}}"#,
        )
        .unwrap();
        let summary = ratings.summary.unwrap();
        assert_eq!(summary.average, Some(4.2));
        assert_eq!(summary.count, Some(117));
    }

    #[test]
    fn test_base_url_trimmed() {
        let client = OpenLibraryClient::new("https://openlibrary.org/");
        assert_eq!(client.base_url, "https://openlibrary.org");
        assert_eq!(client.name(), "open_library");
    }
}
