//! Book enrichment from a secondary work service.
//!
//! A displayed book is shown immediately and then enriched in the background:
//!
//! ```text
//! ISBN ─► work ─┬─► first author's bio   (optional)
//!               └─► rating summary       (optional)
//! ```
//!
//! Missing identifiers or works end the chain with no enrichment, which is not
//! an error. Optional steps swallow their own failures. A finished chain only
//! merges into the state if the state still shows the book the chain started
//! for, so a late result can never land on a different book.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::adapters::{WorkService, WorkServiceError};
use crate::domain::Book;

/// Message shown when enrichment fails unexpectedly
pub const ENHANCEMENT_FAILED: &str = "Failed to load book information";

/// Fields a work service can add to a book
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Enrichment {
    pub author_bio: Option<String>,
    pub average_rating: Option<f64>,
    pub ratings_count: Option<u64>,
}

impl Enrichment {
    pub fn is_empty(&self) -> bool {
        self.author_bio.is_none() && self.average_rating.is_none() && self.ratings_count.is_none()
    }

    /// Layer obtained fields over `book`; absent fields leave it untouched
    pub fn apply_to(&self, book: &mut Book) {
        if let Some(ref bio) = self.author_bio {
            book.author_bio = Some(bio.clone());
        }
        if let Some(average) = self.average_rating {
            book.average_rating = average;
        }
        if let Some(count) = self.ratings_count {
            book.ratings_count = count;
        }
    }
}

/// Turn a failed optional step into "no data"
fn optional<T>(step: &str, result: Result<Option<T>, WorkServiceError>) -> Option<T> {
    match result {
        Ok(value) => value,
        Err(e) => {
            warn!(step, error = %e, "Enrichment step failed, continuing");
            None
        }
    }
}

/// Run the lookup chain for one book.
#[instrument(skip(works, book), fields(service = works.name(), id = %book.id, title = %book.title))]
pub async fn enrich(works: &dyn WorkService, book: &Book) -> Enrichment {
    let mut enrichment = Enrichment::default();

    let Some(isbn) = book.isbn() else {
        debug!("No ISBN, nothing to enrich");
        return enrichment;
    };

    let Some(work) = optional("work", works.work_for_isbn(isbn).await) else {
        debug!(%isbn, "No work found for ISBN");
        return enrichment;
    };

    if let Some(author_key) = work.author_keys.first() {
        enrichment.author_bio = optional("author_bio", works.author_bio(author_key).await);
    } else {
        debug!(work = %work.key, "Work has no authors, skipping bio");
    }

    if let Some(ratings) = optional("ratings", works.work_ratings(&work.key).await) {
        if ratings.average > 0.0 {
            enrichment.average_rating = Some(ratings.average);
            enrichment.ratings_count = Some(ratings.count);
        }
    }

    enrichment
}

/// What a detail view renders
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichmentState {
    pub book: Book,
    pub is_enhancing: bool,
    pub error: Option<String>,
}

impl EnrichmentState {
    fn showing(book: Book) -> Self {
        Self {
            book,
            is_enhancing: false,
            error: None,
        }
    }

    fn set_enhancing(&mut self, enhancing: bool) {
        self.is_enhancing = enhancing;
        self.book.is_enhancing = enhancing;
    }
}

/// Drives enrichment for the book currently displayed
pub struct BookEnricher {
    works: Arc<dyn WorkService>,
    state: Arc<watch::Sender<EnrichmentState>>,

    /// The unenhanced input for the displayed book
    input: Mutex<Book>,

    /// Generation of the authoritative chain
    generation: Arc<AtomicU64>,
}

impl BookEnricher {
    pub fn new(works: Arc<dyn WorkService>) -> Self {
        let (state_tx, _) = watch::channel(EnrichmentState::showing(Book::placeholder()));

        Self {
            works,
            state: Arc::new(state_tx),
            input: Mutex::new(Book::placeholder()),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Display a book.
    ///
    /// A different id replaces the state with the unenhanced book and starts a
    /// new chain, whose handle is returned. The same id refreshes the catalog
    /// fields while keeping enrichment already obtained.
    pub fn show(&self, book: Option<Book>) -> Option<JoinHandle<()>> {
        let book = book.unwrap_or_else(Book::placeholder);
        let same_id = self.state.borrow().book.id == book.id;

        {
            let mut input = self.input.lock().unwrap_or_else(|e| e.into_inner());
            *input = book.clone();
        }

        if same_id {
            self.state.send_modify(|s| {
                s.book.title = book.title.clone();
                s.book.authors = book.authors.clone();
                s.book.thumbnail = book.thumbnail.clone();
                s.book.description = book.description.clone();
                s.book.published_date = book.published_date.clone();
            });
            return None;
        }

        info!(id = %book.id, title = %book.title, "Displayed book changed");
        self.state.send_modify(|s| {
            *s = EnrichmentState::showing(book.clone());
        });

        self.start(book)
    }

    /// Run the chain again for the displayed book
    pub fn retry_enhancement(&self) -> Option<JoinHandle<()>> {
        let book = self
            .input
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        info!(id = %book.id, "Retrying enhancement");
        self.start(book)
    }

    /// Snapshot of the current state
    pub fn state(&self) -> EnrichmentState {
        self.state.borrow().clone()
    }

    /// Receiver that wakes on every state change
    pub fn subscribe(&self) -> watch::Receiver<EnrichmentState> {
        self.state.subscribe()
    }

    fn start(&self, book: Book) -> Option<JoinHandle<()>> {
        if !book.has_id() {
            debug!("Book has no id, skipping enhancement");
            return None;
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_modify(|s| {
            s.set_enhancing(true);
            s.error = None;
        });

        Some(tokio::spawn(run_chain(
            self.works.clone(),
            self.state.clone(),
            self.generation.clone(),
            generation,
            book,
        )))
    }
}

/// Run one chain and fold its outcome into the state
async fn run_chain(
    works: Arc<dyn WorkService>,
    state: Arc<watch::Sender<EnrichmentState>>,
    latest: Arc<AtomicU64>,
    generation: u64,
    book: Book,
) {
    // A panic inside the chain surfaces here as a JoinError
    let chain = {
        let book = book.clone();
        tokio::spawn(async move { enrich(works.as_ref(), &book).await })
    };
    let outcome = chain.await;

    state.send_if_modified(|s| {
        let same_book = s.book.id == book.id;
        let current = latest.load(Ordering::SeqCst) == generation;

        match outcome {
            Ok(enrichment) if same_book => {
                enrichment.apply_to(&mut s.book);
                info!(
                    id = %book.id,
                    author_bio = enrichment.author_bio.is_some(),
                    average_rating = s.book.average_rating,
                    ratings_count = s.book.ratings_count,
                    "Applied enrichment"
                );
            }
            Ok(_) => {
                debug!(id = %book.id, showing = %s.book.id, "Discarding enrichment for a book no longer shown");
            }
            Err(e) => {
                error!(id = %book.id, error = %e, "Enhancement failed");
                if same_book && current {
                    // Book fields already shown for this id stay as they are
                    s.error = Some(ENHANCEMENT_FAILED.to_string());
                }
            }
        }

        if current {
            s.set_enhancing(false);
        }
        true
    });
}
