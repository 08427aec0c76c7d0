//! Fan-out over a fixed list of browse categories.
//!
//! Each category runs its own search and owns its own `{books, loading,
//! error}` slot. Start times are staggered so the catalog does not see a
//! burst; beyond that the categories never wait on each other.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::adapters::{CatalogService, OrderBy, SearchParams};
use crate::config::ExploreSettings;
use crate::domain::Book;

/// Error shown for a category whose search failed
pub const CATEGORY_LOAD_FAILED: &str = "Failed to load books";

/// Default delay between consecutive category start times
pub const DEFAULT_STAGGER: Duration = Duration::from_millis(500);

/// Default results per category
pub const DEFAULT_CATEGORY_RESULTS: u32 = 10;

/// A named browse category backed by a fixed query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub key: String,
    pub title: String,
    pub query: String,
}

impl Category {
    pub fn new(key: impl Into<String>, title: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
            query: query.into(),
        }
    }
}

/// The stock browse categories
pub fn default_categories() -> Vec<Category> {
    vec![
        Category::new("fiction", "Popular Fiction", "subject:fiction"),
        Category::new("romance", "Romance", "subject:romance"),
        Category::new("history", "History", "subject:history"),
    ]
}

/// Load state of one category
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryState {
    pub books: Vec<Book>,
    pub loading: bool,
    pub error: Option<String>,
}

/// One category with its state
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryEntry {
    pub key: String,
    pub title: String,
    pub state: CategoryState,
}

/// All categories, in declaration order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryCache {
    entries: Vec<CategoryEntry>,
}

impl CategoryCache {
    fn new(categories: &[Category]) -> Self {
        Self {
            entries: categories
                .iter()
                .map(|c| CategoryEntry {
                    key: c.key.clone(),
                    title: c.title.clone(),
                    state: CategoryState::default(),
                })
                .collect(),
        }
    }

    /// State of a category by key
    pub fn get(&self, key: &str) -> Option<&CategoryState> {
        self.entries.iter().find(|e| e.key == key).map(|e| &e.state)
    }

    pub fn entries(&self) -> &[CategoryEntry] {
        &self.entries
    }

    /// Whether any category is still loading
    pub fn is_loading(&self) -> bool {
        self.entries.iter().any(|e| e.state.loading)
    }

    fn get_mut(&mut self, index: usize) -> Option<&mut CategoryState> {
        self.entries.get_mut(index).map(|e| &mut e.state)
    }
}

/// Predicate deciding which fetched books a category keeps
pub type BookFilter = Arc<dyn Fn(&Book) -> bool + Send + Sync>;

/// Loads every category independently
pub struct CategoryAggregator {
    catalog: Arc<dyn CatalogService>,
    categories: Arc<Vec<Category>>,
    stagger: Duration,
    max_results: u32,
    filter: BookFilter,
    state: Arc<watch::Sender<CategoryCache>>,

    /// Per-category request counters; a completion applies only if current
    epochs: Arc<Vec<AtomicU64>>,
}

impl CategoryAggregator {
    pub fn new(catalog: Arc<dyn CatalogService>, categories: Vec<Category>) -> Self {
        let (state_tx, _) = watch::channel(CategoryCache::new(&categories));
        let epochs = categories.iter().map(|_| AtomicU64::new(0)).collect();

        Self {
            catalog,
            categories: Arc::new(categories),
            stagger: DEFAULT_STAGGER,
            max_results: DEFAULT_CATEGORY_RESULTS,
            filter: Arc::new(Book::is_valid),
            state: Arc::new(state_tx),
            epochs: Arc::new(epochs),
        }
    }

    /// Apply stagger and result count from config
    pub fn with_settings(self, settings: &ExploreSettings) -> Self {
        self.with_stagger(Duration::from_millis(settings.stagger_ms))
            .with_max_results(settings.max_results)
    }

    pub fn with_stagger(mut self, stagger: Duration) -> Self {
        self.stagger = stagger;
        self
    }

    pub fn with_max_results(mut self, max_results: u32) -> Self {
        self.max_results = max_results;
        self
    }

    /// Replace the default validity predicate
    pub fn with_filter(mut self, filter: impl Fn(&Book) -> bool + Send + Sync + 'static) -> Self {
        self.filter = Arc::new(filter);
        self
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Start every category, the i-th one after `i * stagger`
    pub fn load_all(&self) -> Vec<JoinHandle<()>> {
        (0..self.categories.len())
            .map(|index| self.spawn_load(index, self.stagger * index as u32))
            .collect()
    }

    /// Reload a single category now. `None` for an unknown key.
    pub fn retry(&self, key: &str) -> Option<JoinHandle<()>> {
        let index = self.categories.iter().position(|c| c.key == key)?;
        info!(category = %key, "Retrying category");
        Some(self.spawn_load(index, Duration::ZERO))
    }

    /// Snapshot of every category
    pub fn state(&self) -> CategoryCache {
        self.state.borrow().clone()
    }

    /// Receiver that wakes on every change to any category
    pub fn subscribe(&self) -> watch::Receiver<CategoryCache> {
        self.state.subscribe()
    }

    fn spawn_load(&self, index: usize, delay: Duration) -> JoinHandle<()> {
        let job = LoadJob {
            catalog: self.catalog.clone(),
            categories: self.categories.clone(),
            index,
            max_results: self.max_results,
            filter: self.filter.clone(),
            state: self.state.clone(),
            epochs: self.epochs.clone(),
        };

        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            job.run().await;
        })
    }
}

/// Everything one category load needs, detached from the aggregator
struct LoadJob {
    catalog: Arc<dyn CatalogService>,
    categories: Arc<Vec<Category>>,
    index: usize,
    max_results: u32,
    filter: BookFilter,
    state: Arc<watch::Sender<CategoryCache>>,
    epochs: Arc<Vec<AtomicU64>>,
}

impl LoadJob {
    async fn run(self) {
        let category = &self.categories[self.index];
        let epoch = &self.epochs[self.index];

        let mut ticket = 0;
        self.state.send_modify(|cache| {
            ticket = epoch.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(slot) = cache.get_mut(self.index) {
                *slot = CategoryState {
                    books: Vec::new(),
                    loading: true,
                    error: None,
                };
            }
        });

        let params = SearchParams::new(category.query.clone())
            .with_max_results(self.max_results)
            .with_order_by(OrderBy::Relevance);
        debug!(service = self.catalog.name(), category = %category.key, "Loading category");
        let outcome = self.catalog.search(&params).await;

        self.state.send_if_modified(|cache| {
            if epoch.load(Ordering::SeqCst) != ticket {
                debug!(category = %category.key, "Discarding superseded category result");
                return false;
            }
            let Some(slot) = cache.get_mut(self.index) else {
                return false;
            };

            match outcome {
                Ok(books) => {
                    let fetched = books.len();
                    let books: Vec<Book> = books.into_iter().filter(|b| (self.filter)(b)).collect();
                    info!(category = %category.key, valid = books.len(), fetched, "Loaded category");
                    *slot = CategoryState {
                        books,
                        loading: false,
                        error: None,
                    };
                }
                Err(e) => {
                    warn!(category = %category.key, error = %e, "Failed to load category");
                    *slot = CategoryState {
                        books: Vec::new(),
                        loading: false,
                        error: Some(CATEGORY_LOAD_FAILED.to_string()),
                    };
                }
            }
            true
        });
    }
}
