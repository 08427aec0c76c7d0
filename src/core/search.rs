//! Live catalog search driven by a debounced query.
//!
//! Raw keystrokes go into [`SearchSession::set_query`]. Only the debounced
//! query triggers requests, and only the most recent debounced query may
//! publish results: each debounced change (and each `clear`) advances an
//! epoch, and a completing request applies its outcome only when its ticket
//! still matches the epoch.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::debounce::Debouncer;
use crate::adapters::{CatalogService, OrderBy, SearchParams, DEFAULT_MAX_RESULTS};
use crate::config::SearchSettings;
use crate::domain::Book;

/// Default quiet period before a query is searched
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Tuning for a search session
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub debounce: Duration,
    pub max_results: u32,
    pub order_by: OrderBy,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            max_results: DEFAULT_MAX_RESULTS,
            order_by: OrderBy::Relevance,
        }
    }
}

impl From<&SearchSettings> for SearchOptions {
    fn from(settings: &SearchSettings) -> Self {
        Self {
            debounce: Duration::from_millis(settings.debounce_ms),
            max_results: settings.max_results,
            order_by: settings.order_by,
        }
    }
}

/// What a search surface renders
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchState {
    /// Raw query as typed
    pub query: String,

    pub results: Vec<Book>,
    pub loading: bool,
    pub error: Option<String>,

    /// Debounced query that `results`/`error` belong to; `None` when idle
    pub searched: Option<String>,
}

/// One search surface's query, results and request lifecycle
pub struct SearchSession {
    debouncer: Debouncer<String>,
    state: Arc<watch::Sender<SearchState>>,
    epoch: Arc<AtomicU64>,
    driver: JoinHandle<()>,
}

impl SearchSession {
    /// Start a session. Must be called inside a tokio runtime.
    pub fn new(catalog: Arc<dyn CatalogService>, options: SearchOptions) -> Self {
        let debouncer = Debouncer::new(String::new(), options.debounce);
        let (state_tx, _) = watch::channel(SearchState::default());
        let state = Arc::new(state_tx);
        let epoch = Arc::new(AtomicU64::new(0));

        let driver = tokio::spawn(drive(
            catalog,
            options,
            debouncer.subscribe(),
            state.clone(),
            epoch.clone(),
        ));

        Self {
            debouncer,
            state,
            epoch,
            driver,
        }
    }

    /// Record newly typed text; a search follows once typing pauses
    pub fn set_query(&self, text: impl Into<String>) {
        let text = text.into();
        self.state.send_modify(|s| s.query = text.clone());
        self.debouncer.set(text);
    }

    /// Reset query and results now, dropping any pending or in-flight search
    pub fn clear(&self) {
        self.debouncer.reset(String::new());
        self.state.send_modify(|s| {
            self.epoch.fetch_add(1, Ordering::SeqCst);
            *s = SearchState::default();
        });
    }

    /// Snapshot of the current state
    pub fn state(&self) -> SearchState {
        self.state.borrow().clone()
    }

    /// Receiver that wakes on every state change
    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.state.subscribe()
    }
}

impl Drop for SearchSession {
    fn drop(&mut self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.driver.abort();
    }
}

/// React to each change of the debounced query
async fn drive(
    catalog: Arc<dyn CatalogService>,
    options: SearchOptions,
    mut debounced: watch::Receiver<String>,
    state: Arc<watch::Sender<SearchState>>,
    epoch: Arc<AtomicU64>,
) {
    while debounced.changed().await.is_ok() {
        let query = debounced.borrow_and_update().clone();

        if query.trim().is_empty() {
            state.send_modify(|s| {
                epoch.fetch_add(1, Ordering::SeqCst);
                s.results.clear();
                s.loading = false;
                s.error = None;
                s.searched = None;
            });
            continue;
        }

        let mut ticket = 0;
        state.send_modify(|s| {
            ticket = epoch.fetch_add(1, Ordering::SeqCst) + 1;
            s.loading = true;
            s.error = None;
        });

        let params = SearchParams::new(query.clone())
            .with_max_results(options.max_results)
            .with_order_by(options.order_by);

        tokio::spawn(run_search(
            catalog.clone(),
            params,
            state.clone(),
            epoch.clone(),
            ticket,
        ));
    }
}

/// Issue one request and apply its outcome if still current
async fn run_search(
    catalog: Arc<dyn CatalogService>,
    params: SearchParams,
    state: Arc<watch::Sender<SearchState>>,
    epoch: Arc<AtomicU64>,
    ticket: u64,
) {
    debug!(service = catalog.name(), query = %params.query, ticket, "Searching catalog");
    let outcome = catalog.search(&params).await;

    state.send_if_modified(|s| {
        if epoch.load(Ordering::SeqCst) != ticket {
            debug!(query = %params.query, "Discarding superseded search result");
            return false;
        }

        match outcome {
            Ok(books) => {
                info!(query = %params.query, count = books.len(), "Search completed");
                s.results = books;
                s.error = None;
            }
            Err(e) => {
                warn!(query = %params.query, error = %e, "Search failed");
                s.results.clear();
                s.error = Some(e.to_string());
            }
        }
        s.loading = false;
        s.searched = Some(params.query.clone());
        true
    });
}
