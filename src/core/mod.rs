//! Asynchronous coordination between user input and the remote services.
//!
//! This module contains:
//! - Debouncer: stabilizes rapidly changing input
//! - SearchSession: debounced, last-query-wins catalog search
//! - BookEnricher: background enrichment guarded by book identity
//! - CategoryAggregator: staggered, independent per-category searches

pub mod categories;
pub mod debounce;
pub mod enrichment;
pub mod search;

// Re-export commonly used types
pub use categories::{default_categories, Category, CategoryAggregator, CategoryCache, CategoryState};
pub use debounce::Debouncer;
pub use enrichment::{enrich, BookEnricher, Enrichment, EnrichmentState, ENHANCEMENT_FAILED};
pub use search::{SearchOptions, SearchSession, SearchState};
