//! Category Integration Tests
//!
//! Staggered start times, per-category failure isolation and retry.

mod common;

use std::time::Duration;

use tokio::time::Instant;

use common::{book, FakeCatalog};
use shelfwise::core::categories::CATEGORY_LOAD_FAILED;
use shelfwise::core::{default_categories, CategoryAggregator};
use shelfwise::domain::Book;

fn stock_catalog() -> std::sync::Arc<FakeCatalog> {
    let catalog = FakeCatalog::new();
    catalog.respond(
        "subject:fiction",
        vec![book("f1", "Dune", "9780441013593")],
    );
    catalog.respond(
        "subject:romance",
        vec![book("r1", "Emma", "9780141439587")],
    );
    catalog.respond(
        "subject:history",
        vec![book("h1", "SPQR", "9781631492228")],
    );
    catalog
}

#[tokio::test(start_paused = true)]
async fn test_starts_are_staggered() {
    let catalog = stock_catalog();
    let aggregator = CategoryAggregator::new(catalog.clone(), default_categories());

    let start = Instant::now();
    for handle in aggregator.load_all() {
        handle.await.unwrap();
    }

    let calls = catalog.call_times();
    let queries: Vec<&str> = calls.iter().map(|(q, _)| q.as_str()).collect();
    assert_eq!(
        queries,
        vec!["subject:fiction", "subject:romance", "subject:history"]
    );

    for (index, (query, at)) in calls.iter().enumerate() {
        let offset = (*at - start).as_millis();
        let expected = 500 * index as u128;
        assert!(
            (expected..=expected + 1).contains(&offset),
            "{} started at {}ms, expected {}ms",
            query,
            offset,
            expected
        );
    }

    let cache = aggregator.state();
    assert!(!cache.is_loading());
    for key in ["fiction", "romance", "history"] {
        let state = cache.get(key).unwrap();
        assert_eq!(state.books.len(), 1, "{}", key);
        assert!(state.error.is_none());
    }
}

#[tokio::test(start_paused = true)]
async fn test_one_failure_leaves_others_intact() {
    let catalog = stock_catalog();
    catalog.fail("subject:romance", 500);
    let aggregator = CategoryAggregator::new(catalog.clone(), default_categories());

    for handle in aggregator.load_all() {
        handle.await.unwrap();
    }

    let cache = aggregator.state();
    let romance = cache.get("romance").unwrap();
    assert!(romance.books.is_empty());
    assert!(!romance.loading);
    assert_eq!(romance.error.as_deref(), Some(CATEGORY_LOAD_FAILED));

    assert_eq!(cache.get("fiction").unwrap().books.len(), 1);
    assert_eq!(cache.get("history").unwrap().books.len(), 1);
    assert!(cache.get("history").unwrap().error.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_retry_reloads_single_category() {
    let catalog = stock_catalog();
    catalog.fail("subject:history", 503);
    let aggregator = CategoryAggregator::new(catalog.clone(), default_categories());

    for handle in aggregator.load_all() {
        handle.await.unwrap();
    }
    assert!(aggregator.state().get("history").unwrap().error.is_some());

    catalog.respond(
        "subject:history",
        vec![book("h1", "SPQR", "9781631492228")],
    );
    aggregator.retry("history").unwrap().await.unwrap();

    let cache = aggregator.state();
    let history = cache.get("history").unwrap();
    assert!(history.error.is_none());
    assert_eq!(history.books[0].id, "h1");
    assert_eq!(catalog.calls().len(), 4);

    assert!(aggregator.retry("poetry").is_none());
}

#[tokio::test(start_paused = true)]
async fn test_invalid_books_are_filtered() {
    let catalog = FakeCatalog::new();
    let mut anonymous = Book::new("f2", "Anonymous Work");
    anonymous.authors.clear();
    catalog.respond(
        "subject:fiction",
        vec![book("f1", "Dune", "9780441013593"), anonymous],
    );
    let aggregator = CategoryAggregator::new(catalog.clone(), default_categories());

    for handle in aggregator.load_all() {
        handle.await.unwrap();
    }
    let fiction = aggregator.state().get("fiction").unwrap().clone();
    assert_eq!(fiction.books.len(), 1);
    assert_eq!(fiction.books[0].id, "f1");

    let only_long = CategoryAggregator::new(catalog.clone(), default_categories())
        .with_stagger(Duration::ZERO)
        .with_filter(|b| b.title.len() > 4);
    for handle in only_long.load_all() {
        handle.await.unwrap();
    }
    let fiction = only_long.state().get("fiction").unwrap().clone();
    assert_eq!(fiction.books.len(), 1);
    assert_eq!(fiction.books[0].id, "f2");
}
