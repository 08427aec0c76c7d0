//! Shared fakes for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::time::Instant;

use shelfwise::adapters::{
    CatalogError, CatalogService, RatingSummary, SearchParams, WorkRef, WorkService,
    WorkServiceError,
};
use shelfwise::domain::{Book, ISBN_13};

/// A valid book with an ISBN-13
pub fn book(id: &str, title: &str, isbn: &str) -> Book {
    Book::new(id, title)
        .with_author("Frank Herbert")
        .with_identifier(ISBN_13, isbn)
}

enum Reply {
    Books(Vec<Book>),
    Status(u16),
}

struct Scripted {
    reply: Reply,
    delay: Duration,
}

/// Catalog answering from a per-query script. Unscripted queries find nothing.
#[derive(Default)]
pub struct FakeCatalog {
    script: Mutex<HashMap<String, Scripted>>,
    calls: Mutex<Vec<(String, Instant)>>,
}

impl FakeCatalog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, query: &str, books: Vec<Book>) {
        self.respond_after(query, Duration::ZERO, books);
    }

    pub fn respond_after(&self, query: &str, delay: Duration, books: Vec<Book>) {
        self.script.lock().unwrap().insert(
            query.to_string(),
            Scripted {
                reply: Reply::Books(books),
                delay,
            },
        );
    }

    pub fn fail(&self, query: &str, status: u16) {
        self.script.lock().unwrap().insert(
            query.to_string(),
            Scripted {
                reply: Reply::Status(status),
                delay: Duration::ZERO,
            },
        );
    }

    /// Queries searched so far, in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(q, _)| q.clone()).collect()
    }

    /// Queries with the instant each call started
    pub fn call_times(&self) -> Vec<(String, Instant)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CatalogService for FakeCatalog {
    fn name(&self) -> &str {
        "fake_catalog"
    }

    async fn search(&self, params: &SearchParams) -> Result<Vec<Book>, CatalogError> {
        self.calls
            .lock()
            .unwrap()
            .push((params.query.clone(), Instant::now()));

        let (reply, delay) = {
            let script = self.script.lock().unwrap();
            match script.get(&params.query) {
                Some(Scripted { reply: Reply::Books(books), delay }) => (Ok(books.clone()), *delay),
                Some(Scripted { reply: Reply::Status(status), delay }) => (Err(*status), *delay),
                None => (Ok(Vec::new()), Duration::ZERO),
            }
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        reply.map_err(CatalogError::from_status)
    }
}

/// Work service answering from fixed tables
#[derive(Default)]
pub struct FakeWorks {
    works: Mutex<HashMap<String, WorkRef>>,
    bios: Mutex<HashMap<String, Option<String>>>,
    ratings: Mutex<HashMap<String, RatingSummary>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    panic_on_lookup: AtomicBool,
    lookups: AtomicUsize,
}

impl FakeWorks {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register a work for an ISBN with one author
    pub fn add_work(&self, isbn: &str, work_key: &str, author_key: &str) {
        self.works.lock().unwrap().insert(
            isbn.to_string(),
            WorkRef {
                key: work_key.to_string(),
                author_keys: vec![author_key.to_string()],
            },
        );
    }

    pub fn set_bio(&self, author_key: &str, bio: &str) {
        self.bios
            .lock()
            .unwrap()
            .insert(author_key.to_string(), Some(bio.to_string()));
    }

    /// Make the bio lookup for this author fail
    pub fn fail_bio(&self, author_key: &str) {
        self.bios.lock().unwrap().insert(author_key.to_string(), None);
    }

    pub fn set_ratings(&self, work_key: &str, average: f64, count: u64) {
        self.ratings
            .lock()
            .unwrap()
            .insert(work_key.to_string(), RatingSummary { average, count });
    }

    /// Hold lookups for this ISBN until the returned handle is notified
    pub fn gate(&self, isbn: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates
            .lock()
            .unwrap()
            .insert(isbn.to_string(), gate.clone());
        gate
    }

    pub fn panic_on_lookup(&self, panic: bool) {
        self.panic_on_lookup.store(panic, Ordering::SeqCst);
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WorkService for FakeWorks {
    fn name(&self) -> &str {
        "fake_works"
    }

    async fn work_for_isbn(&self, isbn: &str) -> Result<Option<WorkRef>, WorkServiceError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);

        let gate = self.gates.lock().unwrap().get(isbn).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if self.panic_on_lookup.load(Ordering::SeqCst) {
            panic!("work lookup exploded");
        }

        Ok(self.works.lock().unwrap().get(isbn).cloned())
    }

    async fn author_bio(&self, author_key: &str) -> Result<Option<String>, WorkServiceError> {
        match self.bios.lock().unwrap().get(author_key) {
            Some(Some(bio)) => Ok(Some(bio.clone())),
            Some(None) => Err(WorkServiceError::Decode("author unavailable".to_string())),
            None => Ok(None),
        }
    }

    async fn work_ratings(&self, work_key: &str) -> Result<Option<RatingSummary>, WorkServiceError> {
        Ok(self.ratings.lock().unwrap().get(work_key).copied())
    }
}
