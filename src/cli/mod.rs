//! Command-line interface for shelfwise.
//!
//! Provides commands for searching the catalog, showing an enriched book,
//! browsing categories, and managing the saved-books list.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use crate::adapters::{CatalogService, GoogleBooksClient, OpenLibraryClient, OrderBy, WorkService};
use crate::config::{self, ResolvedConfig};
use crate::core::{default_categories, BookEnricher, CategoryAggregator, SearchOptions, SearchSession};
use crate::domain::text::{
    authors_display, categories_display, page_count_display, publication_year, truncate,
};
use crate::domain::Book;
use crate::library::LibraryStore;
use crate::storage::FileStore;

pub mod saved;

/// shelfwise - search books, see who wrote them, keep a reading list
#[derive(Parser, Debug)]
#[command(name = "shelfwise")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Search the catalog
    Search {
        /// Search query
        query: String,

        /// Maximum number of results
        #[arg(short, long)]
        limit: Option<u32>,

        /// Result ordering
        #[arg(short, long, value_enum)]
        order: Option<Order>,
    },

    /// Show a book by ISBN, enriched with author bio and ratings
    Show {
        /// ISBN-10 or ISBN-13 (hyphens allowed)
        isbn: String,
    },

    /// Browse the stock categories
    Explore,

    /// Manage saved books
    Saved {
        #[command(subcommand)]
        command: saved::SavedCommands,
    },

    /// Show resolved configuration (debug)
    Config,
}

/// Result ordering for CLI (maps to OrderBy)
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Order {
    /// Most relevant first
    Relevance,

    /// Most recently published first
    Newest,
}

impl From<Order> for OrderBy {
    fn from(o: Order) -> Self {
        match o {
            Order::Relevance => OrderBy::Relevance,
            Order::Newest => OrderBy::Newest,
        }
    }
}

/// Long-lived components, built once and handed to each command
pub struct Services {
    pub config: ResolvedConfig,
    pub catalog: Arc<dyn CatalogService>,
    pub works: Arc<dyn WorkService>,
    pub library: Arc<LibraryStore>,
}

impl Services {
    /// Wire the HTTP clients and the file-backed library from config
    pub fn from_config(config: ResolvedConfig) -> Self {
        let catalog: Arc<dyn CatalogService> =
            Arc::new(GoogleBooksClient::from_settings(&config.catalog));
        let works: Arc<dyn WorkService> =
            Arc::new(OpenLibraryClient::from_settings(&config.enrichment));
        let store = FileStore::new(config.store_dir());
        let library = Arc::new(LibraryStore::new(Arc::new(store)));

        Self {
            config,
            catalog,
            works,
            library,
        }
    }
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let config = config::config()?.clone();
        let services = Services::from_config(config);

        match self.command {
            Commands::Search {
                query,
                limit,
                order,
            } => search(&services, &query, limit, order).await,
            Commands::Show { isbn } => show(&services, &isbn).await,
            Commands::Explore => explore(&services).await,
            Commands::Saved { command } => saved::execute(&services, command).await,
            Commands::Config => show_config(&services.config),
        }
    }
}

/// Print one line per book
pub(crate) fn print_book_table<'a>(books: impl IntoIterator<Item = &'a Book>) {
    println!("{:<14} {:<6} {:<40} {:<30}", "ID", "YEAR", "TITLE", "AUTHORS");
    println!("{}", "-".repeat(92));

    for book in books {
        let year = publication_year(&book.published_date)
            .map(|y| y.to_string())
            .unwrap_or_default();
        println!(
            "{:<14} {:<6} {:<40} {:<30}",
            book.id,
            year,
            truncate(&book.title, 37),
            truncate(&authors_display(&book.authors), 27)
        );
    }
}

/// Search the catalog through a search session
async fn search(
    services: &Services,
    query: &str,
    limit: Option<u32>,
    order: Option<Order>,
) -> Result<()> {
    if query.trim().is_empty() {
        println!("Enter a search term.");
        return Ok(());
    }

    let mut options = SearchOptions::from(&services.config.search);
    if let Some(limit) = limit {
        options.max_results = limit;
    }
    if let Some(order) = order {
        options.order_by = order.into();
    }

    let session = SearchSession::new(services.catalog.clone(), options);
    let mut updates = session.subscribe();
    session.set_query(query);

    let state = updates
        .wait_for(|s| !s.loading && s.searched.as_deref() == Some(query))
        .await
        .context("Search session ended unexpectedly")?
        .clone();

    if let Some(error) = state.error {
        anyhow::bail!("Search failed: {}", error);
    }

    if state.results.is_empty() {
        println!("No results found for: {}", query);
        return Ok(());
    }

    println!("Found {} result(s) for \"{}\":\n", state.results.len(), query);
    print_book_table(&state.results);

    Ok(())
}

/// Look a book up by ISBN, enrich it and print its details
async fn show(services: &Services, isbn: &str) -> Result<()> {
    let book = services
        .catalog
        .lookup_isbn(isbn)
        .await?
        .with_context(|| format!("No book found for ISBN {}", isbn))?;

    let enricher = BookEnricher::new(services.works.clone());
    if let Some(chain) = enricher.show(Some(book)) {
        chain.await.context("Enrichment task failed")?;
    }
    let state = enricher.state();
    let book = &state.book;

    println!("{}", book.title);
    println!("by {}", authors_display(&book.authors));
    println!();

    if let Some(year) = publication_year(&book.published_date) {
        println!("Published:   {}", year);
    }
    if let Some(pages) = page_count_display(book.page_count) {
        println!("Length:      {}", pages);
    }
    let categories = categories_display(&book.categories);
    if !categories.is_empty() {
        println!("Categories:  {}", categories);
    }
    let (isbn10, isbn13) = book.isbns();
    if let Some(isbn13) = isbn13 {
        println!("ISBN-13:     {}", isbn13);
    }
    if let Some(isbn10) = isbn10 {
        println!("ISBN-10:     {}", isbn10);
    }
    if book.has_rating() {
        println!(
            "Rating:      {:.1}/5 ({} ratings)",
            book.average_rating, book.ratings_count
        );
    }
    if services.library.is_saved(&book.id).await {
        println!("Saved:       yes");
    }

    if let Some(ref description) = book.description {
        println!("\n{}", truncate(description, 600));
    }
    if let Some(ref bio) = book.author_bio {
        println!("\nAbout the author:\n{}", truncate(bio, 600));
    }
    if let Some(ref error) = state.error {
        println!("\n{} (run again to retry)", error);
    }

    Ok(())
}

/// Load every category and print what each one found
async fn explore(services: &Services) -> Result<()> {
    let recent = services.library.recently_read(5).await;
    if !recent.is_empty() {
        println!("Recently read");
        for book in &recent {
            println!(
                "  {:<40} {:>3}%",
                truncate(&book.title, 37),
                book.read_progress
            );
        }
        println!();
    }

    let aggregator = CategoryAggregator::new(services.catalog.clone(), default_categories())
        .with_settings(&services.config.explore);

    for handle in aggregator.load_all() {
        handle.await.context("Category task failed")?;
    }

    for entry in aggregator.state().entries() {
        println!("{}", entry.title);
        match entry.state.error {
            Some(ref error) => println!("  {}", error),
            None if entry.state.books.is_empty() => println!("  (nothing found)"),
            None => {
                for book in &entry.state.books {
                    println!(
                        "  {:<14} {:<40} {}",
                        book.id,
                        truncate(&book.title, 37),
                        authors_display(&book.authors)
                    );
                }
            }
        }
        println!();
    }

    Ok(())
}

/// Show resolved configuration
fn show_config(config: &ResolvedConfig) -> Result<()> {
    println!("shelfwise configuration\n");
    println!("Home:          {}", config.home.display());
    println!(
        "Config file:   {}",
        config
            .config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none)".to_string())
    );
    println!("Catalog API:   {}", config.catalog.base_url);
    println!(
        "API key:       {}",
        if config.catalog.api_key.is_some() { "configured" } else { "not configured" }
    );
    println!("Enrichment:    {}", config.enrichment.base_url);
    println!("Debounce:      {} ms", config.search.debounce_ms);
    println!("Max results:   {}", config.search.max_results);
    println!("Order:         {}", config.search.order_by.as_str());
    println!("Stagger:       {} ms", config.explore.stagger_ms);

    Ok(())
}
