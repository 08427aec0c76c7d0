//! Saved-books subcommands.
//!
//! Provides commands to:
//! - `list`: Show every saved book, most recently saved first
//! - `add`: Look a book up by ISBN and save it
//! - `remove`: Drop a saved book
//! - `progress`: Record how far into a book you are
//! - `recent`: Show books with reading activity
//! - `clear`: Drop every saved book

use anyhow::{Context, Result};
use clap::Subcommand;

use super::{print_book_table, Services};
use crate::domain::text::truncate;

/// Saved-books subcommands
#[derive(Subcommand, Debug)]
pub enum SavedCommands {
    /// List saved books
    List,

    /// Save a book by ISBN
    Add {
        /// ISBN-10 or ISBN-13
        isbn: String,
    },

    /// Remove a saved book
    Remove {
        /// Book ID
        id: String,
    },

    /// Set read progress (percent, clamped to 0-100)
    Progress {
        /// Book ID
        id: String,

        /// Percent read
        #[arg(allow_negative_numbers = true)]
        percent: i32,
    },

    /// Show recently read books
    Recent {
        /// Maximum number of books
        #[arg(short, long, default_value = "5")]
        limit: usize,
    },

    /// Remove all saved books
    Clear,
}

/// Execute a saved-books subcommand
pub async fn execute(services: &Services, command: SavedCommands) -> Result<()> {
    let library = &services.library;

    match command {
        SavedCommands::List => {
            let books = library.list().await;
            if books.is_empty() {
                println!("No saved books.");
                return Ok(());
            }

            println!("{} saved book(s):\n", books.len());
            print_book_table(books.iter().map(|b| &b.book));
        }

        SavedCommands::Add { isbn } => {
            let book = services
                .catalog
                .lookup_isbn(&isbn)
                .await?
                .with_context(|| format!("No book found for ISBN {}", isbn))?;

            library.save(&book).await?;
            println!("Saved: {} ({})", book.title, book.id);
        }

        SavedCommands::Remove { id } => {
            let title = library.get(&id).await.map(|b| b.title.clone());
            library.remove(&id).await?;

            match title {
                Some(title) => println!("Removed: {}", title),
                None => println!("Not saved: {}", id),
            }
        }

        SavedCommands::Progress { id, percent } => {
            if !library.is_saved(&id).await {
                anyhow::bail!("Not saved: {}", id);
            }

            library.update_progress(&id, percent).await?;
            if let Some(book) = library.get(&id).await {
                println!("{}: {}% read", book.title, book.read_progress);
            }
        }

        SavedCommands::Recent { limit } => {
            let books = library.recently_read(limit).await;
            if books.is_empty() {
                println!("Nothing read yet.");
                return Ok(());
            }

            println!("{:<14} {:<40} {:>8} {:<20}", "ID", "TITLE", "PROGRESS", "LAST READ");
            println!("{}", "-".repeat(85));
            for book in &books {
                let last_read = book
                    .last_read_at
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_default();
                println!(
                    "{:<14} {:<40} {:>7}% {:<20}",
                    book.id(),
                    truncate(&book.title, 37),
                    book.read_progress,
                    last_read
                );
            }
        }

        SavedCommands::Clear => {
            library.clear().await?;
            println!("All saved books cleared.");
        }
    }

    Ok(())
}
