//! Text cleanup and display formatting for book fields.

use std::sync::OnceLock;

use chrono::{Datelike, Utc};
use regex::Regex;

use super::book::UNKNOWN_AUTHOR;

fn html_tag() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>").expect("valid regex"))
}

fn whitespace() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid regex"))
}

fn leading_parenthetical() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\(.*?\)\s*").expect("valid regex"))
}

// Only the final, unnested group; earlier parentheticals in the text stay
fn trailing_parenthetical() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s*\([^()]*\)\s*$").expect("valid regex"))
}

fn year_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(1[0-9]|20)\d{2}\b").expect("valid regex"))
}

/// Clean a catalog description for display.
///
/// Strips HTML tags, collapses whitespace and drops a leading or trailing
/// parenthetical such as "(Book 1 of the Dune series)".
pub fn sanitize_description(raw: &str) -> String {
    let text = html_tag().replace_all(raw.trim(), "");
    let text = whitespace().replace_all(&text, " ");
    let text = leading_parenthetical().replace(text.trim(), "");
    let text = trailing_parenthetical().replace(&text, "");
    text.trim().to_string()
}

/// Force an image URL onto https. Blank input yields `None`.
pub fn secure_url(url: &str) -> Option<String> {
    let url = url.trim();
    if url.is_empty() {
        return None;
    }

    match url.strip_prefix("http://") {
        Some(rest) => Some(format!("https://{}", rest)),
        None => Some(url.to_string()),
    }
}

/// Join authors for display: "A", "A and B", "A, B and C".
pub fn authors_display(authors: &[String]) -> String {
    let valid: Vec<&str> = authors
        .iter()
        .map(|a| a.trim())
        .filter(|a| !a.is_empty())
        .collect();

    match valid.as_slice() {
        [] => UNKNOWN_AUTHOR.to_string(),
        [one] => one.to_string(),
        [init @ .., last] => format!("{} and {}", init.join(", "), last),
    }
}

/// Extract a plausible publication year from a free-form date string.
pub fn publication_year(published_date: &str) -> Option<i32> {
    let max_year = Utc::now().year() + 10;
    let date = published_date.trim();
    if date.is_empty() {
        return None;
    }

    // Catalog dates are "YYYY", "YYYY-MM" or "YYYY-MM-DD" in the common case
    if let Some(year) = date.get(..4).and_then(|y| y.parse::<i32>().ok()) {
        if (1000..=max_year).contains(&year) {
            return Some(year);
        }
    }

    year_pattern()
        .find(date)
        .and_then(|m| m.as_str().parse::<i32>().ok())
        .filter(|year| (1000..=max_year).contains(year))
}

/// "N pages", or nothing for an unknown count
pub fn page_count_display(page_count: u32) -> Option<String> {
    (page_count > 0).then(|| format!("{} pages", page_count))
}

/// At most three non-blank categories, comma separated
pub fn categories_display(categories: &[String]) -> String {
    categories
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .take(3)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Truncate to `max_chars`, backing up to a word boundary when one is close.
pub fn truncate(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if max_chars == 0 || text.chars().count() <= max_chars {
        return text.to_string();
    }

    let cut: String = text.chars().take(max_chars).collect();
    match cut.rfind(' ') {
        Some(idx) if cut[..idx].chars().count() * 5 > max_chars * 4 => {
            format!("{}...", cut[..idx].trim_end())
        }
        _ => format!("{}...", cut.trim_end()),
    }
}
