//! Category listing: enumerate the book identifiers filed under one
//! category page.
//!
//! Grounded on the original scraper's `CategoryExtractor.extract_category_books`
//! (`core/category_extractor.py`): fetch `/category/{id}`, regex-match every
//! `/book/(\d+)` href, de-duplicate while preserving first-seen order, and
//! read the category's display name off the page `<title>`.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

use crate::core::model::BookId;
use crate::core::retry::RetryEnvelope;
use crate::HarvestError;

static BOOK_HREF_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"/book/(\d+)").unwrap());

/// A category listing's resolved name plus the book identifiers found on
/// its page, in first-seen document order.
#[derive(Debug, Clone)]
pub struct CategoryListing {
    pub category_id: String,
    pub category_name: Option<String>,
    pub book_ids: Vec<BookId>,
}

/// Fetch and parse one category page. A page with zero matching book
/// links is not an error — it yields an empty `book_ids` — but a
/// transport failure propagates as [`HarvestError::FetchFailed`].
pub fn extract_category(
    envelope: &RetryEnvelope,
    base_url: &str,
    category_id: &str,
) -> Result<CategoryListing, HarvestError> {
    let url = format!("{}/category/{}", base_url.trim_end_matches('/'), category_id);
    let response = envelope.fetch(&url).map_err(|e| HarvestError::FetchFailed {
        url: url.clone(),
        cause: e.to_string(),
        attempts: 1,
    })?;

    let doc = Html::parse_document(&response.body);

    let mut seen = std::collections::HashSet::new();
    let mut book_ids = Vec::new();
    for caps in BOOK_HREF_RE.captures_iter(&response.body) {
        if let Ok(id) = BookId::normalize(&caps[1]) {
            if seen.insert(id.clone()) {
                book_ids.push(id);
            }
        }
    }

    let category_name = extract_category_name(&doc);

    Ok(CategoryListing {
        category_id: category_id.to_string(),
        category_name,
        book_ids,
    })
}

/// Category display name: the part of `<title>` before a `|` separator,
/// falling back to the first `<h1>`.
fn extract_category_name(doc: &Html) -> Option<String> {
    if let Ok(selector) = Selector::parse("title") {
        if let Some(title) = doc.select(&selector).next() {
            let text = title.text().collect::<String>();
            let trimmed = text.split('|').next().unwrap_or("").trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }
    if let Ok(selector) = Selector::parse("h1") {
        if let Some(h1) = doc.select(&selector).next() {
            let text = h1.text().collect::<String>().trim().to_string();
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    None
}
