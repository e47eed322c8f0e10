use std::io::Write;

use serde::Serialize;

use crate::cli::wprintln;
use crate::core::category::extract_category;
use crate::core::config::HarvestConfig;
use crate::core::retry::RetryEnvelope;
use crate::HarvestError;

pub struct CategoryOptions {
    pub category_id: String,
    pub base_url: Option<String>,
    pub json: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CategoryReport<'a> {
    category_id: &'a str,
    category_name: Option<&'a str>,
    books_count: usize,
    book_ids: Vec<String>,
}

pub fn execute(opts: &CategoryOptions, writer: &mut dyn Write) -> Result<(), HarvestError> {
    let mut config = HarvestConfig::default();
    if let Some(base_url) = &opts.base_url {
        config.base_url = base_url.clone();
    }
    let envelope = RetryEnvelope::new(config.clone());

    let listing = extract_category(&envelope, &config.base_url, &opts.category_id)?;

    if opts.json {
        let report = CategoryReport {
            category_id: &listing.category_id,
            category_name: listing.category_name.as_deref(),
            books_count: listing.book_ids.len(),
            book_ids: listing.book_ids.iter().map(|id| id.to_string()).collect(),
        };
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| HarvestError::Internal(format!("cannot serialize category report: {e}")))?;
        wprintln!(writer, "{json}")?;
    } else {
        wprintln!(
            writer,
            "{} ({}): {} books",
            listing.category_name.as_deref().unwrap_or("unknown"),
            listing.category_id,
            listing.book_ids.len()
        )?;
        for id in &listing.book_ids {
            wprintln!(writer, "{id}")?;
        }
    }

    Ok(())
}
