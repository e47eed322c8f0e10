//! C10: turn an assembled [`BookDocument`] into bytes.
//!
//! Plain JSON by default; gzip-framed when `config.enable_compression` is
//! set (requires the `gzip` feature). Large documents can be streamed
//! page-by-page instead of built up as one `serde_json::Value` in memory,
//! controlled by `config.stream_json` / `config.stream_threshold`
//! (spec §4.9).

use std::io::Write;

use crate::core::config::HarvestConfig;
use crate::core::model::BookDocument;
use crate::HarvestError;

/// Serialize `document` per `config`, choosing streaming vs. whole-value
/// encoding by page count and gzip framing by `enable_compression`.
pub fn serialize(document: &BookDocument, config: &HarvestConfig) -> Result<Vec<u8>, HarvestError> {
    let json = if config.stream_json && document.pages.len() >= config.stream_threshold {
        serialize_streaming(document)?
    } else {
        serde_json::to_vec_pretty(document)
            .map_err(|e| HarvestError::Internal(format!("cannot serialize document: {e}")))?
    };

    if config.enable_compression {
        compress(&json)
    } else {
        Ok(json)
    }
}

/// Write the document as JSON incrementally: every field but `pages` is
/// serialized normally, then `pages` is appended one element at a time.
/// Avoids holding two full in-memory copies (the typed document plus a
/// fully-built JSON string) for books with very large page counts.
fn serialize_streaming(document: &BookDocument) -> Result<Vec<u8>, HarvestError> {
    // Serialize every field but `pages` through the ordinary derive by
    // borrowing rather than cloning the (potentially huge) page list, then
    // splice the page array in by hand, one element at a time.
    #[derive(serde::Serialize)]
    #[serde(rename_all = "camelCase")]
    struct Head<'a> {
        title: &'a str,
        book_id: &'a crate::core::model::BookId,
        slug: &'a str,
        authors: &'a [crate::core::model::Author],
        #[serde(skip_serializing_if = "Option::is_none")]
        publisher: &'a Option<crate::core::model::Publisher>,
        #[serde(skip_serializing_if = "Option::is_none")]
        section: &'a Option<crate::core::model::Section>,
        #[serde(skip_serializing_if = "Option::is_none")]
        edition_text: &'a Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        edition_number: Option<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        publication_year_gregorian: Option<i32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        publication_year_hijri: Option<i32>,
        page_count_internal: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        page_count_printed: Option<u32>,
        volume_count: u32,
        volumes: &'a [crate::core::model::Volume],
        chapters: &'a [crate::core::model::Chapter],
        #[serde(skip_serializing_if = "Option::is_none")]
        description: &'a Option<String>,
        source_url: &'a str,
        has_original_pagination: bool,
        language: &'a str,
        extraction_timestamp: &'a str,
    }

    let head = Head {
        title: &document.title,
        book_id: &document.book_id,
        slug: &document.slug,
        authors: &document.authors,
        publisher: &document.publisher,
        section: &document.section,
        edition_text: &document.edition_text,
        edition_number: document.edition_number,
        publication_year_gregorian: document.publication_year_gregorian,
        publication_year_hijri: document.publication_year_hijri,
        page_count_internal: document.page_count_internal,
        page_count_printed: document.page_count_printed,
        volume_count: document.volume_count,
        volumes: &document.volumes,
        chapters: &document.chapters,
        description: &document.description,
        source_url: &document.source_url,
        has_original_pagination: document.has_original_pagination,
        language: &document.language,
        extraction_timestamp: &document.extraction_timestamp,
    };

    let mut head_json = serde_json::to_string(&head)
        .map_err(|e| HarvestError::Internal(format!("cannot serialize document head: {e}")))?;
    // `head_json` ends in `}`; splice in `"pages":[...]` before it.
    head_json.pop();

    let mut out = Vec::new();
    out.extend_from_slice(head_json.as_bytes());
    out.extend_from_slice(b",\"pages\":[");
    for (i, page) in document.pages.iter().enumerate() {
        if i > 0 {
            out.push(b',');
        }
        let page_json = serde_json::to_vec(page)
            .map_err(|e| HarvestError::Internal(format!("cannot serialize page {}: {e}", page.internal_index)))?;
        out.extend_from_slice(&page_json);
    }
    out.extend_from_slice(b"]}");
    Ok(out)
}

#[cfg(feature = "gzip")]
fn compress(bytes: &[u8]) -> Result<Vec<u8>, HarvestError> {
    use flate2::write::GzEncoder;
    use flate2::Compression;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(bytes)
        .map_err(|e| HarvestError::Internal(format!("cannot gzip document: {e}")))?;
    encoder
        .finish()
        .map_err(|e| HarvestError::Internal(format!("cannot finish gzip stream: {e}")))
}

#[cfg(not(feature = "gzip"))]
fn compress(_bytes: &[u8]) -> Result<Vec<u8>, HarvestError> {
    Err(HarvestError::Internal(
        "enable_compression requested but the `gzip` feature is not enabled".to_string(),
    ))
}
