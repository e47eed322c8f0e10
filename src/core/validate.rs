//! C8: response-level and document-level quality checks.
//!
//! Response checks run per-page, right after a fetch, to catch soft
//! failures a 200 status code hides (a "temporarily unavailable"
//! interstitial still returns 200). Document checks run once at the end
//! of extraction, over the assembled [`BookDocument`] (spec §4.8).

use crate::core::config::HarvestConfig;
use crate::core::model::{BookDocument, Page};
use crate::util::text::arabic_ratio;
use crate::HarvestError;

const BLOCK_PHRASES: &[&str] = &[
    "الصفحة غير متوفرة حاليا",
    "عذرا، حدث خطأ",
    "Access Denied",
    "Service Unavailable",
];

/// Reject a response body too short to be real content, or one that
/// matches a known soft-failure phrase, before it is ever parsed.
pub fn check_response(body: &str, config: &HarvestConfig) -> Result<(), HarvestError> {
    if body.trim().len() < config.min_content_length {
        return Err(HarvestError::QualityBelowThreshold {
            metric: "responseLength".to_string(),
            observed: body.trim().len() as f64,
            required: config.min_content_length as f64,
        });
    }
    if let Some(phrase) = BLOCK_PHRASES.iter().find(|p| body.contains(**p)) {
        return Err(HarvestError::QualityBelowThreshold {
            metric: format!("blockPhrase:{phrase}"),
            observed: 1.0,
            required: 0.0,
        });
    }
    Ok(())
}

/// Reject an extracted page whose body is empty or whose Arabic-character
/// ratio is implausibly low for this corpus, signalling a denylist miss
/// or a parser selector drift rather than a genuinely blank source page.
pub fn check_page(page: &Page, config: &HarvestConfig) -> Result<(), HarvestError> {
    if page.content.trim().is_empty() {
        return Ok(()); // genuinely blank pages are allowed; the document-level check bounds how many
    }
    let ratio = arabic_ratio(&page.content);
    if ratio < 0.2 {
        return Err(HarvestError::QualityBelowThreshold {
            metric: "arabicRatio".to_string(),
            observed: ratio,
            required: 0.2,
        });
    }
    let _ = config; // reserved for a future per-page length floor
    Ok(())
}

/// Reject an assembled document with no title, no pages, or an empty-page
/// fraction above `config.max_empty_page_fraction` (spec §4.8).
pub fn check_document(document: &BookDocument, config: &HarvestConfig) -> Result<(), HarvestError> {
    if document.title.trim().is_empty() {
        return Err(HarvestError::StructureIncomplete("document has no title".to_string()));
    }
    if document.pages.is_empty() {
        return Err(HarvestError::StructureIncomplete("document has no pages".to_string()));
    }

    let empty = document.pages.iter().filter(|p| p.content.trim().is_empty()).count();
    let fraction = empty as f64 / document.pages.len() as f64;
    if fraction > config.max_empty_page_fraction {
        return Err(HarvestError::QualityBelowThreshold {
            metric: "emptyPageFraction".to_string(),
            observed: fraction,
            required: config.max_empty_page_fraction,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::BookId;

    fn config() -> HarvestConfig {
        HarvestConfig::default()
    }

    #[test]
    fn response_below_minimum_length_is_rejected() {
        let err = check_response("short", &config()).unwrap_err();
        assert_eq!(err.kind(), "QualityBelowThreshold");
    }

    #[test]
    fn response_with_block_phrase_is_rejected() {
        let body = "x".repeat(200) + "الصفحة غير متوفرة حاليا";
        assert!(check_response(&body, &config()).is_err());
    }

    #[test]
    fn response_with_plain_long_body_passes() {
        let body = "نص عربي طويل بما يكفي ليجتاز الحد الأدنى المطلوب للطول. ".repeat(3);
        assert!(check_response(&body, &config()).is_ok());
    }

    fn sample_page(content: &str) -> Page {
        Page {
            internal_index: 1,
            printed_number: None,
            page_number: 1,
            content: content.to_string(),
            html_content: None,
            word_count: content.split_whitespace().count(),
            volume_number: None,
            chapter_order: None,
            printed_missing: true,
        }
    }

    #[test]
    fn page_with_low_arabic_ratio_is_rejected() {
        let page = sample_page("abcdefghijklmnop only latin text here");
        assert!(check_page(&page, &config()).is_err());
    }

    #[test]
    fn blank_page_passes_the_page_level_check() {
        let page = sample_page("   ");
        assert!(check_page(&page, &config()).is_ok());
    }

    fn sample_document(pages: Vec<Page>) -> BookDocument {
        BookDocument {
            title: "كتاب".to_string(),
            book_id: BookId::normalize("43").unwrap(),
            slug: "ktab".to_string(),
            authors: vec![],
            publisher: None,
            section: None,
            edition_text: None,
            edition_number: None,
            publication_year_gregorian: None,
            publication_year_hijri: None,
            page_count_internal: pages.len() as u32,
            page_count_printed: None,
            volume_count: 1,
            volumes: vec![],
            chapters: vec![],
            pages,
            description: None,
            source_url: "https://x.test/book/43".to_string(),
            has_original_pagination: false,
            language: BookDocument::DEFAULT_LANGUAGE.to_string(),
            extraction_timestamp: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn document_with_no_title_is_rejected() {
        let mut doc = sample_document(vec![sample_page("نص")]);
        doc.title = String::new();
        assert!(check_document(&doc, &config()).is_err());
    }

    #[test]
    fn document_with_too_many_empty_pages_is_rejected() {
        let pages = vec![sample_page(""), sample_page(""), sample_page("نص عربي")];
        let doc = sample_document(pages);
        let mut config = config();
        config.max_empty_page_fraction = 0.1;
        assert!(check_document(&doc, &config).is_err());
    }

    #[test]
    fn document_within_tolerance_passes() {
        let pages = vec![sample_page("نص عربي طويل"), sample_page("نص آخر طويل أيضا")];
        let doc = sample_document(pages);
        assert!(check_document(&doc, &config()).is_ok());
    }
}
