//! C9: `extract()`'s state machine.
//!
//! INIT (normalize the id) → SKELETON (landing + first page) → FETCHING
//! (the page pool, with periodic checkpointing) → VALIDATING (document
//! quality check) → DONE. A failure past SKELETON tries to restore the
//! newest on-disk backup before giving up, so a run that dies late still
//! has a chance of returning the last successfully assembled document
//! (spec §4.7, §4.9).

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use log::{info, warn};

use crate::core::cache::ResponseCache;
use crate::core::checkpoint;
use crate::core::config::HarvestConfig;
use crate::core::model::{BookDocument, BookId, Page};
use crate::core::pool::{fetch_pages, PageResult};
use crate::core::retry::RetryEnvelope;
use crate::core::structure::{self, Skeleton};
use crate::core::validate;
use crate::HarvestError;

/// Run the full per-book extraction pipeline against `raw_book_id`.
///
/// `cancel`, if provided, is checked cooperatively by the page pool; pass
/// `None` to run uninterruptibly (the CLI wires a Ctrl-C handler through
/// here; library callers that embed their own cancellation should use
/// [`extract_with_cancel`] directly).
pub fn extract(raw_book_id: &str, config: &HarvestConfig) -> Result<BookDocument, HarvestError> {
    extract_with_cancel(raw_book_id, config, Arc::new(AtomicBool::new(false)))
}

/// Like [`extract`], but takes an explicit shared cancellation flag.
pub fn extract_with_cancel(
    raw_book_id: &str,
    config: &HarvestConfig,
    cancel: Arc<AtomicBool>,
) -> Result<BookDocument, HarvestError> {
    let book_id = BookId::normalize(raw_book_id).map_err(HarvestError::InvalidBookId)?;

    let envelope = RetryEnvelope::new(config.clone());
    let cache = if config.persistent_cache {
        build_persistent_cache(config)
    } else {
        ResponseCache::new(config.cache_size, config.cache_duration)
    };

    match run_pipeline(&envelope, &cache, config, &book_id, cancel) {
        Ok(document) => {
            checkpoint::clear(config, book_id.as_str())?;
            Ok(document)
        }
        Err(err) => {
            warn!("extraction of {book_id} failed: {err}; attempting backup restore");
            if let Some(bytes) = checkpoint::restore_latest_backup(config, book_id.as_str()) {
                if let Ok(document) = serde_json::from_slice::<BookDocument>(&bytes) {
                    info!("restored {book_id} from the latest backup after a failed run");
                    return Ok(document);
                }
            }
            Err(err)
        }
    }
}

#[cfg(feature = "sqlite-cache")]
fn build_persistent_cache(config: &HarvestConfig) -> ResponseCache {
    let path = config.checkpoint_dir.join("response-cache.sqlite3");
    ResponseCache::with_persistent_tier(config.cache_size, config.cache_duration, &path)
        .unwrap_or_else(|e| {
            warn!("cannot open persistent cache at {}: {e}; falling back to memory-only", path.display());
            ResponseCache::new(config.cache_size, config.cache_duration)
        })
}

#[cfg(not(feature = "sqlite-cache"))]
fn build_persistent_cache(config: &HarvestConfig) -> ResponseCache {
    ResponseCache::new(config.cache_size, config.cache_duration)
}

fn run_pipeline(
    envelope: &RetryEnvelope,
    cache: &ResponseCache,
    config: &HarvestConfig,
    book_id: &BookId,
    cancel: Arc<AtomicBool>,
) -> Result<BookDocument, HarvestError> {
    info!("discovering structure for book {book_id}");
    let skeleton = structure::discover(envelope, &config.base_url, book_id.as_str())?;

    let resumed = checkpoint::load(config, book_id.as_str())
        .filter(|state| state.page_count_internal == skeleton.page_count_internal);

    let mut pages: Vec<Option<Page>> = vec![None; skeleton.page_count_internal as usize];
    if let Some(state) = &resumed {
        info!("resuming book {book_id} from checkpoint ({} pages already fetched)", state.pages.len());
        for page in &state.pages {
            if let Some(slot) = pages.get_mut((page.internal_index - 1) as usize) {
                *slot = Some(page.clone());
            }
        }
    }

    let outstanding = pages.iter().filter(|p| p.is_none()).count();
    if outstanding > 0 {
        fetch_remaining(envelope, cache, config, book_id, &skeleton, &mut pages, cancel.clone())?;
    }

    if cancel.load(std::sync::atomic::Ordering::SeqCst) {
        return Err(HarvestError::Cancelled);
    }

    let mut assembled_pages: Vec<Page> = pages.into_iter().flatten().collect();
    assembled_pages.sort_by_key(|p| p.internal_index);
    assign_page_chapters(&mut assembled_pages, &skeleton);

    let document = assemble_document(book_id, &skeleton, assembled_pages);
    validate::check_document(&document, config)?;

    let bytes = crate::core::serialize::serialize(&document, config)?;
    checkpoint::write_backup(config, book_id.as_str(), &bytes)?;

    Ok(document)
}

fn fetch_remaining(
    envelope: &RetryEnvelope,
    cache: &ResponseCache,
    config: &HarvestConfig,
    book_id: &BookId,
    skeleton: &Skeleton,
    pages: &mut [Option<Page>],
    cancel: Arc<AtomicBool>,
) -> Result<(), HarvestError> {
    let mut since_checkpoint = 0u32;
    let loaded_indices: std::collections::HashSet<u32> = pages
        .iter()
        .enumerate()
        .filter_map(|(i, p)| p.as_ref().map(|_| i as u32 + 1))
        .collect();
    let handle = fetch_pages(
        envelope,
        cache,
        config,
        &config.base_url,
        book_id.as_str(),
        skeleton.page_count_internal,
        skeleton.has_original_pagination,
        &loaded_indices,
        cancel,
        |result: PageResult| {
            let PageResult { internal_index, outcome } = result;
            match outcome {
                Ok(page) => {
                    if validate::check_page(&page, config).is_ok() {
                        if let Some(slot) = pages.get_mut((internal_index - 1) as usize) {
                            *slot = Some(page);
                        }
                    } else {
                        warn!("page {internal_index} of {book_id} failed the quality check, dropped");
                    }
                }
                Err(e) => {
                    warn!("page {internal_index} of {book_id} failed: {e}");
                }
            }

            since_checkpoint += 1;
            if since_checkpoint >= config.checkpoint_interval {
                since_checkpoint = 0;
                let fetched: Vec<Page> = pages.iter().flatten().cloned().collect();
                if let Err(e) = checkpoint::save(config, book_id.as_str(), skeleton.page_count_internal, &fetched) {
                    warn!("checkpoint save failed for {book_id}: {e}");
                }
            }
        },
    );

    if handle.is_cancelled() {
        return Err(HarvestError::Cancelled);
    }
    Ok(())
}

/// Stamp each page with the `chapterOrder` of the deepest chapter whose
/// page range contains it (spec §3: "the most specific chapter covering
/// this page").
fn assign_page_chapters(pages: &mut [Page], skeleton: &Skeleton) {
    let mut by_page: std::collections::HashMap<u32, u32> = std::collections::HashMap::new();
    for chapter in crate::core::model::Chapter::visit_all(&skeleton.chapters) {
        let (Some(start), Some(end)) = (chapter.page_start, chapter.page_end) else {
            continue;
        };
        for page_num in start..=end {
            by_page
                .entry(page_num)
                .and_modify(|existing| {
                    if chapter.level >= chapter_level_for(skeleton, *existing) {
                        *existing = chapter.order;
                    }
                })
                .or_insert(chapter.order);
        }
    }
    for page in pages.iter_mut() {
        page.chapter_order = by_page.get(&page.internal_index).copied();
        page.volume_number = skeleton
            .volumes
            .iter()
            .find(|v| page.internal_index >= v.page_start && page.internal_index <= v.page_end)
            .map(|v| v.number);
    }
}

fn chapter_level_for(skeleton: &Skeleton, order: u32) -> u32 {
    crate::core::model::Chapter::visit_all(&skeleton.chapters)
        .into_iter()
        .find(|c| c.order == order)
        .map(|c| c.level)
        .unwrap_or(0)
}

fn assemble_document(book_id: &BookId, skeleton: &Skeleton, pages: Vec<Page>) -> BookDocument {
    BookDocument {
        title: skeleton.title.clone(),
        slug: crate::util::text::slugify(&skeleton.title),
        book_id: book_id.clone(),
        authors: skeleton.authors.clone(),
        publisher: skeleton.publisher.clone(),
        section: skeleton.section.clone(),
        edition_text: skeleton.edition_text.clone(),
        edition_number: skeleton.edition_number,
        publication_year_gregorian: skeleton.publication_year_gregorian,
        publication_year_hijri: skeleton.publication_year_hijri,
        page_count_internal: skeleton.page_count_internal,
        page_count_printed: skeleton.page_count_printed,
        volume_count: skeleton.volumes.len() as u32,
        volumes: skeleton.volumes.clone(),
        chapters: skeleton.chapters.clone(),
        pages,
        description: skeleton.description.clone(),
        source_url: skeleton.landing_url.clone(),
        has_original_pagination: skeleton.has_original_pagination,
        language: BookDocument::DEFAULT_LANGUAGE.to_string(),
        extraction_timestamp: crate::util::time::now_rfc3339(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{Chapter, ChapterKind};

    fn chapter(order: u32, level: u32, start: u32, end: u32) -> Chapter {
        Chapter {
            title: format!("c{order}"),
            order,
            page_start: Some(start),
            page_end: Some(end),
            level,
            kind: if level == 0 { ChapterKind::Main } else { ChapterKind::Sub },
            volume_number: None,
            children: vec![],
        }
    }

    #[test]
    fn assign_page_chapters_prefers_deepest_covering_chapter() {
        let skeleton = Skeleton {
            title: "t".into(),
            authors: vec![],
            publisher: None,
            section: None,
            edition_text: None,
            edition_number: None,
            publication_year_gregorian: None,
            publication_year_hijri: None,
            description: None,
            has_original_pagination: false,
            chapters: vec![Chapter {
                children: vec![chapter(1, 1, 5, 10)],
                ..chapter(0, 0, 1, 20)
            }],
            volumes: vec![],
            page_count_internal: 20,
            page_count_printed: None,
            landing_url: "https://x.test/book/43".into(),
        };

        let mut pages = vec![
            Page {
                internal_index: 7,
                printed_number: None,
                page_number: 7,
                content: String::new(),
                html_content: None,
                word_count: 0,
                volume_number: None,
                chapter_order: None,
                printed_missing: true,
            },
            Page {
                internal_index: 15,
                printed_number: None,
                page_number: 15,
                content: String::new(),
                html_content: None,
                word_count: 0,
                volume_number: None,
                chapter_order: None,
                printed_missing: true,
            },
        ];

        assign_page_chapters(&mut pages, &skeleton);
        assert_eq!(pages[0].chapter_order, Some(1));
        assert_eq!(pages[1].chapter_order, Some(0));
    }
}
