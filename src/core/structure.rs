//! C5: turn the landing page and the first reading page into a skeleton
//! `BookDocument` (every field except `pages`).
//!
//! Two fetches drive discovery: the landing page supplies bibliographic
//! metadata and the chapter tree, the first reading page supplies the
//! volume dropdown and the highest linked internal page number. A third,
//! optional fetch of the last internal page recovers `pageCountPrinted`
//! when the source prints its own page numbers (spec §4.5).

use scraper::Html;

use crate::core::extract::{
    extract_authors, extract_description, extract_edition, extract_index_tree,
    extract_max_internal_page, extract_printed_page_number, extract_publication_year,
    extract_publisher, extract_section, extract_title, extract_volume_links, VolumeLink,
};
use crate::core::model::{Author, Chapter, Publisher, Section, Volume};
use crate::core::retry::RetryEnvelope;
use crate::HarvestError;

/// Everything [`crate::core::orchestrator`] needs before the page pool can
/// start fetching content.
#[derive(Debug, Clone)]
pub struct Skeleton {
    pub title: String,
    pub authors: Vec<Author>,
    pub publisher: Option<Publisher>,
    pub section: Option<Section>,
    pub edition_text: Option<String>,
    pub edition_number: Option<u32>,
    pub publication_year_gregorian: Option<i32>,
    pub publication_year_hijri: Option<i32>,
    pub description: Option<String>,
    pub has_original_pagination: bool,
    pub chapters: Vec<Chapter>,
    pub volumes: Vec<Volume>,
    pub page_count_internal: u32,
    pub page_count_printed: Option<u32>,
    pub landing_url: String,
}

fn landing_url(base_url: &str, book_id: &str) -> String {
    format!("{}/book/{}", base_url.trim_end_matches('/'), book_id)
}

fn page_url(base_url: &str, book_id: &str, internal_index: u32) -> String {
    format!("{}/book/{}/{}", base_url.trim_end_matches('/'), book_id, internal_index)
}

/// Fetch the landing page and first reading page, returning a fully
/// populated [`Skeleton`]. Fails with [`HarvestError::StructureIncomplete`]
/// when the title is missing or the chapter tree and volume dropdown
/// cannot be reconciled with the discovered page count.
pub fn discover(
    envelope: &RetryEnvelope,
    base_url: &str,
    book_id: &str,
) -> Result<Skeleton, HarvestError> {
    let landing_url = landing_url(base_url, book_id);
    let landing_resp = envelope.fetch(&landing_url).map_err(|e| HarvestError::FetchFailed {
        url: landing_url.clone(),
        cause: e.to_string(),
        attempts: 1,
    })?;
    let landing_doc = Html::parse_document(&landing_resp.body);
    let body_text = landing_doc.root_element().text().collect::<String>();

    let title = extract_title(&landing_doc)
        .ok_or_else(|| HarvestError::StructureIncomplete("missing title on landing page".to_string()))?;

    let authors: Vec<Author> = extract_authors(&landing_doc).into_iter().map(Author::new).collect();
    let publisher = extract_publisher(&body_text).map(|(name, location)| Publisher {
        slug: crate::util::text::slugify(&name),
        name,
        location,
        description: None,
    });
    let section = extract_section(&landing_doc, &body_text).map(Section::new);
    let (edition_text, edition_number) = extract_edition(&body_text);
    let (publication_year_gregorian, publication_year_hijri) = extract_publication_year(&body_text);
    let description = extract_description(&landing_doc, &body_text);
    let has_original_pagination = crate::core::extract::has_original_pagination(&body_text);
    let chapters = extract_index_tree(&landing_doc, book_id);

    let first_chapter_page = Chapter::visit_all(&chapters)
        .into_iter()
        .filter_map(|c| c.page_start)
        .min()
        .unwrap_or(1);

    let first_page_url = page_url(base_url, book_id, 1);
    let first_page_resp = envelope.fetch(&first_page_url).map_err(|e| HarvestError::FetchFailed {
        url: first_page_url.clone(),
        cause: e.to_string(),
        attempts: 1,
    })?;
    let first_page_doc = Html::parse_document(&first_page_resp.body);

    let links = extract_volume_links(&first_page_doc, book_id);
    let page_count_internal = extract_max_internal_page(&first_page_doc, book_id)
        .or_else(|| Chapter::visit_all(&chapters).into_iter().filter_map(|c| c.page_end).max())
        .unwrap_or(first_chapter_page)
        .max(first_chapter_page);

    let volumes = volumes_from_links(&links, page_count_internal);
    if volumes.is_empty() {
        return Err(HarvestError::StructureIncomplete(
            "no volumes could be derived from the first reading page".to_string(),
        ));
    }

    let mut chapters = chapters;
    assign_chapter_volumes(&mut chapters, &volumes);

    let page_count_printed = if has_original_pagination {
        discover_printed_count(envelope, base_url, book_id, page_count_internal)
    } else {
        None
    };

    Ok(Skeleton {
        title,
        authors,
        publisher,
        section,
        edition_text,
        edition_number,
        publication_year_gregorian,
        publication_year_hijri,
        description,
        has_original_pagination,
        chapters,
        volumes,
        page_count_internal,
        page_count_printed,
        landing_url,
    })
}

/// Turn volume dropdown links into contiguous, page-count-closed ranges:
/// each volume's `pageEnd` is the page before the next volume's start,
/// and the final volume's `pageEnd` is `pageCountInternal` (spec §3, I4).
fn volumes_from_links(links: &[VolumeLink], page_count_internal: u32) -> Vec<Volume> {
    let mut sorted = links.to_vec();
    sorted.sort_by_key(|l| l.internal_start);

    let mut volumes = Vec::with_capacity(sorted.len());
    for (i, link) in sorted.iter().enumerate() {
        let page_end = sorted
            .get(i + 1)
            .map(|next| next.internal_start.saturating_sub(1))
            .unwrap_or(page_count_internal);
        volumes.push(Volume {
            number: link.volume_number,
            title: format!("المجلد {}", link.volume_number),
            page_start: link.internal_start,
            page_end: page_end.max(link.internal_start),
        });
    }
    volumes
}

/// Assign each chapter (at every depth) the number of the volume whose
/// range contains its `pageStart`, leaving it unset if no volume matches
/// (a chapter with a page past the last known range).
fn assign_chapter_volumes(chapters: &mut [Chapter], volumes: &[Volume]) {
    Chapter::for_each_mut(chapters, &mut |chapter| {
        if let Some(start) = chapter.page_start {
            chapter.volume_number = volumes
                .iter()
                .find(|v| start >= v.page_start && start <= v.page_end)
                .map(|v| v.number);
        }
    });
}

/// Fetch the last internal page and read its printed page number off the
/// page `<title>`, recovering `pageCountPrinted` (spec §4.5). A fetch or
/// parse failure here is non-fatal: the field is simply left unset.
fn discover_printed_count(
    envelope: &RetryEnvelope,
    base_url: &str,
    book_id: &str,
    page_count_internal: u32,
) -> Option<u32> {
    let url = page_url(base_url, book_id, page_count_internal);
    let resp = envelope.fetch(&url).ok()?;
    let doc = Html::parse_document(&resp.body);
    let title_text = doc
        .select(&scraper::Selector::parse("title").ok()?)
        .next()
        .map(|el| el.text().collect::<String>())
        .unwrap_or_default();
    extract_printed_page_number(&title_text)
}
