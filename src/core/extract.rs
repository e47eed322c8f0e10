//! C4: pure functions from a parsed HTML document to typed fragments.
//!
//! Each extractor tries its selector list in order; the first non-empty
//! match wins (spec §4.4). None of these functions mutate shared state;
//! they operate on a private view of the DOM (`scraper::Html` owns its
//! parse tree per call).

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::core::model::{Chapter, ChapterKind};
use crate::util::digits::{first_number, to_ascii_digits};
use crate::util::text::{is_purely_digits, word_count};

fn select_first<'a>(doc: &'a Html, selectors: &[&str]) -> Option<ElementRef<'a>> {
    for sel in selectors {
        if let Ok(selector) = Selector::parse(sel) {
            if let Some(el) = doc.select(&selector).next() {
                return Some(el);
            }
        }
    }
    None
}

fn clean_text(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ").trim().to_string()
}

/// Extracted page-body text plus metadata (spec §4.4 "Page body text").
#[derive(Debug, Clone)]
pub struct PageBody {
    pub text: String,
    pub word_count: usize,
    pub html: Option<String>,
}

/// A dropdown-derived volume entry before range reconciliation.
#[derive(Debug, Clone, Copy)]
pub struct VolumeLink {
    pub volume_number: u32,
    pub internal_start: u32,
}

const DENYLIST_TAGS: &[&str] = &[
    "script", "style", "nav", "header", "footer", "form", "button", "select", "input",
];

const DENYLIST_CLASS_HINTS: &[&str] = &[
    "share", "social", "ads", "advert", "menu", "sidebar", "modal", "breadcrumb",
];

const UI_PHRASES: &[&str] = &[
    "اطبع الصفحة",
    "شارك الصفحة",
    "حمل التطبيق",
    "تسجيل الدخول",
    "جميع الحقوق محفوظة",
];

/// Title: first selector with cleaned text length > 3. Required; the
/// orchestrator turns `None` into `StructureIncomplete`.
pub fn extract_title(doc: &Html) -> Option<String> {
    for sel in ["h1.book-title", "h1", ".book-title", "title"] {
        if let Ok(selector) = Selector::parse(sel) {
            for el in doc.select(&selector) {
                let text = clean_text(&el.text().collect::<String>());
                if text.chars().count() > 3 {
                    return Some(text);
                }
            }
        }
    }
    None
}

/// Authors: anchors in the author selector list, de-duplicated by cleaned
/// name, preserving first-seen order.
pub fn extract_authors(doc: &Html) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut authors = Vec::new();
    for sel in [".book-author a", ".author a", "a[href*='/author/']"] {
        let Ok(selector) = Selector::parse(sel) else {
            continue;
        };
        for el in doc.select(&selector) {
            let name = clean_text(&el.text().collect::<String>());
            if !name.is_empty() && seen.insert(name.clone()) {
                authors.push(name);
            }
        }
    }
    authors
}

static CITY_NAMES: &[&str] = &["القاهرة", "بيروت", "دمشق", "الرياض", "جدة", "بغداد", "تونس", "الدار البيضاء"];

/// Publisher: first matching label pattern in body text, split into
/// `(name, location)` when a trailing `«..، CITY»` / `«.. - CITY»`
/// suffix names a known city.
pub fn extract_publisher(body_text: &str) -> Option<(String, Option<String>)> {
    let raw = first_line_after_any(body_text, &["الناشر:", "دار النشر:", "النشر:", "المطبعة:", "نشر:"])?;
    for city in CITY_NAMES {
        if let Some(idx) = raw.rfind(city) {
            let before = raw[..idx].trim_end_matches([',', '،', '-', ' ']).trim();
            if !before.is_empty() {
                return Some((before.to_string(), Some((*city).to_string())));
            }
        }
    }
    Some((raw, None))
}

fn first_line_after_any(body_text: &str, markers: &[&str]) -> Option<String> {
    for marker in markers {
        if let Some(idx) = body_text.find(marker) {
            let rest = &body_text[idx + marker.len()..];
            let line = rest.lines().next().unwrap_or("").trim();
            if !line.is_empty() {
                return Some(line.to_string());
            }
        }
    }
    None
}

/// Section: anchor first, else a labeled text match.
pub fn extract_section(doc: &Html, body_text: &str) -> Option<String> {
    if let Some(el) = select_first(doc, &[".book-category a", ".category a", ".book-section a"]) {
        let text = clean_text(&el.text().collect::<String>());
        if !text.is_empty() {
            return Some(text);
        }
    }
    first_line_after_any(body_text, &["القسم:", "التصنيف:", "الموضوع:"])
}

static ORDINAL_WORDS: &[(&str, u32)] = &[
    ("الأولى", 1),
    ("الثانية", 2),
    ("الثالثة", 3),
    ("الرابعة", 4),
    ("الخامسة", 5),
    ("السادسة", 6),
    ("السابعة", 7),
    ("الثامنة", 8),
    ("التاسعة", 9),
    ("العاشرة", 10),
];

/// Edition: `(text, number)`. `بدون تاريخ`/`بدون طبعة` prefixes yield
/// `(None, None)`.
pub fn extract_edition(body_text: &str) -> (Option<String>, Option<u32>) {
    let Some(raw) = first_line_after_any(body_text, &["الطبعة:", "ط:", "طبعة:"]) else {
        return (None, None);
    };
    if raw.starts_with("بدون تاريخ") || raw.starts_with("بدون طبعة") {
        return (None, None);
    }
    let number = ORDINAL_WORDS
        .iter()
        .find(|(word, _)| raw.contains(word))
        .map(|(_, n)| *n)
        .or_else(|| first_number(&raw));
    (Some(raw), number)
}

static HIJRI_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{4})\s*ه[ـ]?").unwrap());
static GREGORIAN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{4})\s*م").unwrap());

/// Publication year: `(gregorian, hijri)`, deriving the missing member
/// from the one present via the approximate conversion of spec §4.4/B4.
pub fn extract_publication_year(body_text: &str) -> (Option<i32>, Option<i32>) {
    let ascii = to_ascii_digits(body_text);
    let hijri = HIJRI_RE.captures(&ascii).and_then(|c| c[1].parse::<i32>().ok());
    let gregorian = GREGORIAN_RE.captures(&ascii).and_then(|c| c[1].parse::<i32>().ok());
    match (gregorian, hijri) {
        (Some(g), Some(h)) => (Some(g), Some(h)),
        (Some(g), None) => (Some(g), Some(gregorian_to_hijri(g))),
        (None, Some(h)) => (Some(hijri_to_gregorian(h)), Some(h)),
        (None, None) => (None, None),
    }
}

/// Approximate Hijri→Gregorian conversion (spec §9: "approximate by
/// construction"). B4: `1420 هـ` → `1999`.
pub fn hijri_to_gregorian(hijri: i32) -> i32 {
    (hijri as f64 / 1.030684 + 622.0).floor() as i32
}

/// Approximate Gregorian→Hijri conversion, the inverse of
/// [`hijri_to_gregorian`].
pub fn gregorian_to_hijri(gregorian: i32) -> i32 {
    ((gregorian as f64 - 622.0) * 1.030684).floor() as i32
}

const DESC_START_MARKERS: &[&str] = &["بطاقة الكتاب", "والكتاب:", "الكتاب:"];
const DESC_END_MARKERS: &[&str] = &["فهرس الموضوعات", "فصول الكتاب", "شارك", "طباعة"];

static LEADING_DIGIT_LINE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\s*-\s*").unwrap());

/// Description (book card): the substring between the first start marker
/// and the first subsequent end marker, with UI chrome stripped. Falls
/// back to selector-based extraction if the cleaned result is short.
pub fn extract_description(doc: &Html, body_text: &str) -> Option<String> {
    let delimited = delimit_description(body_text);
    let cleaned = delimited.map(|s| clean_description(&s));
    if let Some(ref c) = cleaned {
        if c.chars().count() >= 50 {
            return cleaned;
        }
    }

    let fallback = select_first(doc, &[".book-description", ".description", "#book-description"])
        .map(|el| clean_description(&el.text().collect::<String>()));
    fallback.filter(|s| !s.is_empty()).or(cleaned)
}

fn delimit_description(body_text: &str) -> Option<String> {
    let start = DESC_START_MARKERS
        .iter()
        .filter_map(|m| body_text.find(m).map(|i| (i, m.len())))
        .min_by_key(|(i, _)| *i)?;
    let after_start = &body_text[start.0 + start.1..];
    let end = DESC_END_MARKERS
        .iter()
        .filter_map(|m| after_start.find(m))
        .min()
        .unwrap_or(after_start.len());
    Some(after_start[..end].to_string())
}

fn clean_description(raw: &str) -> String {
    let mut lines = Vec::new();
    for line in raw.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            lines.push("");
            continue;
        }
        if UI_PHRASES.iter().any(|p| trimmed.contains(p)) {
            continue;
        }
        if LEADING_DIGIT_LINE_RE.is_match(trimmed) || trimmed.starts_with('+') {
            continue;
        }
        lines.push(trimmed);
    }
    let joined = lines.join("\n");
    collapse_blank_runs(&joined)
}

fn collapse_blank_runs(s: &str) -> String {
    let mut out = String::new();
    let mut blank_run = 0;
    for line in s.lines() {
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run <= 2 {
                out.push('\n');
            }
        } else {
            blank_run = 0;
            out.push_str(line);
            out.push('\n');
        }
    }
    out.trim().to_string()
}

const ORIGINAL_PAGINATION_MARKERS: &[&str] = &[
    "ترقيم الكتاب موافق للمطبوع",
    "موافق للمطبوع",
    "ترقيم موافق للمطبوع",
    "الترقيم موافق للمطبوع",
];

/// True iff any original-pagination marker appears in the landing page's
/// text.
pub fn has_original_pagination(body_text: &str) -> bool {
    ORIGINAL_PAGINATION_MARKERS.iter().any(|m| body_text.contains(m))
}

/// Index tree: recursively parse the first matching `<ul>`'s `<li>`
/// children. A node yields a [`Chapter`] iff it has an anchor matching
/// `/book/{bookId}/(\d+)`; `order` encodes both depth and sibling
/// position as `parentOrder * 1000 + siblingIndex`.
pub fn extract_index_tree(doc: &Html, book_id: &str) -> Vec<Chapter> {
    let selectors = [
        "div.betaka-index ul",
        ".book-index ul",
        ".index ul",
        "#book-index ul",
        ".table-of-contents ul",
        ".s-nav ul",
        "div.s-nav ul",
    ];
    let Some(root_ul) = select_first(doc, &selectors) else {
        return Vec::new();
    };
    let href_re = book_href_regex(book_id);
    let mut chapters = parse_li_siblings(root_ul, &href_re, 0, 0);
    assign_page_ends(&mut chapters, None);
    chapters
}

/// Direct `<li>` element children of `el`, in document order. `scraper`'s
/// selector engine has no direct-child combinator support we can rely on
/// across versions, so nesting is walked by hand instead of re-selecting
/// `li` (which would also match nested lists' items).
fn direct_li_children(el: ElementRef) -> Vec<ElementRef> {
    el.children()
        .filter_map(ElementRef::wrap)
        .filter(|child| child.value().name() == "li")
        .collect()
}

/// Direct `<ul>` element child of `el`, if any.
fn direct_ul_child(el: ElementRef) -> Option<ElementRef> {
    el.children()
        .filter_map(ElementRef::wrap)
        .find(|child| child.value().name() == "ul")
}

fn book_href_regex(book_id: &str) -> Regex {
    let escaped = regex::escape(book_id);
    Regex::new(&format!(r"/book/{escaped}/(\d+)")).unwrap()
}

fn parse_li_siblings(ul: ElementRef, href_re: &Regex, level: u32, parent_order: u32) -> Vec<Chapter> {
    let a_selector = Selector::parse("a").unwrap();

    let mut chapters = Vec::new();
    for (idx, li) in direct_li_children(ul).into_iter().enumerate() {
        let anchor = li
            .select(&a_selector)
            .find_map(|a| a.value().attr("href").map(|h| (a, h)));
        let Some((a_el, href)) = anchor else { continue };
        let Some(caps) = href_re.captures(href) else {
            continue;
        };
        let Ok(page_start) = caps[1].parse::<u32>() else {
            continue;
        };
        let title = clean_text(&a_el.text().collect::<String>());
        let order = parent_order * 1000 + idx as u32;

        let children = direct_ul_child(li)
            .map(|nested| parse_li_siblings(nested, href_re, level + 1, order))
            .unwrap_or_default();

        chapters.push(Chapter {
            title,
            order,
            page_start: Some(page_start),
            page_end: None,
            level,
            kind: if level == 0 { ChapterKind::Main } else { ChapterKind::Sub },
            volume_number: None,
            children,
        });
    }
    chapters
}

/// Set each chapter's `page_end` to the page preceding the next sibling's
/// `page_start`, or inherit `inherited_end` if there is no next sibling.
fn assign_page_ends(chapters: &mut [Chapter], inherited_end: Option<u32>) {
    let starts: Vec<Option<u32>> = chapters.iter().map(|c| c.page_start).collect();
    let len = chapters.len();
    for i in 0..len {
        let next_start = starts.get(i + 1).copied().flatten();
        let this_end = match next_start {
            Some(n) if n > 0 => Some(n - 1),
            _ => inherited_end,
        };
        chapters[i].page_end = this_end;
        assign_page_ends(&mut chapters[i].children, this_end);
    }
}

/// Volume dropdown: enumerate dropdown links, keep only those matching
/// `/book/{bookId}/(\d+)` with a digit in the visible text, deduplicate by
/// volume number keeping the minimum internal start, and sort ascending.
/// Synthesizes a single volume starting at page 1 if none are found;
/// the caller (`core::structure`) is responsible for closing the last
/// range at `pageCountInternal`.
pub fn extract_volume_links(doc: &Html, book_id: &str) -> Vec<VolumeLink> {
    let href_re = book_href_regex(book_id);
    let mut by_volume: std::collections::BTreeMap<u32, u32> = std::collections::BTreeMap::new();

    for sel in ["ul.dropdown-menu a[href*='#p1']", ".dropdown-menu a"] {
        let Ok(selector) = Selector::parse(sel) else {
            continue;
        };
        for a in doc.select(&selector) {
            let Some(href) = a.value().attr("href") else {
                continue;
            };
            let Some(caps) = href_re.captures(href) else {
                continue;
            };
            let Ok(internal_start) = caps[1].parse::<u32>() else {
                continue;
            };
            let text = clean_text(&a.text().collect::<String>());
            let normalized = to_ascii_digits(&text);
            if !normalized.chars().any(|c| c.is_ascii_digit()) {
                continue;
            }
            let Some(volume_number) = first_number(&normalized) else {
                continue;
            };
            by_volume
                .entry(volume_number)
                .and_modify(|existing| *existing = (*existing).min(internal_start))
                .or_insert(internal_start);
        }
    }

    if by_volume.is_empty() {
        return vec![VolumeLink {
            volume_number: 1,
            internal_start: 1,
        }];
    }

    by_volume
        .into_iter()
        .map(|(volume_number, internal_start)| VolumeLink {
            volume_number,
            internal_start,
        })
        .collect()
}

/// Highest internal page number linked anywhere in `doc` (pagination
/// controls — "first"/"last"/numbered links all point at `/book/{id}/N`).
/// Used by structure discovery to learn `pageCountInternal` from the
/// first reading page without a dedicated "last page" selector.
pub fn extract_max_internal_page(doc: &Html, book_id: &str) -> Option<u32> {
    let href_re = book_href_regex(book_id);
    let selector = Selector::parse("a[href]").ok()?;
    doc.select(&selector)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| href_re.captures(href))
        .filter_map(|caps| caps[1].parse::<u32>().ok())
        .max()
}

static TITLE_PAGE_NUMBER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[صس]\s*[:：]?\s*([0-9٠-٩]+)").unwrap()
});

/// Printed page number from a reading page's `<title>`.
pub fn extract_printed_page_number(title_text: &str) -> Option<u32> {
    let caps = TITLE_PAGE_NUMBER_RE.captures(title_text)?;
    first_number(&caps[1])
}

/// Page body text: pick the first matching container (falling back to
/// `body`), strip denylisted descendants, turn `<hr>`/`<br>` into
/// newlines, then filter out short lines, UI-phrase lines, and
/// purely-numeric furniture lines.
pub fn extract_page_body(doc: &Html) -> PageBody {
    let containers = [
        "div.nass",
        "#book",
        "div#text",
        "article",
        "div.reader-text",
        "div.col-md-9",
        ".book-content",
        ".page-content",
        "main",
    ];
    let container = select_first(doc, &containers).or_else(|| select_first(doc, &["body"]));

    let Some(container) = container else {
        return PageBody {
            text: String::new(),
            word_count: 0,
            html: None,
        };
    };

    let raw_text = extract_visible_text(container);
    let filtered = filter_body_lines(&raw_text);
    let wc = word_count(&filtered);

    PageBody {
        text: filtered,
        word_count: wc,
        html: Some(container.html()),
    }
}

fn extract_visible_text(el: ElementRef) -> String {
    let mut out = String::new();
    collect_text(el, &mut out);
    out
}

fn collect_text(el: ElementRef, out: &mut String) {
    let tag = el.value().name();
    if DENYLIST_TAGS.contains(&tag) {
        return;
    }
    let class_attr = el.value().attr("class").unwrap_or("");
    if DENYLIST_CLASS_HINTS.iter().any(|hint| class_attr.contains(hint)) {
        return;
    }

    if tag == "hr" || tag == "br" {
        out.push('\n');
        return;
    }

    for child in el.children() {
        match child.value() {
            scraper::Node::Text(text) => out.push_str(&text.text),
            scraper::Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    collect_text(child_el, out);
                }
            }
            _ => {}
        }
    }
    if matches!(tag, "p" | "div" | "li" | "section") {
        out.push('\n');
    }
}

fn filter_body_lines(raw: &str) -> String {
    let mut lines = Vec::new();
    for line in raw.lines() {
        let trimmed = line.trim();
        if trimmed.chars().count() < 10 {
            continue;
        }
        if UI_PHRASES.iter().any(|p| trimmed.contains(p)) {
            continue;
        }
        if is_purely_digits(trimmed) {
            continue;
        }
        lines.push(trimmed);
    }
    collapse_blank_runs(&lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(html: &str) -> Html {
        Html::parse_document(html)
    }

    #[test]
    fn extracts_title_from_h1() {
        let doc = parse("<html><body><h1 class=\"book-title\">كتاب الأمثلة</h1></body></html>");
        assert_eq!(extract_title(&doc).as_deref(), Some("كتاب الأمثلة"));
    }

    #[test]
    fn title_requires_length_over_three() {
        let doc = parse("<html><body><h1>ك</h1></body></html>");
        assert_eq!(extract_title(&doc), None);
    }

    #[test]
    fn extracts_authors_deduplicated_in_order() {
        let doc = parse(
            "<html><body><div class=\"book-author\"><a href=\"/author/1\">ابن سينا</a></div>\
             <a href=\"/author/1\">ابن سينا</a>\
             <a href=\"/author/2\">الفارابي</a></body></html>",
        );
        assert_eq!(extract_authors(&doc), vec!["ابن سينا", "الفارابي"]);
    }

    #[test]
    fn extracts_publisher_with_city_suffix() {
        let body = "الناشر: دار المعارف، القاهرة\nبقية النص";
        let (name, city) = extract_publisher(body).unwrap();
        assert_eq!(name, "دار المعارف");
        assert_eq!(city.as_deref(), Some("القاهرة"));
    }

    #[test]
    fn edition_without_date_yields_none() {
        let (text, number) = extract_edition("الطبعة: بدون تاريخ");
        assert_eq!(text, None);
        assert_eq!(number, None);
    }

    #[test]
    fn edition_ordinal_word_maps_to_number() {
        let (text, number) = extract_edition("الطبعة: الأولى");
        assert_eq!(text.as_deref(), Some("الأولى"));
        assert_eq!(number, Some(1));
    }

    #[test]
    fn edition_numeric_literal() {
        let (_, number) = extract_edition("الطبعة: 7");
        assert_eq!(number, Some(7));
    }

    #[test]
    fn publication_year_hijri_derives_gregorian() {
        let (greg, hijri) = extract_publication_year("طبع سنة 1420 هـ");
        assert_eq!(hijri, Some(1420));
        assert_eq!(greg, Some(1999));
    }

    #[test]
    fn hijri_gregorian_roundtrip_matches_b4() {
        assert_eq!(hijri_to_gregorian(1420), 1999);
    }

    #[test]
    fn detects_original_pagination_marker() {
        assert!(has_original_pagination("ترقيم الكتاب موافق للمطبوع في هذه الطبعة"));
        assert!(!has_original_pagination("لا علاقة"));
    }

    #[test]
    fn printed_page_number_ascii_and_arabic_indic() {
        assert_eq!(extract_printed_page_number("عنوان - ص: 12"), Some(12));
        assert_eq!(extract_printed_page_number("عنوان - ص:١٢3"), Some(123));
        assert_eq!(extract_printed_page_number("لا رقم هنا"), None);
    }

    #[test]
    fn index_tree_parses_nested_list_with_orders() {
        let doc = parse(
            "<html><body><div class=\"book-index\"><ul>\
               <li><a href=\"/book/43/1\">الباب الأول</a>\
                 <ul><li><a href=\"/book/43/2\">فصل 1</a></li></ul>\
               </li>\
               <li><a href=\"/book/43/5\">الباب الثاني</a></li>\
             </ul></div></body></html>",
        );
        let tree = extract_index_tree(&doc, "43");
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].page_start, Some(1));
        assert_eq!(tree[0].page_end, Some(4));
        assert_eq!(tree[0].children[0].page_start, Some(2));
        assert_eq!(tree[0].children[0].level, 1);
        assert_eq!(tree[1].page_start, Some(5));
        assert_eq!(tree[1].page_end, None);
    }

    #[test]
    fn volume_links_deduplicate_and_sort() {
        let doc = parse(
            "<html><body><ul class=\"dropdown-menu\">\
               <li><a href=\"/book/43/7\">المجلد 3</a></li>\
               <li><a href=\"/book/43/1\">المجلد 1</a></li>\
               <li><a href=\"/book/43/4\">المجلد 2</a></li>\
               <li><a href=\"/book/43/7\">المجلد 3</a></li>\
             </ul></body></html>",
        );
        let links = extract_volume_links(&doc, "43");
        let numbers: Vec<u32> = links.iter().map(|l| l.volume_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn volume_links_synthesize_single_volume_when_empty() {
        let doc = parse("<html><body>no dropdown here</body></html>");
        let links = extract_volume_links(&doc, "43");
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].volume_number, 1);
        assert_eq!(links[0].internal_start, 1);
    }

    #[test]
    fn max_internal_page_is_highest_linked_page() {
        let doc = parse(
            "<html><body><div class=\"pagination\">\
               <a href=\"/book/43/1\">الأولى</a>\
               <a href=\"/book/43/88\">الأخيرة</a>\
             </div></body></html>",
        );
        assert_eq!(extract_max_internal_page(&doc, "43"), Some(88));
    }

    #[test]
    fn page_body_filters_short_and_numeric_lines() {
        let doc = parse(
            "<html><body><div class=\"nass\">\
               <p>هذا نص طويل بما يكفي ليجتاز عتبة الطول المطلوبة</p>\
               <p>12</p>\
               <p>قصير</p>\
             </div></body></html>",
        );
        let body = extract_page_body(&doc);
        assert!(body.text.contains("هذا نص طويل"));
        assert!(!body.text.contains('\u{0661}'));
        assert!(body.word_count > 0);
    }
}
