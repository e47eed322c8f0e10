//! The extracted data model: [`BookDocument`] and its components.
//!
//! Field names use `camelCase` on the wire (via `#[serde(rename_all =
//! "camelCase")]`) per spec §6.2, while Rust identifiers stay
//! `snake_case`.

use serde::{Deserialize, Serialize};

use crate::util::text::slugify;

/// A book identifier, normalized to its compact numeric form.
///
/// Accepts both the bare numeric form (`"43"`) and the ecosystem-specific
/// prefixed form (`"BK000043"`); normalization strips the prefix and any
/// leading zeroes (spec §3, B1).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookId(String);

impl BookId {
    /// Normalize `raw` into a `BookId`. Fails if no digits remain after
    /// stripping a recognized prefix, or if the input is empty.
    pub fn normalize(raw: &str) -> Result<Self, String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err("empty book id".to_string());
        }
        let digits_start = trimmed
            .char_indices()
            .find(|(_, c)| c.is_ascii_digit())
            .map(|(i, _)| i);
        let Some(start) = digits_start else {
            return Err(format!("no digits in book id `{trimmed}`"));
        };
        let digit_run: String = trimmed[start..]
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        if digit_run.is_empty() {
            return Err(format!("no digits in book id `{trimmed}`"));
        }
        let stripped = digit_run.trim_start_matches('0');
        let normalized = if stripped.is_empty() { "0" } else { stripped };
        Ok(BookId(normalized.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BookId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An author credited on the book's landing page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub name: String,
    pub slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub biography: Option<String>,
    /// Theological/legal school affiliation, when stated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub school: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub death: Option<String>,
}

impl Author {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let slug = slugify(&name);
        Author {
            name,
            slug,
            biography: None,
            school: None,
            birth: None,
            death: None,
        }
    }
}

/// The publishing house, when stated on the landing page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Publisher {
    pub name: String,
    pub slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Publisher {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let slug = slugify(&name);
        Publisher {
            name,
            slug,
            location: None,
            description: None,
        }
    }
}

/// The subject/category the book is filed under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub name: String,
    pub slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Section {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let slug = slugify(&name);
        Section {
            name,
            slug,
            description: None,
        }
    }
}

/// A contiguous range of internal pages belonging to one physical volume.
///
/// Invariant: `page_start <= page_end`; across `BookDocument::volumes`
/// ranges are non-overlapping and partition `[1..page_count_internal]`
/// (spec §3, §8 I4).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    pub number: u32,
    pub title: String,
    pub page_start: u32,
    pub page_end: u32,
}

/// Whether a chapter is a top-level heading or a nested subsection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChapterKind {
    Main,
    Sub,
}

/// A node in the table-of-contents tree.
///
/// Invariants (spec §3, §8 I5/I6): `order` strictly increases among
/// siblings in document order; `level == 0` iff `kind == Main`;
/// `children[*].level == level + 1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    pub title: String,
    pub order: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_start: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_end: Option<u32>,
    pub level: u32,
    pub kind: ChapterKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_number: Option<u32>,
    pub children: Vec<Chapter>,
}

impl Chapter {
    /// Visit every chapter in the tree, depth-first, without recursion
    /// (spec §9: "explicit iteration to avoid stack depth concerns").
    pub fn visit_all<'a>(roots: &'a [Chapter]) -> Vec<&'a Chapter> {
        let mut stack: Vec<&Chapter> = roots.iter().rev().collect();
        let mut out = Vec::new();
        while let Some(c) = stack.pop() {
            out.push(c);
            for child in c.children.iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    /// Apply `f` to every chapter in the tree, depth-first, including
    /// nested children. Used by post-processing passes like volume
    /// assignment that need to mutate each node in place.
    pub fn for_each_mut(roots: &mut [Chapter], f: &mut impl FnMut(&mut Chapter)) {
        for chapter in roots.iter_mut() {
            f(chapter);
            Chapter::for_each_mut(&mut chapter.children, f);
        }
    }
}

/// One reading page's printed-vs-internal numbering and text.
///
/// See spec §3 for the full semantics of `page_number` / `printed_number`
/// / `printed_missing` and §8 I2/I3/I7 for the invariants that bind them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub internal_index: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub printed_number: Option<u32>,
    pub page_number: u32,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html_content: Option<String>,
    pub word_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chapter_order: Option<u32>,
    pub printed_missing: bool,
}

/// The root of an extracted book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookDocument {
    pub title: String,
    pub book_id: BookId,
    pub slug: String,
    pub authors: Vec<Author>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<Publisher>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<Section>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edition_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edition_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publication_year_gregorian: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publication_year_hijri: Option<i32>,
    pub page_count_internal: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count_printed: Option<u32>,
    pub volume_count: u32,
    pub volumes: Vec<Volume>,
    pub chapters: Vec<Chapter>,
    pub pages: Vec<Page>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub source_url: String,
    pub has_original_pagination: bool,
    pub language: String,
    pub extraction_timestamp: String,
}

impl BookDocument {
    /// Default language code when the source does not state one (spec §3).
    pub const DEFAULT_LANGUAGE: &'static str = "ar";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_prefixed_and_padded_ids() {
        assert_eq!(BookId::normalize("BK000043").unwrap().as_str(), "43");
        assert_eq!(BookId::normalize("43").unwrap().as_str(), "43");
        assert_eq!(BookId::normalize("00043").unwrap().as_str(), "43");
    }

    #[test]
    fn rejects_empty_and_non_digit_ids() {
        assert!(BookId::normalize("").is_err());
        assert!(BookId::normalize("BK-abc").is_err());
    }

    #[test]
    fn all_zero_id_normalizes_to_zero() {
        assert_eq!(BookId::normalize("0000").unwrap().as_str(), "0");
    }

    #[test]
    fn chapter_tree_visit_is_depth_first_preorder() {
        let tree = vec![Chapter {
            title: "root".into(),
            order: 1,
            page_start: Some(1),
            page_end: None,
            level: 0,
            kind: ChapterKind::Main,
            volume_number: None,
            children: vec![Chapter {
                title: "child".into(),
                order: 1001,
                page_start: Some(2),
                page_end: None,
                level: 1,
                kind: ChapterKind::Sub,
                volume_number: None,
                children: vec![],
            }],
        }];
        let visited: Vec<&str> = Chapter::visit_all(&tree).iter().map(|c| c.title.as_str()).collect();
        assert_eq!(visited, vec!["root", "child"]);
    }
}
