//! Text normalization helpers shared by the extractors and the data model.

use unicode_normalization::UnicodeNormalization;

/// Count whitespace-separated tokens, matching `Page.wordCount`'s
/// definition in the data model (`len(split(content, whitespace))`).
pub fn word_count(content: &str) -> usize {
    content.split_whitespace().filter(|s| !s.is_empty()).count()
}

/// Derive a URL-safe slug from a title: unicode-normalize (NFKC), lowercase,
/// collapse whitespace to `-`, and strip punctuation outside alphanumerics
/// and the Arabic script blocks.
pub fn slugify(title: &str) -> String {
    let normalized: String = title.nfkc().collect::<String>().to_lowercase();
    let mut slug = String::with_capacity(normalized.len());
    let mut last_was_dash = true; // suppress leading dash
    for c in normalized.chars() {
        let keep = c.is_alphanumeric() || is_arabic(c);
        if keep {
            slug.push(c);
            last_was_dash = false;
        } else if !last_was_dash {
            slug.push('-');
            last_was_dash = true;
        }
    }
    slug.trim_end_matches('-').to_string()
}

fn is_arabic(c: char) -> bool {
    matches!(c as u32, 0x0600..=0x06FF | 0x0750..=0x077F | 0xFB50..=0xFDFF | 0xFE70..=0xFEFF)
}

/// Fraction of characters in `s` that fall in an Arabic script block,
/// ignoring whitespace and digits. Used by the validator's content-quality
/// check (spec §4.8) and the page body extractor's line filter (§4.4).
pub fn arabic_ratio(s: &str) -> f64 {
    let mut total = 0usize;
    let mut arabic = 0usize;
    for c in s.chars() {
        if c.is_whitespace() || c.is_ascii_digit() {
            continue;
        }
        total += 1;
        if is_arabic(c) {
            arabic += 1;
        }
    }
    if total == 0 {
        0.0
    } else {
        arabic as f64 / total as f64
    }
}

/// True iff the trimmed string consists only of digits (ASCII or
/// Arabic-Indic), used to drop page-number furniture lines from body text.
pub fn is_purely_digits(s: &str) -> bool {
    let trimmed = s.trim();
    !trimmed.is_empty()
        && trimmed
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '\u{0660}'..='\u{0669}'))
}
