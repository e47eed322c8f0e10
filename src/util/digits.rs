//! Arabic-Indic digit handling.
//!
//! The source site renders page numbers with either ASCII digits or the
//! Arabic-Indic block (U+0660..U+0669), sometimes mixed within the same
//! string. [`to_ascii_digits`] normalizes a string so the rest of the
//! extraction pipeline never has to special-case the script.

/// Map each Arabic-Indic digit in `s` to its ASCII equivalent, leaving
/// every other character untouched.
pub fn to_ascii_digits(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '\u{0660}'..='\u{0669}' => {
                char::from_digit(c as u32 - '\u{0660}' as u32, 10).unwrap_or(c)
            }
            _ => c,
        })
        .collect()
}

/// Parse the first contiguous run of digits (ASCII or Arabic-Indic) found
/// in `s` as a `u32`. Returns `None` if no digits are present.
pub fn first_number(s: &str) -> Option<u32> {
    let normalized = to_ascii_digits(s);
    let mut digits = String::new();
    let mut started = false;
    for c in normalized.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            started = true;
        } else if started {
            break;
        }
    }
    if digits.is_empty() {
        None
    } else {
        digits.parse().ok()
    }
}
