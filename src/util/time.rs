//! Timestamp formatting for the data model's `extractionTimestamp` field.

use chrono::Utc;

/// Current UTC instant as an RFC 3339 string, e.g.
/// `"2026-01-01T00:00:00.123456789+00:00"`.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}
