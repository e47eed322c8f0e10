//! C3: fingerprint→response store, bounded by entry count (LRU), with an
//! optional persistent tier.
//!
//! The cache is transparent: a hit satisfies the fetcher contract
//! including body; a miss proceeds through C1/C2 and is written back on
//! return. Reads check memory then the persistent tier; writes populate
//! both. Entries older than `cache_duration` are treated as misses and
//! are not proactively evicted (spec §4.3).

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use lru::LruCache;

use crate::core::fetch::Response;

#[derive(Clone)]
struct Entry {
    response: Response,
    stored_at: Instant,
}

/// In-memory LRU tier, optionally backed by a persistent key-value store
/// keyed by URL (see the `sqlite-cache` feature).
pub struct ResponseCache {
    memory: Mutex<LruCache<String, Entry>>,
    ttl: Duration,
    #[cfg(feature = "sqlite-cache")]
    persistent: Option<Mutex<rusqlite::Connection>>,
}

impl ResponseCache {
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        let cap = NonZeroUsize::new(max_entries.max(1)).unwrap();
        ResponseCache {
            memory: Mutex::new(LruCache::new(cap)),
            ttl,
            #[cfg(feature = "sqlite-cache")]
            persistent: None,
        }
    }

    #[cfg(feature = "sqlite-cache")]
    pub fn with_persistent_tier(max_entries: usize, ttl: Duration, path: &std::path::Path) -> rusqlite::Result<Self> {
        let conn = rusqlite::Connection::open(path)?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS cache (
                url TEXT PRIMARY KEY,
                status INTEGER NOT NULL,
                body TEXT NOT NULL,
                stored_at INTEGER NOT NULL
            )",
            [],
        )?;
        let cap = NonZeroUsize::new(max_entries.max(1)).unwrap();
        Ok(ResponseCache {
            memory: Mutex::new(LruCache::new(cap)),
            ttl,
            persistent: Some(Mutex::new(conn)),
        })
    }

    /// Look up `url`. Checks memory first, then the persistent tier if
    /// configured; a persistent hit is promoted back into memory.
    pub fn get(&self, url: &str) -> Option<Response> {
        {
            let mut memory = self.memory.lock().unwrap();
            if let Some(entry) = memory.get(url) {
                if entry.stored_at.elapsed() < self.ttl {
                    return Some(entry.response.clone());
                }
                memory.pop(url);
            }
        }

        #[cfg(feature = "sqlite-cache")]
        {
            if let Some(found) = self.get_persistent(url) {
                self.put_memory_only(url, found.clone());
                return Some(found);
            }
        }

        None
    }

    /// Insert `response` for `url` into both tiers.
    pub fn put(&self, url: &str, response: Response) {
        self.put_memory_only(url, response.clone());

        #[cfg(feature = "sqlite-cache")]
        self.put_persistent(url, &response);
    }

    fn put_memory_only(&self, url: &str, response: Response) {
        let mut memory = self.memory.lock().unwrap();
        memory.put(
            url.to_string(),
            Entry {
                response,
                stored_at: Instant::now(),
            },
        );
    }

    #[cfg(feature = "sqlite-cache")]
    fn get_persistent(&self, url: &str) -> Option<Response> {
        let persistent = self.persistent.as_ref()?;
        let conn = persistent.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT status, body, stored_at FROM cache WHERE url = ?1")
            .ok()?;
        let row: Option<(u16, String, i64)> = stmt
            .query_row([url], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)))
            .ok();
        let (status, body, stored_at) = row?;
        let age = now_unix().saturating_sub(stored_at);
        if age as u64 > self.ttl.as_secs() {
            return None;
        }
        Some(Response {
            status,
            body,
            fetched_at: Instant::now(),
        })
    }

    #[cfg(feature = "sqlite-cache")]
    fn put_persistent(&self, url: &str, response: &Response) {
        let Some(persistent) = self.persistent.as_ref() else {
            return;
        };
        let conn = persistent.lock().unwrap();
        let _ = conn.execute(
            "INSERT INTO cache (url, status, body, stored_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(url) DO UPDATE SET status=excluded.status, body=excluded.body, stored_at=excluded.stored_at",
            rusqlite::params![url, response.status, response.body, now_unix()],
        );
    }
}

#[cfg(feature = "sqlite-cache")]
fn now_unix() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_response(status: u16, body: &str) -> Response {
        Response {
            status,
            body: body.to_string(),
            fetched_at: Instant::now(),
        }
    }

    #[test]
    fn miss_then_hit() {
        let cache = ResponseCache::new(10, Duration::from_secs(60));
        assert!(cache.get("https://x/1").is_none());
        cache.put("https://x/1", sample_response(200, "hello"));
        let hit = cache.get("https://x/1").unwrap();
        assert_eq!(hit.body, "hello");
    }

    #[test]
    fn evicts_least_recently_used_beyond_capacity() {
        let cache = ResponseCache::new(2, Duration::from_secs(60));
        cache.put("a", sample_response(200, "a"));
        cache.put("b", sample_response(200, "b"));
        cache.put("c", sample_response(200, "c"));
        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn expired_entry_is_treated_as_miss() {
        let cache = ResponseCache::new(10, Duration::from_millis(1));
        cache.put("a", sample_response(200, "a"));
        std::thread::sleep(Duration::from_millis(10));
        assert!(cache.get("a").is_none());
    }
}
