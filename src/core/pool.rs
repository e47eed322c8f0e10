//! C6: concurrent page-content fetcher.
//!
//! A fixed worker pool pulls internal page indices off a bounded
//! `crossbeam-channel` queue, fetches and extracts each one through the
//! shared [`RetryEnvelope`] and response [`ResponseCache`], and returns
//! results to the caller via an ordered collection channel. Workers apply
//! `request_delay` before each network fetch (not cache hits) and widen it
//! adaptively under sustained failure; a shared `AtomicBool` gives the
//! caller cooperative cancellation (spec §4.6).

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender};
use log::{debug, warn};

use crate::core::cache::ResponseCache;
use crate::core::config::HarvestConfig;
use crate::core::extract::{extract_page_body, extract_printed_page_number};
use crate::core::model::Page;
use crate::core::retry::RetryEnvelope;
use crate::core::validate;
use crate::HarvestError;

/// One page's fetch-and-extract outcome, tagged with its internal index
/// so the caller can sort results back into order regardless of the
/// order workers finish in.
pub struct PageResult {
    pub internal_index: u32,
    pub outcome: Result<Page, HarvestError>,
}

/// Signals the caller can use to stop a running pool early (Ctrl-C,
/// failure-rate escalation) and learn its live progress.
#[derive(Clone)]
pub struct PoolHandle {
    cancel: Arc<AtomicBool>,
    completed: Arc<AtomicU32>,
    failed: Arc<AtomicU32>,
}

impl PoolHandle {
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> u32 {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn failed(&self) -> u32 {
        self.failed.load(Ordering::SeqCst)
    }
}

/// Fetch every page in `1..=page_count_internal` except those already in
/// `skip` (pages a resumed checkpoint already supplied, spec §4.7/§4.9),
/// bounded by `config.max_pages` if set, using `config.max_workers`
/// threads. Calls `on_result` from the caller's thread as each page
/// completes so it can checkpoint at `config.checkpoint_interval`
/// boundaries. `cancel` is shared with the caller (e.g. a Ctrl-C handler)
/// — set it from another thread to stop the pool early; workers finish
/// in-flight requests but stop pulling new jobs. Blocks until every
/// outstanding page has been attempted or cancellation takes effect, then
/// returns progress counters.
#[allow(clippy::too_many_arguments)]
pub fn fetch_pages(
    envelope: &RetryEnvelope,
    cache: &ResponseCache,
    config: &HarvestConfig,
    base_url: &str,
    book_id: &str,
    page_count_internal: u32,
    has_original_pagination: bool,
    skip: &HashSet<u32>,
    cancel: Arc<AtomicBool>,
    mut on_result: impl FnMut(PageResult),
) -> PoolHandle {
    let handle = PoolHandle {
        cancel,
        completed: Arc::new(AtomicU32::new(0)),
        failed: Arc::new(AtomicU32::new(0)),
    };

    let total = config.max_pages.unwrap_or(page_count_internal).min(page_count_internal);
    let (job_tx, job_rx): (Sender<u32>, Receiver<u32>) = bounded(config.max_workers * 2);
    let (result_tx, result_rx): (Sender<PageResult>, Receiver<PageResult>) = bounded(config.max_workers * 2);

    let worker_count = config.max_workers.max(1);
    thread::scope(|scope| {
        for _ in 0..worker_count {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            let cancel = handle.cancel.clone();
            scope.spawn(move || {
                worker_loop(
                    job_rx,
                    result_tx,
                    envelope,
                    cache,
                    config,
                    base_url,
                    book_id,
                    has_original_pagination,
                    &cancel,
                );
            });
        }
        drop(result_tx);

        let producer_cancel = handle.cancel.clone();
        scope.spawn(move || {
            for i in 1..=total {
                if producer_cancel.load(Ordering::SeqCst) {
                    break;
                }
                if skip.contains(&i) {
                    continue;
                }
                if job_tx.send(i).is_err() {
                    break;
                }
            }
            drop(job_tx);
        });

        for result in result_rx.iter() {
            match &result.outcome {
                Ok(_) => {
                    handle.completed.fetch_add(1, Ordering::SeqCst);
                }
                Err(_) => {
                    handle.failed.fetch_add(1, Ordering::SeqCst);
                }
            }
            maybe_escalate(&handle, config);
            on_result(result);
        }
    });

    handle
}

/// Escalate to cancellation when the running failure rate exceeds the
/// configured ceiling over a meaningful sample (spec §4.6: avoid grinding
/// through a site that has started blocking every request).
fn maybe_escalate(handle: &PoolHandle, config: &HarvestConfig) {
    let completed = handle.completed.load(Ordering::SeqCst);
    let failed = handle.failed.load(Ordering::SeqCst);
    let total = completed + failed;
    if (total as usize) < config.min_sample_size {
        return;
    }
    let failure_rate = failed as f64 / total as f64;
    if failure_rate > (1.0 - config.quality_threshold).max(0.5) {
        warn!("page pool failure rate {failure_rate:.2} exceeds tolerance, cancelling");
        handle.cancel();
    }
}

#[allow(clippy::too_many_arguments)]
fn worker_loop(
    jobs: Receiver<u32>,
    results: Sender<PageResult>,
    envelope: &RetryEnvelope,
    cache: &ResponseCache,
    config: &HarvestConfig,
    base_url: &str,
    book_id: &str,
    has_original_pagination: bool,
    cancel: &AtomicBool,
) {
    let mut delay = config.request_delay;
    for internal_index in jobs.iter() {
        if cancel.load(Ordering::SeqCst) {
            break;
        }
        let outcome = fetch_one_page(
            envelope,
            cache,
            config,
            base_url,
            book_id,
            internal_index,
            has_original_pagination,
            &mut delay,
        );
        if results.send(PageResult { internal_index, outcome }).is_err() {
            break;
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn fetch_one_page(
    envelope: &RetryEnvelope,
    cache: &ResponseCache,
    config: &HarvestConfig,
    base_url: &str,
    book_id: &str,
    internal_index: u32,
    has_original_pagination: bool,
    delay: &mut Duration,
) -> Result<Page, HarvestError> {
    let url = format!("{}/book/{}/{}", base_url.trim_end_matches('/'), book_id, internal_index);

    let response = if let Some(cached) = cache.get(&url) {
        cached
    } else {
        if !delay.is_zero() {
            thread::sleep(*delay);
        }
        let resp = envelope.fetch(&url).map_err(|e| {
            widen_on_failure(delay, config);
            HarvestError::FetchFailed {
                url: url.clone(),
                cause: e.to_string(),
                attempts: 1,
            }
        })?;
        if let Err(e) = validate::check_response(&resp.body, config) {
            widen_on_failure(delay, config);
            return Err(e);
        }
        narrow_on_success(delay, config);
        cache.put(&url, resp.clone());
        resp
    };

    let doc = scraper::Html::parse_document(&response.body);
    let body = extract_page_body(&doc);
    let title_text = doc
        .select(&scraper::Selector::parse("title").unwrap())
        .next()
        .map(|el| el.text().collect::<String>())
        .unwrap_or_default();
    let printed_number = extract_printed_page_number(&title_text);

    debug!("fetched page {internal_index} ({} words)", body.word_count);

    // Spec §3: pageNumber tracks the source's own printed numbering when
    // the edition has one and it was recovered; otherwise it falls back
    // to the internal (sequential) index.
    let page_number = if has_original_pagination {
        printed_number.unwrap_or(internal_index)
    } else {
        internal_index
    };

    Ok(Page {
        internal_index,
        printed_number,
        page_number,
        content: body.text,
        html_content: body.html,
        word_count: body.word_count,
        volume_number: None,
        chapter_order: None,
        printed_missing: printed_number.is_none(),
    })
}

/// Double the per-fetch delay (capped) after a failure, so a struggling
/// origin gets backed off without needing a full retry-envelope recovery.
fn widen_on_failure(delay: &mut Duration, config: &HarvestConfig) {
    let widened = delay.mul_f64(2.0).min(config.retry_backoff_cap);
    *delay = widened.max(config.request_delay);
}

/// Relax the per-fetch delay back toward the configured baseline after a
/// success, one step at a time rather than snapping back immediately.
fn narrow_on_success(delay: &mut Duration, config: &HarvestConfig) {
    if *delay > config.request_delay {
        *delay = Duration::from_secs_f64((delay.as_secs_f64() * 0.75).max(config.request_delay.as_secs_f64()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widen_then_narrow_stays_within_bounds() {
        let config = HarvestConfig {
            request_delay: Duration::from_millis(100),
            retry_backoff_cap: Duration::from_millis(800),
            ..HarvestConfig::default()
        };
        let mut delay = config.request_delay;
        widen_on_failure(&mut delay, &config);
        widen_on_failure(&mut delay, &config);
        assert!(delay <= config.retry_backoff_cap);
        narrow_on_success(&mut delay, &config);
        narrow_on_success(&mut delay, &config);
        narrow_on_success(&mut delay, &config);
        assert!(delay >= config.request_delay);
    }

    #[test]
    fn pool_handle_reports_progress_and_cancellation() {
        let handle = PoolHandle {
            cancel: Arc::new(AtomicBool::new(false)),
            completed: Arc::new(AtomicU32::new(3)),
            failed: Arc::new(AtomicU32::new(1)),
        };
        assert_eq!(handle.completed(), 3);
        assert_eq!(handle.failed(), 1);
        assert!(!handle.is_cancelled());
        handle.cancel();
        assert!(handle.is_cancelled());
    }
}
