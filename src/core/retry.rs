//! C2: bounded, classifying retry loop wrapped around [`crate::core::fetch::Fetcher`].
//!
//! Grounded on `ultra_reliability_system.py`'s `UltraReliableSession` /
//! `ReliabilityMonitor`: classify each failure as permanent or transient,
//! back off exponentially between attempts, and escalate to a one-shot
//! "recovery" pass (fresh transport, reset counters) after exhausting the
//! ordinary retry budget.

use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use log::warn;

use crate::core::config::HarvestConfig;
use crate::core::fetch::{FetchError, Fetcher, Response};

/// Outcome of classifying a [`FetchError`] or HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Never retried; surfaced immediately to the caller.
    Permanent,
    /// Eligible for backoff retry and, if exhausted, recovery.
    Transient,
}

/// Classify an HTTP status code per spec §4.2.
pub fn classify_status(status: u16) -> Classification {
    match status {
        404 | 403 | 410 => Classification::Permanent,
        429 | 500 | 502 | 503 | 504 | 520..=524 => Classification::Transient,
        _ if (200..300).contains(&status) => Classification::Transient, // not an error path
        _ => Classification::Permanent,
    }
}

/// Classify a [`FetchError`] per spec §4.2: all of `Timeout`, `DNS`,
/// `TransportClosed` are transient; `Http(status)` defers to
/// [`classify_status`]; `TLS` is treated as transient (a handshake hiccup,
/// not a policy rejection).
pub fn classify_fetch_error(err: &FetchError) -> Classification {
    match err {
        FetchError::Timeout(_) | FetchError::Dns(_) | FetchError::TransportClosed(_) => {
            Classification::Transient
        }
        FetchError::Tls(_) => Classification::Transient,
        FetchError::Http(status) => classify_status(*status),
    }
}

/// A response-or-permanent-status pair the envelope surfaces to the
/// caller without further retry.
#[derive(Debug, Clone)]
pub enum EnvelopeError {
    /// A permanently classified HTTP status (404/403/410).
    PermanentHttp { url: String, status: u16 },
    /// Retries and recovery were both exhausted.
    TransientExhausted {
        url: String,
        last_error: String,
        attempts: u32,
    },
}

impl std::fmt::Display for EnvelopeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EnvelopeError::PermanentHttp { url, status } => {
                write!(f, "permanent HTTP {status} for {url}")
            }
            EnvelopeError::TransientExhausted {
                url,
                last_error,
                attempts,
            } => write!(f, "{url} failed after {attempts} attempts: {last_error}"),
        }
    }
}

/// Health counters tracked across every call through the envelope
/// (spec §4.2).
#[derive(Debug, Clone)]
pub struct EnvelopeHealth {
    pub total_requests: u64,
    pub successes: u64,
    pub failures: u64,
    pub retries_used: u64,
    pub recoveries_performed: u64,
    pub consecutive_failures: u32,
    pub last_success: Option<Instant>,
    pub started_at: Instant,
}

impl EnvelopeHealth {
    fn new() -> Self {
        let now = Instant::now();
        EnvelopeHealth {
            total_requests: 0,
            successes: 0,
            failures: 0,
            retries_used: 0,
            recoveries_performed: 0,
            consecutive_failures: 0,
            last_success: None,
            started_at: now,
        }
    }

    /// Unhealthy when consecutive failures exceed the configured ceiling
    /// or no success has been observed in the last 5 minutes (spec §4.2).
    pub fn is_healthy(&self, max_consecutive_failures: u32) -> bool {
        if self.consecutive_failures >= max_consecutive_failures {
            return false;
        }
        match self.last_success {
            Some(t) => t.elapsed() < Duration::from_secs(300),
            None => self.started_at.elapsed() < Duration::from_secs(300),
        }
    }
}

struct Inner {
    fetcher: Fetcher,
    health: EnvelopeHealth,
}

/// The retry/recovery wrapper. One instance is created per `extract` call
/// and shared (behind a `Mutex`) across pool workers.
pub struct RetryEnvelope {
    inner: Mutex<Inner>,
    config: HarvestConfig,
}

impl RetryEnvelope {
    pub fn new(config: HarvestConfig) -> Self {
        let fetcher = Fetcher::new(&config);
        RetryEnvelope {
            inner: Mutex::new(Inner {
                fetcher,
                health: EnvelopeHealth::new(),
            }),
            config,
        }
    }

    /// Snapshot of the current health counters.
    pub fn health(&self) -> EnvelopeHealth {
        self.inner.lock().unwrap().health.clone()
    }

    pub fn is_healthy(&self) -> bool {
        self.inner
            .lock()
            .unwrap()
            .health
            .is_healthy(self.config.max_consecutive_failures)
    }

    /// Fetch `url`, retrying transient failures with exponential backoff
    /// up to `max_retries`, then performing one recovery pass (transport
    /// rebuild + bounded retries) if still failing. Permanent
    /// classifications return immediately without consuming the retry
    /// budget.
    pub fn fetch(&self, url: &str) -> Result<Response, EnvelopeError> {
        let mut attempts = 0u32;
        let mut last_error = String::new();

        for attempt in 1..=self.config.max_retries {
            attempts = attempt;
            if attempt > 1 {
                thread::sleep(self.backoff_delay(attempt - 1));
            }

            match self.attempt(url) {
                Ok(resp) => {
                    self.record_success();
                    return Ok(resp);
                }
                Err(Classified::Permanent(status)) => {
                    self.record_failure();
                    return Err(EnvelopeError::PermanentHttp {
                        url: url.to_string(),
                        status,
                    });
                }
                Err(Classified::Transient(msg)) => {
                    self.record_failure();
                    self.record_retry();
                    last_error = msg;
                    warn!("transient failure on {url} (attempt {attempt}): {last_error}");
                }
            }
        }

        self.recover(url, attempts, last_error)
    }

    fn attempt(&self, url: &str) -> Result<Response, Classified> {
        let result = {
            let inner = self.inner.lock().unwrap();
            inner.fetcher.fetch(url)
        };
        match result {
            Ok(resp) if (200..300).contains(&resp.status) => Ok(resp),
            Ok(resp) => match classify_status(resp.status) {
                Classification::Permanent => Err(Classified::Permanent(resp.status)),
                Classification::Transient => {
                    Err(Classified::Transient(format!("HTTP {}", resp.status)))
                }
            },
            Err(e) => match classify_fetch_error(&e) {
                Classification::Permanent => match e {
                    FetchError::Http(status) => Err(Classified::Permanent(status)),
                    other => Err(Classified::Transient(other.to_string())),
                },
                Classification::Transient => Err(Classified::Transient(e.to_string())),
            },
        }
    }

    fn backoff_delay(&self, k: u32) -> Duration {
        let factor = self.config.retry_backoff_factor.powi(k as i32 - 1);
        let base = self.config.retry_base_delay.as_secs_f64();
        let jitter = (k as f64 * 37.0 % 100.0) / 1000.0; // small deterministic jitter
        let secs = (base * factor + jitter).min(self.config.retry_backoff_cap.as_secs_f64());
        Duration::from_secs_f64(secs.max(0.0))
    }

    /// One recovery pass: rebuild the transport, reset the local attempt
    /// counter, and retry up to `recovery_attempts` times with fixed
    /// spacing (spec §4.2).
    fn recover(&self, url: &str, prior_attempts: u32, mut last_error: String) -> Result<Response, EnvelopeError> {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.fetcher.rebuild(&self.config);
            inner.health.recoveries_performed += 1;
            inner.health.consecutive_failures = 0;
        }
        warn!("{url}: retry budget exhausted, performing transport recovery");

        let mut attempts = prior_attempts;
        for attempt in 1..=self.config.recovery_attempts {
            attempts += 1;
            if attempt > 1 {
                thread::sleep(self.config.recovery_delay);
            }
            match self.attempt(url) {
                Ok(resp) if (200..300).contains(&resp.status) => {
                    self.record_success();
                    return Ok(resp);
                }
                Ok(resp) => {
                    if let Classification::Permanent = classify_status(resp.status) {
                        self.record_failure();
                        return Err(EnvelopeError::PermanentHttp {
                            url: url.to_string(),
                            status: resp.status,
                        });
                    }
                    last_error = format!("HTTP {}", resp.status);
                    self.record_failure();
                }
                Err(Classified::Permanent(status)) => {
                    self.record_failure();
                    return Err(EnvelopeError::PermanentHttp {
                        url: url.to_string(),
                        status,
                    });
                }
                Err(Classified::Transient(msg)) => {
                    last_error = msg;
                    self.record_failure();
                }
            }
        }

        Err(EnvelopeError::TransientExhausted {
            url: url.to_string(),
            last_error,
            attempts,
        })
    }

    fn record_success(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.health.total_requests += 1;
        inner.health.successes += 1;
        inner.health.consecutive_failures = 0;
        inner.health.last_success = Some(Instant::now());
    }

    fn record_failure(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.health.total_requests += 1;
        inner.health.failures += 1;
        inner.health.consecutive_failures += 1;
    }

    fn record_retry(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.health.retries_used += 1;
    }
}

enum Classified {
    Permanent(u16),
    Transient(String),
}
