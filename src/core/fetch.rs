//! C1: single-URL HTTP GET with connection pooling and header injection.
//!
//! The fetcher does not retry and does not inspect response bodies beyond
//! decoding; that is [`crate::core::retry::RetryEnvelope`]'s job.

use std::time::{Duration, Instant};

use thiserror::Error;

use crate::core::config::HarvestConfig;

/// A decoded HTTP response.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub body: String,
    pub fetched_at: Instant,
}

/// Failure modes the fetcher itself can observe. Does not include HTTP
/// status codes that are not errors at the transport level — those are
/// carried in [`Response::status`] and classified by the retry envelope.
#[derive(Debug, Error, Clone)]
pub enum FetchError {
    #[error("timeout fetching {0}")]
    Timeout(String),
    #[error("DNS resolution failed for {0}")]
    Dns(String),
    #[error("transport closed for {0}")]
    TransportClosed(String),
    #[error("TLS error for {0}")]
    Tls(String),
    #[error("HTTP {0}")]
    Http(u16),
}

/// Wraps a single process-wide `reqwest` client. The fetcher never opens
/// a new transport per request; [`Fetcher::rebuild`] is the only way to
/// replace the underlying pool, used by the retry envelope's recovery
/// path (spec §4.2).
pub struct Fetcher {
    client: reqwest::blocking::Client,
    accept_language: String,
}

impl Fetcher {
    pub fn new(config: &HarvestConfig) -> Self {
        Fetcher {
            client: build_client(config),
            accept_language: config.accept_language.clone(),
        }
    }

    /// Tear down and rebuild the underlying transport, used after
    /// repeated transient failures (spec §4.2 recovery level).
    pub fn rebuild(&mut self, config: &HarvestConfig) {
        self.client = build_client(config);
    }

    /// Perform a single GET with no retry. Transparent gzip decoding is
    /// negotiated by `reqwest`'s `gzip` feature.
    pub fn fetch(&self, url: &str) -> Result<Response, FetchError> {
        let result = self
            .client
            .get(url)
            .header("Accept-Language", &self.accept_language)
            .send();

        let resp = match result {
            Ok(r) => r,
            Err(e) => return Err(classify_transport_error(&e, url)),
        };

        let status = resp.status().as_u16();
        let body = resp
            .text()
            .map_err(|e| classify_transport_error(&e, url))?;

        Ok(Response {
            status,
            body,
            fetched_at: Instant::now(),
        })
    }
}

fn build_client(config: &HarvestConfig) -> reqwest::blocking::Client {
    // reqwest's blocking client exposes a single overall request timeout
    // rather than separate connect/read phases; `total_timeout` governs
    // the whole request and `connect_timeout` the handshake only.
    reqwest::blocking::Client::builder()
        .connect_timeout(config.connect_timeout)
        .timeout(config.total_timeout)
        .pool_idle_timeout(Duration::from_secs(90))
        .user_agent(&config.user_agent)
        .gzip(true)
        .build()
        .expect("reqwest client configuration is always valid")
}

fn classify_transport_error(e: &reqwest::Error, url: &str) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout(url.to_string())
    } else if e.is_connect() {
        FetchError::Dns(url.to_string())
    } else if e.status().is_some() {
        FetchError::Http(e.status().unwrap().as_u16())
    } else {
        FetchError::TransportClosed(url.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetcher_builds_with_default_config() {
        let config = HarvestConfig::default();
        let _fetcher = Fetcher::new(&config);
    }
}
