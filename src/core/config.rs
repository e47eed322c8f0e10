//! Tunable knobs passed to [`crate::core::orchestrator::extract`].
//!
//! No environment variables are consulted by the core (spec §6.5); the CLI
//! collaborator is responsible for populating a `HarvestConfig` from flags
//! or a config file.

use std::time::Duration;

/// Configuration record for a single `extract` call.
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    /// Base URL of the source site, e.g. `https://example-library.test`.
    pub base_url: String,
    /// Cap the number of pages fetched (for smoke-testing large books).
    pub max_pages: Option<u32>,
    /// Worker count for the page fetcher pool (spec §4.6: default 8-20).
    pub max_workers: usize,
    /// Reserved for future batched scheduling; currently advisory only.
    pub batch_size: usize,
    /// Base per-fetch delay applied before each HTTP request (not cache
    /// hits), adaptively scaled under sustained failure (spec §4.6).
    pub request_delay: Duration,
    pub max_retries: u32,
    pub retry_backoff_factor: f64,
    pub retry_base_delay: Duration,
    pub retry_backoff_cap: Duration,
    pub recovery_attempts: u32,
    pub recovery_delay: Duration,
    pub max_consecutive_failures: u32,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub total_timeout: Duration,
    pub cache_size: usize,
    pub cache_duration: Duration,
    pub persistent_cache: bool,
    pub quality_threshold: f64,
    pub min_sample_size: usize,
    pub min_content_length: usize,
    pub checkpoint_interval: u32,
    pub enable_resume: bool,
    pub enable_compression: bool,
    pub stream_json: bool,
    pub stream_threshold: usize,
    pub user_agent: String,
    pub accept_language: String,
    /// Directory where checkpoint and backup files are written.
    pub checkpoint_dir: std::path::PathBuf,
    /// Number of rotating backups retained per book (spec §4.7: 5-10).
    pub max_backups: usize,
    /// Maximum fraction of empty pages tolerated at document level
    /// (spec §4.8).
    pub max_empty_page_fraction: f64,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        HarvestConfig {
            base_url: "https://example-library.test".to_string(),
            max_pages: None,
            max_workers: 12,
            batch_size: 20,
            request_delay: Duration::from_millis(100),
            max_retries: 5,
            retry_backoff_factor: 1.5,
            retry_base_delay: Duration::from_millis(500),
            retry_backoff_cap: Duration::from_secs(30),
            recovery_attempts: 5,
            recovery_delay: Duration::from_secs(3),
            max_consecutive_failures: 10,
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(30),
            total_timeout: Duration::from_secs(60),
            cache_size: 1000,
            cache_duration: Duration::from_secs(3600),
            persistent_cache: false,
            quality_threshold: 0.95,
            min_sample_size: 20,
            min_content_length: 50,
            checkpoint_interval: 25,
            enable_resume: true,
            enable_compression: false,
            stream_json: false,
            stream_threshold: 1000,
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) \
                         Chrome/124.0 Safari/537.36"
                .to_string(),
            accept_language: "ar,en-US;q=0.7,en;q=0.3".to_string(),
            checkpoint_dir: std::path::PathBuf::from(".shamela-checkpoints"),
            max_backups: 5,
            max_empty_page_fraction: 0.05,
        }
    }
}
