//! Web harvester for an Arabic digital library's paginated reading interface.
//!
//! The `shamela-harvester` crate (library name `shamela`) reconstructs a
//! structured representation of a book — bibliographic metadata, a
//! hierarchical table of contents, volumes with page ranges, and the full
//! text of every page — from a site that exposes no API, only rendered
//! HTML. Given a book identifier, [`core::orchestrator::extract`] drives
//! the whole pipeline and returns a [`core::model::BookDocument`].
//!
//! # CLI Reference
//!
//! Install the `shamela` binary and use its subcommands to harvest books
//! from the command line.
//!
//! ## Installation
//!
//! ```text
//! cargo install shamela-harvester
//! ```
//!
//! ## Subcommands
//!
//! | Command | Purpose |
//! |---------|---------|
//! | [`shamela extract`](cli::app::Commands::Extract) | Extract a single book into a JSON document |
//! | [`shamela category`](cli::app::Commands::Category) | Enumerate book identifiers in a category |
//!
//! ## Global options
//!
//! All subcommands accept `--color <auto|always|never>` and `--output <file>`.
//! `extract` accepts `--json`/`--compress` for output shaping and
//! `--resume` to continue from an on-disk checkpoint. See the [`cli`]
//! module for full details.
//!
//! # Library API
//!
//! Add `shamela` as a dependency to use the extraction core directly:
//!
//! ```toml
//! [dependencies]
//! shamela = { package = "shamela-harvester", version = "1" }
//! ```
//!
//! ## Quick example
//!
//! ```no_run
//! use shamela::core::orchestrator::extract;
//! use shamela::core::config::HarvestConfig;
//!
//! let config = HarvestConfig::default();
//! let document = extract("43", &config).unwrap();
//! println!("{} ({} pages)", document.title, document.page_count_internal);
//! ```
//!
//! ## Key entry points
//!
//! | Type / Function | Purpose |
//! |-----------------|---------|
//! | [`extract`](core::orchestrator::extract) | Run the full per-book extraction pipeline |
//! | [`BookDocument`](core::model::BookDocument) | Root of the extracted document |
//! | [`HarvestConfig`](core::config::HarvestConfig) | Tunable knobs for fetching, retry, caching, checkpointing |
//! | [`RetryEnvelope`](core::retry::RetryEnvelope) | Classifying, backing-off, self-healing HTTP wrapper |
//! | [`extract_category`](core::category::extract_category) | Enumerate book identifiers in a category |
//!
//! ## Module overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`core::model`] | The extracted data model (`BookDocument`, `Volume`, `Chapter`, `Page`, ...) |
//! | [`core::fetch`] | Single-URL HTTP GET with pooling and decoding |
//! | [`core::retry`] | Classifying retry/backoff/recovery envelope around the fetcher |
//! | [`core::cache`] | Bounded LRU response cache, with an optional persistent tier |
//! | [`core::extract`] | Pure HTML-to-fragment extractors |
//! | [`core::structure`] | Skeleton discovery (page counts, volumes, chapter tree) |
//! | [`core::pool`] | Concurrent page-content fetcher with ordered collection |
//! | [`core::checkpoint`] | Resumable checkpoints and rotating on-disk backups |
//! | [`core::validate`] | Response- and document-level quality checks |
//! | [`core::orchestrator`] | `extract()`'s state machine |
//! | [`core::serialize`] | JSON (optionally gzip-framed, optionally streamed) output |
//! | [`core::category`] | Category-listing enumeration (collaborator surface) |
//!
//! ## Feature flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli` | on | Builds the `shamela` binary (clap, colored, indicatif, ctrlc, env_logger). |
//! | `gzip` | on | Enables gzip framing in the serializer via `flate2`. |
//! | `sqlite-cache` | off | Enables the persistent response-cache tier via `rusqlite`. |

pub mod cli;
pub mod core;
pub mod util;

use thiserror::Error;

/// Errors returned by `shamela` operations, matching the taxonomy of
/// spec §7 one-to-one so callers can match on `kind` without string
/// parsing.
#[derive(Error, Debug)]
pub enum HarvestError {
    /// Book identifier normalization failed, or the first fetch of the
    /// landing page returned a permanent 404/410.
    #[error("invalid book id `{0}`")]
    InvalidBookId(String),

    /// The book's structure could not be reconciled: title missing, or
    /// volumes do not cover `[1..pageCountInternal]`.
    #[error("structure incomplete: {0}")]
    StructureIncomplete(String),

    /// A URL's transient failures were not resolved by retry and recovery,
    /// and no backup could be restored in its place.
    #[error("fetch failed for {url} after {attempts} attempts: {cause}")]
    FetchFailed {
        url: String,
        cause: String,
        attempts: u32,
    },

    /// The assembled document, or an individual response, failed a
    /// quality check below the configured threshold.
    #[error("quality below threshold: {metric} was {observed:.3}, required {required:.3}")]
    QualityBelowThreshold {
        metric: String,
        observed: f64,
        required: f64,
    },

    /// Extraction was cancelled via the pool's cooperative cancellation
    /// flag before completion.
    #[error("extraction cancelled")]
    Cancelled,

    /// An invariant was violated; always a bug, never a user-facing
    /// expected outcome.
    #[error("internal error: {0}")]
    Internal(String),
}

impl HarvestError {
    /// Machine-readable classification, mirroring the variant name, for
    /// callers that want to branch without a full `match`.
    pub fn kind(&self) -> &'static str {
        match self {
            HarvestError::InvalidBookId(_) => "InvalidBookID",
            HarvestError::StructureIncomplete(_) => "StructureIncomplete",
            HarvestError::FetchFailed { .. } => "FetchFailed",
            HarvestError::QualityBelowThreshold { .. } => "QualityBelowThreshold",
            HarvestError::Cancelled => "Cancelled",
            HarvestError::Internal(_) => "Internal",
        }
    }
}
