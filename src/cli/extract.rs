use std::io::Write;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use colored::Colorize;

use crate::cli::{create_spinner, wprintln};
use crate::core::config::HarvestConfig;
use crate::core::orchestrator::extract_with_cancel;
use crate::HarvestError;

pub struct ExtractOptions {
    pub book_id: String,
    pub base_url: Option<String>,
    pub compress: bool,
    pub resume: bool,
    pub workers: Option<usize>,
    pub max_pages: Option<u32>,
    pub checkpoint_dir: Option<String>,
}

pub fn execute(opts: &ExtractOptions, writer: &mut dyn Write) -> Result<(), HarvestError> {
    let mut config = HarvestConfig::default();
    if let Some(base_url) = &opts.base_url {
        config.base_url = base_url.clone();
    }
    config.enable_compression = opts.compress;
    config.enable_resume = opts.resume;
    if let Some(workers) = opts.workers {
        config.max_workers = workers;
    }
    if opts.max_pages.is_some() {
        config.max_pages = opts.max_pages;
    }
    if let Some(dir) = &opts.checkpoint_dir {
        config.checkpoint_dir = std::path::PathBuf::from(dir);
    }

    let cancel = Arc::new(AtomicBool::new(false));
    let handler_cancel = cancel.clone();
    let _ = ctrlc::set_handler(move || {
        handler_cancel.store(true, std::sync::atomic::Ordering::SeqCst);
    });

    let spinner = create_spinner("discovering structure and fetching pages...");
    let result = extract_with_cancel(&opts.book_id, &config, cancel);

    match result {
        Ok(document) => {
            spinner.finish_with_message(format!(
                "{} {} ({} pages)",
                "extracted".green().bold(),
                document.title,
                document.page_count_internal
            ));
            let bytes = crate::core::serialize::serialize(&document, &config)?;
            writer
                .write_all(&bytes)
                .map_err(|e| HarvestError::Internal(e.to_string()))?;
            if !opts.compress {
                wprintln!(writer)?;
            }
            Ok(())
        }
        Err(e) => {
            spinner.finish_with_message(format!("{} {e}", "failed".red().bold()));
            Err(e)
        }
    }
}
