//! C7: resumable checkpoints and rotating on-disk backups.
//!
//! A checkpoint captures the pages fetched so far for one book so a
//! restarted run can skip straight to the remaining work instead of
//! re-fetching everything (spec §4.7). Backups are full, successfully
//! assembled documents kept around under a retention limit in case a
//! later run corrupts or loses the canonical output file.
//!
//! Every write goes through [`crate::util::fs::atomic_write`].

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::core::config::HarvestConfig;
use crate::core::model::Page;
use crate::util::fs::{atomic_write, list_matching};
use crate::HarvestError;

/// On-disk shape of an in-progress extraction, written every
/// `config.checkpoint_interval` pages (spec §4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointState {
    pub book_id: String,
    pub page_count_internal: u32,
    pub pages: Vec<Page>,
    pub saved_at_unix: u64,
}

fn checkpoint_path(config: &HarvestConfig, book_id: &str) -> PathBuf {
    config.checkpoint_dir.join(format!("book_{book_id}.checkpoint.json"))
}

fn backup_prefix(book_id: &str) -> String {
    format!("book_{book_id}.backup.")
}

fn backup_path(config: &HarvestConfig, book_id: &str, seq: u64) -> PathBuf {
    config.checkpoint_dir.join(format!("{}{:06}.json", backup_prefix(book_id), seq))
}

fn now_unix() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

/// Write the current progress for `book_id`, overwriting any prior
/// checkpoint for the same book.
pub fn save(config: &HarvestConfig, book_id: &str, page_count_internal: u32, pages: &[Page]) -> Result<(), HarvestError> {
    if !config.enable_resume {
        return Ok(());
    }
    let state = CheckpointState {
        book_id: book_id.to_string(),
        page_count_internal,
        pages: pages.to_vec(),
        saved_at_unix: now_unix(),
    };
    let bytes = serde_json::to_vec(&state)
        .map_err(|e| HarvestError::Internal(format!("cannot serialize checkpoint: {e}")))?;
    atomic_write(&checkpoint_path(config, book_id), &bytes)
}

/// Load a prior checkpoint for `book_id`, if one exists and resume is
/// enabled. A malformed checkpoint is treated as absent rather than as a
/// fatal error, so a corrupted resume file never blocks a fresh run.
pub fn load(config: &HarvestConfig, book_id: &str) -> Option<CheckpointState> {
    if !config.enable_resume {
        return None;
    }
    let path = checkpoint_path(config, book_id);
    let bytes = std::fs::read(&path).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// Remove the checkpoint for `book_id`, called once extraction completes
/// successfully. Missing files are not an error.
pub fn clear(config: &HarvestConfig, book_id: &str) -> Result<(), HarvestError> {
    let path = checkpoint_path(config, book_id);
    match std::fs::remove_file(&path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(HarvestError::Internal(format!("cannot remove {}: {e}", path.display()))),
    }
}

/// Write a new backup of the assembled document JSON and prune backups
/// beyond `config.max_backups`, oldest first (spec §4.7: 5-10 retained).
pub fn write_backup(config: &HarvestConfig, book_id: &str, document_json: &[u8]) -> Result<(), HarvestError> {
    let existing = list_matching(&config.checkpoint_dir, &backup_prefix(book_id))?;
    let next_seq = existing.len() as u64 + 1;
    atomic_write(&backup_path(config, book_id, next_seq), document_json)?;

    let mut all = list_matching(&config.checkpoint_dir, &backup_prefix(book_id))?;
    all.sort();
    while all.len() > config.max_backups {
        let oldest = all.remove(0);
        let _ = std::fs::remove_file(&oldest);
    }
    Ok(())
}

/// Read the most recently written backup for `book_id`, if any (spec
/// §4.7: the orchestrator's last resort when a run fails after partial
/// progress and no checkpoint can be reconciled).
pub fn restore_latest_backup(config: &HarvestConfig, book_id: &str) -> Option<Vec<u8>> {
    let mut all = list_matching(&config.checkpoint_dir, &backup_prefix(book_id)).ok()?;
    all.sort();
    let latest: &Path = all.last()?;
    std::fs::read(latest).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_with_dir(dir: &Path) -> HarvestConfig {
        HarvestConfig {
            checkpoint_dir: dir.to_path_buf(),
            max_backups: 2,
            ..HarvestConfig::default()
        }
    }

    fn sample_page(internal_index: u32) -> Page {
        Page {
            internal_index,
            printed_number: None,
            page_number: internal_index,
            content: "text".to_string(),
            html_content: None,
            word_count: 1,
            volume_number: None,
            chapter_order: None,
            printed_missing: true,
        }
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let config = config_with_dir(dir.path());
        save(&config, "43", 100, &[sample_page(1), sample_page(2)]).unwrap();
        let loaded = load(&config, "43").unwrap();
        assert_eq!(loaded.pages.len(), 2);
        assert_eq!(loaded.page_count_internal, 100);
    }

    #[test]
    fn load_with_resume_disabled_returns_none() {
        let dir = TempDir::new().unwrap();
        let mut config = config_with_dir(dir.path());
        config.enable_resume = true;
        save(&config, "43", 100, &[sample_page(1)]).unwrap();
        config.enable_resume = false;
        assert!(load(&config, "43").is_none());
    }

    #[test]
    fn clear_removes_checkpoint_and_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let config = config_with_dir(dir.path());
        save(&config, "43", 10, &[]).unwrap();
        clear(&config, "43").unwrap();
        assert!(load(&config, "43").is_none());
        clear(&config, "43").unwrap(); // second call on a missing file is not an error
    }

    #[test]
    fn backup_rotation_prunes_beyond_max_backups() {
        let dir = TempDir::new().unwrap();
        let config = config_with_dir(dir.path());
        for i in 0..5 {
            write_backup(&config, "43", format!("{{\"n\":{i}}}").as_bytes()).unwrap();
        }
        let remaining = list_matching(&config.checkpoint_dir, &backup_prefix("43")).unwrap();
        assert_eq!(remaining.len(), config.max_backups);
    }

    #[test]
    fn restore_latest_backup_returns_newest_contents() {
        let dir = TempDir::new().unwrap();
        let config = config_with_dir(dir.path());
        write_backup(&config, "43", b"{\"n\":1}").unwrap();
        write_backup(&config, "43", b"{\"n\":2}").unwrap();
        let restored = restore_latest_backup(&config, "43").unwrap();
        assert_eq!(restored, b"{\"n\":2}");
    }
}
