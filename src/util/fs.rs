//! Atomic file writes for checkpoints and backups.
//!
//! Every on-disk snapshot (checkpoint, backup) is written to a sibling
//! temporary file and renamed into place, so a crash mid-write never
//! leaves a torn file behind (spec §4.7: "All file writes are atomic
//! (write-then-rename)").

use std::fs;
use std::io::Write;
use std::path::Path;

use crate::HarvestError;

/// Write `contents` to `path` atomically: write to a sibling `.tmp` file,
/// `fsync`, then rename over `path`.
pub fn atomic_write(path: &Path, contents: &[u8]) -> Result<(), HarvestError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| HarvestError::Internal(format!("cannot create {}: {e}", parent.display())))?;
    }
    let tmp_path = sibling_tmp(path);
    {
        let mut tmp = fs::File::create(&tmp_path)
            .map_err(|e| HarvestError::Internal(format!("cannot create {}: {e}", tmp_path.display())))?;
        tmp.write_all(contents)
            .map_err(|e| HarvestError::Internal(format!("cannot write {}: {e}", tmp_path.display())))?;
        tmp.sync_all()
            .map_err(|e| HarvestError::Internal(format!("cannot sync {}: {e}", tmp_path.display())))?;
    }
    fs::rename(&tmp_path, path)
        .map_err(|e| HarvestError::Internal(format!("cannot rename into {}: {e}", path.display())))?;
    Ok(())
}

fn sibling_tmp(path: &Path) -> std::path::PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.push_str(".tmp");
    path.with_file_name(name)
}

/// List files in `dir` whose name starts with `prefix`, sorted ascending.
/// Backup file names embed a zero-padded sequence number, so lexicographic
/// order is chronological order. Used by the backup retention policy
/// (spec §4.7).
pub fn list_matching(dir: &Path, prefix: &str) -> Result<Vec<std::path::PathBuf>, HarvestError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut matches = Vec::new();
    let entries = fs::read_dir(dir)
        .map_err(|e| HarvestError::Internal(format!("cannot read {}: {e}", dir.display())))?;
    for entry in entries {
        let entry = entry.map_err(|e| HarvestError::Internal(format!("cannot read entry: {e}")))?;
        let name = entry.file_name();
        if name.to_string_lossy().starts_with(prefix) {
            matches.push(entry.path());
        }
    }
    matches.sort();
    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn atomic_write_creates_file_with_contents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("checkpoint.json");
        atomic_write(&path, b"{\"a\":1}").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"{\"a\":1}");
        assert!(!sibling_tmp(&path).exists());
    }

    #[test]
    fn atomic_write_overwrites_existing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("checkpoint.json");
        atomic_write(&path, b"first").unwrap();
        atomic_write(&path, b"second").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"second");
    }

    #[test]
    fn list_matching_sorts_and_filters() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("book_42.1.bak"), b"x").unwrap();
        fs::write(dir.path().join("book_42.2.bak"), b"x").unwrap();
        fs::write(dir.path().join("other.txt"), b"x").unwrap();
        let found = list_matching(dir.path(), "book_42").unwrap();
        assert_eq!(found.len(), 2);
        assert!(found[0].ends_with("book_42.1.bak"));
    }

    #[test]
    fn list_matching_missing_dir_is_empty() {
        let found = list_matching(Path::new("/nonexistent/dir"), "x").unwrap();
        assert!(found.is_empty());
    }
}
