//! Shard persistence and container scanning.
//!
//! A shard is one immutable JSON file holding already sorted, deduplicated
//! records. Writes stage into a temp file and rename into place so a reader
//! never observes a half-written shard. Filenames carry a zero-padded index,
//! making lexicographic order equal to numeric shard order.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::constants::shards::{
    MAX_SHARDS, SHARD_FILE_EXT, SHARD_FILE_PREFIX, SHARD_INDEX_WIDTH, SPILL_FILE_PREFIX,
};
use crate::constants::metadata::METADATA_FILENAME;
use crate::data::CanonicalRecord;
use crate::errors::FeedError;
use crate::types::ShardIndex;

/// Canonical filename for the shard at `index`.
pub fn shard_filename(index: ShardIndex) -> String {
    format!("{SHARD_FILE_PREFIX}{index:0SHARD_INDEX_WIDTH$}.{SHARD_FILE_EXT}")
}

/// Full path of the shard at `index` inside `dir`.
pub fn shard_path(dir: &Path, index: ShardIndex) -> PathBuf {
    dir.join(shard_filename(index))
}

/// Persist one finalized shard, replacing any prior file at its path.
pub fn write_shard(
    dir: &Path,
    index: ShardIndex,
    records: &[CanonicalRecord],
) -> Result<PathBuf, FeedError> {
    if index >= MAX_SHARDS {
        return Err(FeedError::Configuration(format!(
            "shard index {index} exceeds the {MAX_SHARDS}-shard filename space"
        )));
    }
    let payload = serde_json::to_vec(records)
        .map_err(|err| FeedError::Configuration(format!("shard encoding failed: {err}")))?;
    let target = shard_path(dir, index);
    atomic_write(&target, &payload)?;
    Ok(target)
}

/// Stage bytes next to `target` and rename into place.
pub(crate) fn atomic_write(target: &Path, payload: &[u8]) -> Result<(), FeedError> {
    let file_name = target
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| FeedError::Configuration("target path has no file name".to_string()))?;
    let staged = target.with_file_name(format!(".{file_name}.tmp"));
    fs::write(&staged, payload)?;
    fs::rename(&staged, target)?;
    Ok(())
}

/// Read and decode one shard file.
pub fn read_shard(path: &Path) -> Result<Vec<CanonicalRecord>, FeedError> {
    let bytes = fs::read(path).map_err(|err| FeedError::ShardUnreadable {
        path: path.display().to_string(),
        reason: err.to_string(),
    })?;
    serde_json::from_slice(&bytes).map_err(|err| FeedError::ShardUnreadable {
        path: path.display().to_string(),
        reason: err.to_string(),
    })
}

/// List shard files in `dir`, sorted by filename (hence by shard index).
///
/// A listing failure is fatal to the caller's run; per-shard read failures
/// are the caller's decision.
pub fn list_shard_files(dir: &Path) -> Result<Vec<PathBuf>, FeedError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|err| FeedError::ContainerUnavailable {
            path: dir.display().to_string(),
            reason: err.to_string(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if name.starts_with(SHARD_FILE_PREFIX) && name.ends_with(&format!(".{SHARD_FILE_EXT}")) {
            files.push(entry.path().to_path_buf());
        }
    }
    files.sort_by_key(|path| path.file_name().map(|name| name.to_os_string()));
    Ok(files)
}

/// Delete all pipeline files from a prior cycle: shards, bucket spills, and
/// the metadata document. The shard set is always fully replaced, never
/// append-merged.
pub fn remove_stale_files(dir: &Path) -> Result<(), FeedError> {
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|err| FeedError::ContainerUnavailable {
            path: dir.display().to_string(),
            reason: err.to_string(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if name.starts_with(SHARD_FILE_PREFIX)
            || name.starts_with(SPILL_FILE_PREFIX)
            || name == METADATA_FILENAME
        {
            fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(identifier: i64, label: &str) -> CanonicalRecord {
        CanonicalRecord {
            identifier,
            label: label.to_string(),
        }
    }

    #[test]
    fn filenames_are_zero_padded_and_ordered() {
        assert_eq!(shard_filename(0), "spam-batch-000.json");
        assert_eq!(shard_filename(42), "spam-batch-042.json");
        assert_eq!(shard_filename(999), "spam-batch-999.json");
        assert!(shard_filename(9) < shard_filename(10));
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempdir().unwrap();
        let records = vec![
            record(1_000_000_001, "first"),
            record(917995763073, "second"),
        ];
        let path = write_shard(dir.path(), 0, &records).unwrap();
        assert_eq!(path.file_name().unwrap(), "spam-batch-000.json");
        assert_eq!(read_shard(&path).unwrap(), records);
    }

    #[test]
    fn write_leaves_no_staging_file_behind() {
        let dir = tempdir().unwrap();
        write_shard(dir.path(), 3, &[record(1_000_000_001, "a")]).unwrap();
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
            .filter(|name| name.ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn write_rejects_indices_outside_the_filename_space() {
        let dir = tempdir().unwrap();
        let err = write_shard(dir.path(), MAX_SHARDS, &[]).unwrap_err();
        assert!(matches!(err, FeedError::Configuration(_)));
    }

    #[test]
    fn listing_filters_and_sorts_by_filename() {
        let dir = tempdir().unwrap();
        write_shard(dir.path(), 2, &[record(3_000_000_000, "c")]).unwrap();
        write_shard(dir.path(), 0, &[record(1_000_000_001, "a")]).unwrap();
        write_shard(dir.path(), 1, &[record(2_000_000_000, "b")]).unwrap();
        fs::write(dir.path().join("unrelated.json"), b"[]").unwrap();
        fs::write(dir.path().join("spam-metadata.json"), b"{}").unwrap();

        let files = list_shard_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|path| path.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "spam-batch-000.json",
                "spam-batch-001.json",
                "spam-batch-002.json"
            ]
        );
    }

    #[test]
    fn listing_a_missing_container_is_fatal() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = list_shard_files(&missing).unwrap_err();
        assert!(matches!(err, FeedError::ContainerUnavailable { .. }));
    }

    #[test]
    fn stale_file_cleanup_spares_unrelated_files() {
        let dir = tempdir().unwrap();
        write_shard(dir.path(), 0, &[record(1_000_000_001, "a")]).unwrap();
        fs::write(dir.path().join("spam-bucket-0.jsonl"), b"").unwrap();
        fs::write(dir.path().join("spam-metadata.json"), b"{}").unwrap();
        fs::write(dir.path().join("spam-settings.json"), b"{}").unwrap();

        remove_stale_files(dir.path()).unwrap();

        let remaining: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(remaining, vec!["spam-settings.json"]);
    }
}
