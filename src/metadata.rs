//! Derived shard-set summary document.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::warn;

use crate::constants::metadata::{METADATA_FILENAME, SCHEMA_VERSION};
use crate::data::Metadata;
use crate::errors::FeedError;
use crate::shards::{atomic_write, list_shard_files, read_shard};

/// Full path of the metadata document inside `dir`.
pub fn metadata_path(dir: &Path) -> PathBuf {
    dir.join(METADATA_FILENAME)
}

/// Scan every shard in `dir` and build a fresh summary record.
///
/// Malformed shards contribute a count of zero and are logged, not fatal.
/// Must only run after all shards for the cycle are finalized.
pub fn aggregate(dir: &Path, source_tag: &str) -> Result<Metadata, FeedError> {
    let files = list_shard_files(dir)?;
    let mut total_entries = 0u64;
    for path in &files {
        match read_shard(path) {
            Ok(records) => total_entries += records.len() as u64,
            Err(err) => {
                warn!(shard = %path.display(), %err, "skipping unreadable shard in aggregation");
            }
        }
    }
    Ok(Metadata {
        total_entries,
        last_updated: Utc::now(),
        schema_version: SCHEMA_VERSION.to_string(),
        source_tag: source_tag.to_string(),
    })
}

/// Persist the metadata document, overwriting any prior one.
pub fn write_metadata(dir: &Path, metadata: &Metadata) -> Result<PathBuf, FeedError> {
    let payload = serde_json::to_vec(metadata)
        .map_err(|err| FeedError::Configuration(format!("metadata encoding failed: {err}")))?;
    let target = metadata_path(dir);
    atomic_write(&target, &payload)?;
    Ok(target)
}

/// Read the metadata document if one exists.
pub fn read_metadata(dir: &Path) -> Result<Option<Metadata>, FeedError> {
    let path = metadata_path(dir);
    if !path.exists() {
        return Ok(None);
    }
    let bytes = fs::read(&path)?;
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|err| FeedError::Configuration(format!("corrupt metadata document: {err}")))
}
