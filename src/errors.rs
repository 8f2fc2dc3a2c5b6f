use std::io;

use thiserror::Error;

use crate::host::HostRejection;
use crate::types::SourceTag;

/// Error type for container IO, settings persistence, and host failures.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("shared container '{path}' is unavailable: {reason}")]
    ContainerUnavailable { path: String, reason: String },
    #[error("shard '{path}' is unreadable: {reason}")]
    ShardUnreadable { path: String, reason: String },
    #[error("entry source '{source_tag}' is unavailable: {reason}")]
    SourceUnavailable {
        source_tag: SourceTag,
        reason: String,
    },
    #[error("settings store failure: {0}")]
    SettingsStore(String),
    #[error("host rejected the run: {0}")]
    HostRejected(#[from] HostRejection),
    #[error("incremental update unavailable: {0}")]
    IncrementalUnavailable(String),
    #[error("identifier '{raw}' failed validation")]
    InvalidIdentifier { raw: String },
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("configuration error: {0}")]
    Configuration(String),
}
