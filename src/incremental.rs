//! Single-entry updates against the host's already-accepted order.
//!
//! This path bypasses the shard pipeline entirely: the host tracks
//! incremental deltas separately from a full reload, so a delta needs no
//! ordering relative to the bulk shard contents. It is only meaningful when
//! the host is running incrementally and a prior full load exists.

use tracing::debug;

use crate::errors::FeedError;
use crate::host::DirectoryHost;
use crate::normalize::validate_interactive;
use crate::settings::Settings;
use crate::types::Identifier;

/// Which delta to apply.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateOperation {
    /// Add one blocking entry.
    Add,
    /// Remove one blocking entry.
    Remove,
}

/// Validate and apply one add/remove delta.
///
/// Returns the identifier actually applied. Fails without touching the host
/// when the host is not incremental, no prior full load is recorded, or the
/// identifier does not validate.
pub fn apply(
    operation: UpdateOperation,
    raw_identifier: &str,
    settings: &Settings,
    host: &mut dyn DirectoryHost,
) -> Result<Identifier, FeedError> {
    if !host.is_incremental() {
        return Err(FeedError::IncrementalUnavailable(
            "host is not running in incremental mode".to_string(),
        ));
    }
    if settings.last_full_update.is_none() {
        return Err(FeedError::IncrementalUnavailable(
            "no prior full load recorded".to_string(),
        ));
    }
    let identifier =
        validate_interactive(raw_identifier).map_err(|_| FeedError::InvalidIdentifier {
            raw: raw_identifier.to_string(),
        })?;
    match operation {
        UpdateOperation::Add => host.add_blocking_entry(identifier)?,
        UpdateOperation::Remove => host.remove_blocking_entry(identifier)?,
    }
    debug!(identifier, ?operation, "incremental update applied");
    Ok(identifier)
}
