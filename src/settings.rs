//! Shared key-value settings consumed at run start.
//!
//! The host application writes a handful of string keys into one JSON
//! document in the shared container; a run reads them once into an owned
//! `Settings` value and never consults a process-wide singleton. Only the
//! last-full-update stamp is ever written back, preserving unknown keys the
//! host may have stored alongside.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::warn;

use crate::constants::settings::{
    LAST_FULL_UPDATE_KEY, MODE_ADD_ONE_BLOCK_NUMBER, MODE_REMOVE_ONE_BLOCK_NUMBER,
    PENDING_IDENTIFIER_KEY, PROCESSING_TYPE_KEY, SETTINGS_FILENAME,
};
use crate::errors::FeedError;
use crate::shards::atomic_write;

/// Operating mode selected by the host for the next run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperatingMode {
    /// Replay the entire ordered shard set.
    FullLoad,
    /// Add one blocking entry.
    AddBlock,
    /// Remove one blocking entry.
    RemoveBlock,
}

impl OperatingMode {
    /// Parse the stored mode string; absent, empty, or unknown values fall
    /// back to a full load.
    pub fn from_raw(raw: Option<&str>) -> Self {
        let Some(mode) = raw else {
            return Self::FullLoad;
        };
        let upper = mode.to_uppercase();
        if upper == MODE_ADD_ONE_BLOCK_NUMBER {
            Self::AddBlock
        } else if upper == MODE_REMOVE_ONE_BLOCK_NUMBER {
            Self::RemoveBlock
        } else {
            Self::FullLoad
        }
    }
}

/// Snapshot of the settings document taken at run start.
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    /// Operating mode for this run.
    pub processing_mode: OperatingMode,
    /// Raw identifier pending an incremental add/remove, if any.
    pub pending_identifier: Option<String>,
    /// Time the last full load completed with a valid prefix, if ever.
    pub last_full_update: Option<DateTime<Utc>>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            processing_mode: OperatingMode::FullLoad,
            pending_identifier: None,
            last_full_update: None,
        }
    }
}

/// File-backed settings document in the shared container.
#[derive(Clone, Debug)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    /// Settings store for the given container directory.
    pub fn new(container: &Path) -> Self {
        Self {
            path: container.join(SETTINGS_FILENAME),
        }
    }

    /// Read the settings document into an owned snapshot.
    ///
    /// A missing document yields defaults; a corrupt document is an error.
    pub fn load(&self) -> Result<Settings, FeedError> {
        let document = self.read_document()?;
        let raw_mode = document
            .get(PROCESSING_TYPE_KEY)
            .and_then(Value::as_str)
            .filter(|mode| !mode.is_empty());
        let pending_identifier = document
            .get(PENDING_IDENTIFIER_KEY)
            .and_then(Value::as_str)
            .map(str::to_string);
        let last_full_update = document
            .get(LAST_FULL_UPDATE_KEY)
            .and_then(Value::as_str)
            .and_then(|stamp| match DateTime::parse_from_rfc3339(stamp) {
                Ok(parsed) => Some(parsed.with_timezone(&Utc)),
                Err(err) => {
                    warn!(%stamp, %err, "ignoring unparseable last-update stamp");
                    None
                }
            });
        Ok(Settings {
            processing_mode: OperatingMode::from_raw(raw_mode),
            pending_identifier,
            last_full_update,
        })
    }

    /// Record the time a full load last delivered a valid ordered prefix.
    pub fn stamp_last_full_update(&self, when: DateTime<Utc>) -> Result<(), FeedError> {
        let mut document = self.read_document()?;
        document.insert(
            LAST_FULL_UPDATE_KEY.to_string(),
            Value::String(when.to_rfc3339()),
        );
        self.write_document(&document)
    }

    /// Store one string key, as the host application would.
    pub fn put_string(&self, key: &str, value: &str) -> Result<(), FeedError> {
        let mut document = self.read_document()?;
        document.insert(key.to_string(), Value::String(value.to_string()));
        self.write_document(&document)
    }

    fn read_document(&self) -> Result<Map<String, Value>, FeedError> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let bytes = fs::read(&self.path)?;
        serde_json::from_slice(&bytes)
            .map_err(|err| FeedError::SettingsStore(format!("corrupt settings document: {err}")))
    }

    fn write_document(&self, document: &Map<String, Value>) -> Result<(), FeedError> {
        let payload = serde_json::to_vec(document)
            .map_err(|err| FeedError::SettingsStore(format!("settings encoding failed: {err}")))?;
        atomic_write(&self.path, &payload)
    }
}
