//! Raw entry sources feeding the producer.
//!
//! Sources expose the dataset by original position and stream it on demand,
//! so the producer can make its two partitioning passes without ever
//! materializing the full dataset. `JsonArraySource` walks a JSON array file
//! element by element through a serde visitor; each element is decoded,
//! handed to the caller, and dropped.

use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::ops::Range;
use std::path::{Path, PathBuf};

use serde::de::{DeserializeSeed, Deserializer, SeqAccess, Visitor};

use crate::data::RawEntry;
use crate::errors::FeedError;

/// Positional access to a raw dataset.
pub trait EntrySource {
    /// Tag identifying this dataset in metadata and diagnostics.
    fn tag(&self) -> &str;
    /// Total number of raw entries, counted without materializing them.
    fn entry_count(&self) -> Result<usize, FeedError>;
    /// Stream entries whose original index falls in `range`, in positional
    /// order, invoking `visit` once per entry.
    fn visit_entries(
        &self,
        range: Range<usize>,
        visit: &mut dyn FnMut(usize, RawEntry),
    ) -> Result<(), FeedError>;
}

/// In-memory source for tests and small fixtures.
pub struct InMemorySource {
    tag: String,
    entries: Vec<RawEntry>,
}

impl InMemorySource {
    /// Build a source over pre-parsed entries.
    pub fn new(tag: impl Into<String>, entries: Vec<RawEntry>) -> Self {
        Self {
            tag: tag.into(),
            entries,
        }
    }

    /// Build a source from raw JSON values, one per entry.
    pub fn from_values(tag: impl Into<String>, values: &[serde_json::Value]) -> Self {
        Self::new(tag, values.iter().map(RawEntry::from_value).collect())
    }
}

impl EntrySource for InMemorySource {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn entry_count(&self) -> Result<usize, FeedError> {
        Ok(self.entries.len())
    }

    fn visit_entries(
        &self,
        range: Range<usize>,
        visit: &mut dyn FnMut(usize, RawEntry),
    ) -> Result<(), FeedError> {
        for index in range {
            if let Some(entry) = self.entries.get(index) {
                visit(index, entry.clone());
            }
        }
        Ok(())
    }
}

/// Streaming source over a JSON array file of `[identifier, label]` records.
pub struct JsonArraySource {
    path: PathBuf,
    tag: String,
}

impl JsonArraySource {
    /// Source over the array file at `path`, tagged by its file name.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let tag = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Self { path, tag }
    }

    fn scan(
        &self,
        range: Range<usize>,
        visit: &mut dyn FnMut(usize, RawEntry),
    ) -> Result<usize, FeedError> {
        let file = File::open(&self.path).map_err(|err| FeedError::SourceUnavailable {
            source_tag: self.tag.clone(),
            reason: err.to_string(),
        })?;
        let mut deserializer = serde_json::Deserializer::from_reader(BufReader::new(file));
        let seed = ElementWalk { range, visit };
        seed.deserialize(&mut deserializer)
            .map_err(|err| FeedError::SourceUnavailable {
                source_tag: self.tag.clone(),
                reason: err.to_string(),
            })
    }
}

impl EntrySource for JsonArraySource {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn entry_count(&self) -> Result<usize, FeedError> {
        self.scan(0..0, &mut |_, _| {})
    }

    fn visit_entries(
        &self,
        range: Range<usize>,
        visit: &mut dyn FnMut(usize, RawEntry),
    ) -> Result<(), FeedError> {
        self.scan(range, visit).map(|_| ())
    }
}

/// Seq visitor that walks array elements one at a time and reports the
/// total element count.
struct ElementWalk<'a> {
    range: Range<usize>,
    visit: &'a mut dyn FnMut(usize, RawEntry),
}

impl<'de> DeserializeSeed<'de> for ElementWalk<'_> {
    type Value = usize;

    fn deserialize<D>(self, deserializer: D) -> Result<usize, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_seq(self)
    }
}

impl<'de> Visitor<'de> for ElementWalk<'_> {
    type Value = usize;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a JSON array of [identifier, label] records")
    }

    fn visit_seq<A>(mut self, mut seq: A) -> Result<usize, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut index = 0usize;
        while let Some(value) = seq.next_element::<serde_json::Value>()? {
            if self.range.contains(&index) {
                (self.visit)(index, RawEntry::from_value(&value));
            }
            index += 1;
        }
        Ok(index)
    }
}
