use chrono::{DateTime, Utc};
use serde::de::{Deserializer, Error as _};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

pub use crate::types::{Identifier, Label, SourceTag};

/// One validated (identifier, label) entry moving through the pipeline.
///
/// Serialized on the wire as the 2-element array `[identifier, label]` with
/// the identifier as a JSON integer, so shard readers never reparse numbers
/// from text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CanonicalRecord {
    /// Validated numeric identifier.
    pub identifier: Identifier,
    /// Label already truncated to the 64-character bound.
    pub label: Label,
}

impl Serialize for CanonicalRecord {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (self.identifier, &self.label).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CanonicalRecord {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (identifier, label) = <(Identifier, Label)>::deserialize(deserializer)?;
        if label.chars().count() > crate::constants::domain::MAX_LABEL_CHARS {
            return Err(D::Error::custom("label exceeds 64 characters"));
        }
        Ok(Self { identifier, label })
    }
}

/// Raw identifier field as found in source data.
#[derive(Clone, Debug, PartialEq)]
pub enum RawIdentifier {
    /// Native numeric value.
    Numeric(i64),
    /// Decimal string, possibly with formatting characters.
    Text(String),
}

/// One unvalidated source entry.
///
/// Fields are optional so malformed source elements survive long enough to
/// be counted as rejections instead of failing a whole batch.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawEntry {
    /// Raw identifier field, when present.
    pub identifier: Option<RawIdentifier>,
    /// Raw label field, when present.
    pub label: Option<String>,
}

impl RawEntry {
    /// Build an entry with a native numeric identifier.
    pub fn numeric(identifier: i64, label: impl Into<String>) -> Self {
        Self {
            identifier: Some(RawIdentifier::Numeric(identifier)),
            label: Some(label.into()),
        }
    }

    /// Build an entry with a textual identifier.
    pub fn text(identifier: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            identifier: Some(RawIdentifier::Text(identifier.into())),
            label: Some(label.into()),
        }
    }

    /// Interpret an arbitrary JSON value as a raw entry.
    ///
    /// Anything that is not a `[identifier, label, ...]` array maps to an
    /// entry with missing fields; extra array elements are ignored.
    pub fn from_value(value: &serde_json::Value) -> Self {
        let Some(fields) = value.as_array() else {
            return Self::default();
        };
        let identifier = fields.first().and_then(|field| match field {
            serde_json::Value::Number(number) => Some(
                number
                    .as_i64()
                    .map(RawIdentifier::Numeric)
                    .unwrap_or_else(|| RawIdentifier::Text(number.to_string())),
            ),
            serde_json::Value::String(text) => Some(RawIdentifier::Text(text.clone())),
            _ => None,
        });
        let label = fields
            .get(1)
            .and_then(|field| field.as_str())
            .map(str::to_string);
        Self { identifier, label }
    }
}

/// Summary document derived from a finalized shard set.
///
/// Rebuilt from shard contents after every producing run; never hand-edited.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// Total records across all readable shards.
    pub total_entries: u64,
    /// Timestamp of the run that produced this shard set.
    pub last_updated: DateTime<Utc>,
    /// Schema version of the shard/metadata layout.
    pub schema_version: String,
    /// Tag of the raw dataset the shards were produced from.
    pub source_tag: SourceTag,
}
