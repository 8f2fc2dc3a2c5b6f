//! Entry validation and canonicalization.
//!
//! Normalization is the earliest point of contact with raw data: labels are
//! truncated here exactly once, so every downstream stage sees an
//! already-bounded string. Rejections are silent, counted skips; they never
//! abort a batch.

use crate::constants::domain::{
    MAX_INTERACTIVE_DIGITS, MAX_LABEL_CHARS, MIN_IDENTIFIER_EXCLUSIVE, MIN_INTERACTIVE_DIGITS,
    STRIP_CHARS,
};
use crate::data::{CanonicalRecord, RawEntry, RawIdentifier};
use crate::types::Identifier;

/// Reason a raw entry was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rejection {
    /// The raw record had fewer than two usable fields.
    MissingFields,
    /// The identifier did not parse as a base-10 signed 64-bit integer.
    UnparseableIdentifier,
    /// The identifier parsed but fell outside the accepted range.
    IdentifierOutOfRange,
}

/// Counters for one normalization pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NormalizeStats {
    /// Records that survived normalization.
    pub kept: u64,
    /// Records rejected for missing fields.
    pub missing_fields: u64,
    /// Records rejected for unparseable identifiers.
    pub unparseable: u64,
    /// Records rejected for out-of-range identifiers.
    pub out_of_range: u64,
}

impl NormalizeStats {
    /// Count one rejection.
    pub fn record(&mut self, rejection: Rejection) {
        match rejection {
            Rejection::MissingFields => self.missing_fields += 1,
            Rejection::UnparseableIdentifier => self.unparseable += 1,
            Rejection::IdentifierOutOfRange => self.out_of_range += 1,
        }
    }

    /// Total rejections across all reasons.
    pub fn rejected(&self) -> u64 {
        self.missing_fields + self.unparseable + self.out_of_range
    }
}

/// Remove formatting characters from a raw identifier string.
pub fn strip_identifier(raw: &str) -> String {
    raw.chars()
        .filter(|ch| !STRIP_CHARS.contains(ch))
        .collect()
}

/// Truncate a label to the 64-character bound.
pub fn truncate_label(raw: &str) -> String {
    raw.chars().take(MAX_LABEL_CHARS).collect()
}

fn parse_identifier(raw: &RawIdentifier) -> Option<Identifier> {
    match raw {
        RawIdentifier::Numeric(value) => Some(*value),
        RawIdentifier::Text(text) => strip_identifier(text).parse::<Identifier>().ok(),
    }
}

/// Validate one raw entry and produce its canonical form.
///
/// Pure function: stripping, parsing, the lower identifier bound, and label
/// truncation as one step.
pub fn normalize(entry: &RawEntry) -> Result<CanonicalRecord, Rejection> {
    let (Some(raw_identifier), Some(raw_label)) = (&entry.identifier, &entry.label) else {
        return Err(Rejection::MissingFields);
    };
    let identifier =
        parse_identifier(raw_identifier).ok_or(Rejection::UnparseableIdentifier)?;
    if identifier <= MIN_IDENTIFIER_EXCLUSIVE {
        return Err(Rejection::IdentifierOutOfRange);
    }
    Ok(CanonicalRecord {
        identifier,
        label: truncate_label(raw_label),
    })
}

/// Validate a raw identifier string for an interactive add/remove operation.
///
/// Interactive entries come straight from user input: the stripped string
/// must parse and carry between 8 and 15 digits. The bulk pipeline's
/// magnitude bound does not apply on this path.
pub fn validate_interactive(raw: &str) -> Result<Identifier, Rejection> {
    let stripped = strip_identifier(raw);
    let identifier = stripped
        .parse::<Identifier>()
        .map_err(|_| Rejection::UnparseableIdentifier)?;
    let digits = stripped.chars().filter(char::is_ascii_digit).count();
    if !(MIN_INTERACTIVE_DIGITS..=MAX_INTERACTIVE_DIGITS).contains(&digits) {
        return Err(Rejection::IdentifierOutOfRange);
    }
    Ok(identifier)
}
