use thiserror::Error;

use crate::types::Identifier;

/// Host-side rejection of a directory request.
///
/// The host enforces its own ordering/uniqueness contract and absolute
/// resource limits; any of these is fatal to the current run and is never
/// retried. Codes mirror the host's stable numeric error codes.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum HostRejection {
    /// Unclassified host failure (code 0).
    #[error("unknown host failure")]
    Unknown,
    /// The directory extension could not be located (code 1).
    #[error("directory extension not found")]
    ExtensionNotFound,
    /// The host interrupted loading, typically timeout or memory (code 2).
    #[error("loading interrupted by the host")]
    LoadingInterrupted,
    /// An entry was presented out of ascending order (code 3).
    #[error("entries presented out of order")]
    EntriesOutOfOrder,
    /// The same identifier was presented twice (code 4).
    #[error("duplicate entries presented")]
    DuplicateEntries,
    /// The host's maximum entry count was exceeded (code 5).
    #[error("maximum entry count exceeded")]
    MaxEntriesExceeded,
    /// The directory extension is disabled (code 6).
    #[error("directory extension is disabled")]
    ExtensionDisabled,
    /// Current host settings prohibit the request (code 7).
    #[error("current settings prohibit the request")]
    SettingsProhibited,
}

impl HostRejection {
    /// Stable numeric code reported by the host for this rejection.
    pub fn code(self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::ExtensionNotFound => 1,
            Self::LoadingInterrupted => 2,
            Self::EntriesOutOfOrder => 3,
            Self::DuplicateEntries => 4,
            Self::MaxEntriesExceeded => 5,
            Self::ExtensionDisabled => 6,
            Self::SettingsProhibited => 7,
        }
    }

    /// Map a host-reported numeric code back to a rejection, if known.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Unknown),
            1 => Some(Self::ExtensionNotFound),
            2 => Some(Self::LoadingInterrupted),
            3 => Some(Self::EntriesOutOfOrder),
            4 => Some(Self::DuplicateEntries),
            5 => Some(Self::MaxEntriesExceeded),
            6 => Some(Self::ExtensionDisabled),
            7 => Some(Self::SettingsProhibited),
            _ => None,
        }
    }
}

/// Downstream host boundary consumed by the pipeline.
///
/// Sequential-add calls must be issued one at a time in strictly ascending
/// identifier order; the host rejects out-of-order or duplicate entries.
/// Implementations are synchronous and single-threaded by contract.
pub trait DirectoryHost {
    /// Whether the current invocation expects only an incremental delta
    /// rather than a full ordered replay.
    fn is_incremental(&self) -> bool;
    /// Append the next identification entry to the host's ordered sequence.
    fn add_identification_entry(
        &mut self,
        identifier: Identifier,
        label: &str,
    ) -> Result<(), HostRejection>;
    /// Remove a previously accepted identification entry.
    fn remove_identification_entry(&mut self, identifier: Identifier) -> Result<(), HostRejection>;
    /// Append the next blocking entry to the host's ordered sequence.
    fn add_blocking_entry(&mut self, identifier: Identifier) -> Result<(), HostRejection>;
    /// Remove a previously accepted blocking entry.
    fn remove_blocking_entry(&mut self, identifier: Identifier) -> Result<(), HostRejection>;
    /// Signal that the current request is finished.
    fn complete_request(&mut self) -> Result<(), HostRejection>;
}
