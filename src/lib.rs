#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Budget and producer configuration types.
pub mod config;
/// Centralized constants for the domain, file layout, and settings keys.
pub mod constants;
/// Record, raw-entry, and metadata types.
pub mod data;
/// Host boundary trait and rejection taxonomy.
pub mod host;
/// Single-entry updates applied outside the shard pipeline.
pub mod incremental;
/// Budgeted shard replay into the host.
pub mod ingest;
/// Shard-set aggregation into the metadata document.
pub mod metadata;
/// Shard-balance inspection helpers.
pub mod metrics;
/// Entry validation and canonicalization.
pub mod normalize;
/// Key partitioning guaranteeing cross-shard ordering.
pub mod partition;
/// Positional split selection and micro-chunk planning.
pub mod plan;
/// Producing-run orchestration.
pub mod producer;
/// Host-driven run dispatch.
pub mod request;
/// Shared key-value settings document.
pub mod settings;
/// Shard persistence and container scanning.
pub mod shards;
/// Raw entry sources.
pub mod source;
/// Shared type aliases.
pub mod types;

mod errors;

pub use config::{ProcessingBudget, ProducerConfig};
pub use data::{CanonicalRecord, Metadata, RawEntry, RawIdentifier};
pub use errors::FeedError;
pub use host::{DirectoryHost, HostRejection};
pub use incremental::UpdateOperation;
pub use ingest::{BudgetedIngestor, MemoryProbe, ProcStatusProbe, RunOutcome, RunReport};
pub use normalize::{NormalizeStats, Rejection, normalize, validate_interactive};
pub use plan::SplitSelector;
pub use producer::{Producer, ProducerReport};
pub use request::{RequestOutcome, run_directory_request};
pub use settings::{OperatingMode, Settings, SettingsStore};
pub use source::{EntrySource, InMemorySource, JsonArraySource};
pub use types::{Identifier, Label, ShardIndex, SourceTag};
