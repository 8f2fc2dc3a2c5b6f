/// Constants describing the identifier/label domain.
pub mod domain {
    /// Identifiers must be strictly greater than this value to enter the
    /// bulk pipeline; shorter numbers are treated as malformed.
    pub const MIN_IDENTIFIER_EXCLUSIVE: i64 = 1_000_000_000;
    /// Upper edge of the identifier domain used for bucket planning.
    /// Values at or above this edge clamp into the final histogram cell.
    pub const DOMAIN_UPPER_EDGE: i64 = 10_000_000_000_000_000;
    /// Maximum label length in characters (not bytes), applied once at
    /// normalization time.
    pub const MAX_LABEL_CHARS: usize = 64;
    /// Characters stripped from raw identifier strings before parsing.
    pub const STRIP_CHARS: [char; 6] = ['(', ')', '"', '-', ' ', '+'];
    /// Minimum digit count accepted for interactive single-entry operations.
    pub const MIN_INTERACTIVE_DIGITS: usize = 8;
    /// Maximum digit count accepted for interactive single-entry operations.
    pub const MAX_INTERACTIVE_DIGITS: usize = 15;
}

/// Constants for the shard file layout in the shared container.
pub mod shards {
    /// Filename prefix shared by every shard file.
    pub const SHARD_FILE_PREFIX: &str = "spam-batch-";
    /// Filename extension shared by every shard file.
    pub const SHARD_FILE_EXT: &str = "json";
    /// Zero-padding width for shard indices; keeps lexicographic filename
    /// order equal to numeric shard order.
    pub const SHARD_INDEX_WIDTH: usize = 3;
    /// Largest shard count a single run may produce (bounded by the
    /// zero-padded filename width).
    pub const MAX_SHARDS: usize = 1000;
    /// Filename prefix for intermediate bucket spill files.
    pub const SPILL_FILE_PREFIX: &str = "spam-bucket-";
    /// Filename extension for intermediate bucket spill files.
    pub const SPILL_FILE_EXT: &str = "jsonl";
}

/// Constants for the derived metadata document.
pub mod metadata {
    /// Filename of the metadata document in the shared container.
    pub const METADATA_FILENAME: &str = "spam-metadata.json";
    /// Schema version stamped into every metadata document.
    pub const SCHEMA_VERSION: &str = "1.0-streaming";
}

/// Constants for the shared key-value settings document.
pub mod settings {
    /// Filename of the settings document in the shared container.
    pub const SETTINGS_FILENAME: &str = "spam-settings.json";
    /// Key selecting the operating mode for the next consumer run.
    pub const PROCESSING_TYPE_KEY: &str = "NUMBER_PROCESSING_TYPE";
    /// Mode value requesting a full ordered replay.
    pub const MODE_ADD_ALL_IDENTIFICATIONS: &str = "ADD_ALL_IDENTIFICATIONS";
    /// Mode value requesting a single blocking-entry addition.
    pub const MODE_ADD_ONE_BLOCK_NUMBER: &str = "ADD_ONE_BLOCK_NUMBER";
    /// Mode value requesting a single blocking-entry removal.
    pub const MODE_REMOVE_ONE_BLOCK_NUMBER: &str = "REMOVE_ONE_BLOCK_NUMBER";
    /// Key carrying the raw identifier for incremental operations.
    pub const PENDING_IDENTIFIER_KEY: &str = "ADD_REMOVE_BLOCK_MSISDN";
    /// Key carrying the RFC 3339 timestamp of the last completed full load.
    pub const LAST_FULL_UPDATE_KEY: &str = "lastCallDirectoryUpdate";
}
