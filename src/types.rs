/// Canonical numeric identifier for one directory entry.
/// Example: `917995763073`
pub type Identifier = i64;
/// Display label attached to an identifier, at most 64 characters.
/// Example: `Telemarketer`
pub type Label = String;
/// Zero-based rank of a shard within one produced shard set.
/// Example: `0` for `spam-batch-000.json`
pub type ShardIndex = usize;
/// Identifier for the raw dataset a shard set was produced from.
/// Example: `spam_numbers.json`
pub type SourceTag = String;
