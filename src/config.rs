use std::time::Duration;

use crate::types::SourceTag;

/// Hard budgets one consumer run must respect.
///
/// The host enforces its own absolute deadline and memory ceiling; these
/// values are tuned to stop slightly inside the host's limits so truncation
/// happens at a shard boundary instead of mid-stream.
#[derive(Clone, Debug)]
pub struct ProcessingBudget {
    /// Wall-clock ceiling for one run.
    pub max_wall_clock: Duration,
    /// Resident memory ceiling in bytes.
    pub max_resident_memory_bytes: u64,
    /// Sample resident memory every this many shards.
    pub memory_check_every_n_shards: usize,
    /// Consecutive over-ceiling samples tolerated before aborting.
    pub max_consecutive_memory_warnings: u32,
    /// Hard cap on shards visited in one run.
    pub max_shards_per_run: usize,
    /// Fixed cool-down interval in shards, independent of memory pressure.
    pub cooldown_every_n_shards: usize,
    /// Pause length at each cool-down point.
    pub cooldown_pause: Duration,
    /// Pause length after an over-ceiling memory sample.
    pub memory_settle_pause: Duration,
}

impl Default for ProcessingBudget {
    fn default() -> Self {
        Self {
            max_wall_clock: Duration::from_secs_f64(22.0),
            max_resident_memory_bytes: 80 * 1024 * 1024,
            memory_check_every_n_shards: 10,
            max_consecutive_memory_warnings: 3,
            max_shards_per_run: 150,
            cooldown_every_n_shards: 25,
            cooldown_pause: Duration::from_millis(300),
            memory_settle_pause: Duration::from_millis(500),
        }
    }
}

/// Tunables for one producing run.
#[derive(Clone, Debug)]
pub struct ProducerConfig {
    /// Raw records materialized per micro-chunk during streaming passes.
    pub micro_chunk_size: usize,
    /// Target record count per shard used when planning bucket boundaries.
    pub target_shard_records: usize,
    /// Fixed histogram cell count for the boundary-planning pass.
    pub histogram_cells: usize,
    /// Pause after every this many micro-chunks during routing.
    pub chunk_pause_every: usize,
    /// Pause length between micro-chunk groups.
    pub chunk_pause: Duration,
    /// Source tag recorded in the metadata document.
    pub source_tag: SourceTag,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            micro_chunk_size: 2000,
            target_shard_records: 8000,
            histogram_cells: 1024,
            chunk_pause_every: 5,
            chunk_pause: Duration::from_millis(200),
            source_tag: "spam_numbers.json".to_string(),
        }
    }
}
