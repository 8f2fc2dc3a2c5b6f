//! Shard-balance inspection helpers.

/// Aggregate skew metrics for per-shard record counts.
#[derive(Clone, Debug, PartialEq)]
pub struct ShardSkew {
    /// Total records across all shards.
    pub total: usize,
    /// Number of shards.
    pub shards: usize,
    /// Smallest shard record count.
    pub min: usize,
    /// Largest shard record count.
    pub max: usize,
    /// Mean records per shard.
    pub mean: f64,
    /// Largest shard's share of the total.
    pub max_share: f64,
    /// Smallest shard's share of the total.
    pub min_share: f64,
    /// Ratio of largest to smallest shard.
    pub ratio: f64,
}

/// Compute skew metrics from per-shard record counts in shard order.
pub fn shard_skew(counts: &[usize]) -> Option<ShardSkew> {
    if counts.is_empty() {
        return None;
    }
    let total: usize = counts.iter().sum();
    let shards = counts.len();
    let min = *counts.iter().min().expect("counts non-empty");
    let max = *counts.iter().max().expect("counts non-empty");
    let mean = total as f64 / shards as f64;
    let max_share = if total == 0 {
        0.0
    } else {
        max as f64 / total as f64
    };
    let min_share = if total == 0 {
        0.0
    } else {
        min as f64 / total as f64
    };
    let ratio = if min == 0 {
        f64::INFINITY
    } else {
        max as f64 / min as f64
    };
    Some(ShardSkew {
        total,
        shards,
        min,
        max,
        mean,
        max_share,
        min_share,
        ratio,
    })
}
