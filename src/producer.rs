//! Producing-run orchestration.
//!
//! One run fully replaces the container's shard set for the selected half of
//! the source dataset: stale files are deleted first, the half is streamed
//! once to plan bucket boundaries and once to route records into bucket
//! spills, buckets are finalized into shards, and the metadata document is
//! rebuilt from what actually landed on disk.

use std::ops::Range;
use std::path::Path;
use std::thread;

use tracing::debug;

use crate::config::ProducerConfig;
use crate::constants::shards::MAX_SHARDS;
use crate::errors::FeedError;
use crate::metadata::{aggregate, write_metadata};
use crate::metrics::shard_skew;
use crate::normalize::{NormalizeStats, normalize};
use crate::partition::{BucketSpill, IdentifierHistogram};
use crate::plan::{SplitSelector, half_range, plan};
use crate::shards::remove_stale_files;
use crate::source::EntrySource;

/// Summary of one producing run.
#[derive(Debug)]
pub struct ProducerReport {
    /// Total entries reported by the source.
    pub total_entries: usize,
    /// Index range this run was responsible for.
    pub planned_range: Range<usize>,
    /// Records persisted across all shards, after deduplication.
    pub records_persisted: usize,
    /// Shards written, in rank order.
    pub shard_counts: Vec<usize>,
    /// Normalization counters from streaming the selected half.
    pub normalize: NormalizeStats,
}

/// Shard-set producer for one container directory.
pub struct Producer<'a> {
    config: &'a ProducerConfig,
}

impl<'a> Producer<'a> {
    /// Producer using `config`.
    pub fn new(config: &'a ProducerConfig) -> Self {
        Self { config }
    }

    /// Partition and persist the selected half of `source` into `container`.
    pub fn run(
        &self,
        source: &dyn EntrySource,
        container: &Path,
        selector: SplitSelector,
    ) -> Result<ProducerReport, FeedError> {
        std::fs::create_dir_all(container)?;
        remove_stale_files(container)?;

        let total_entries = source.entry_count()?;
        let planned_range = half_range(total_entries, selector);
        debug!(
            total = total_entries,
            start = planned_range.start,
            end = planned_range.end,
            "producing run planned"
        );

        // Pass one: observe surviving identifiers to place bucket edges.
        // Both passes see the same data, so rejection counters are taken
        // here and the routing pass only tracks what it spills.
        let mut histogram = IdentifierHistogram::new(self.config.histogram_cells);
        let mut stats = NormalizeStats::default();
        for chunk in plan(total_entries, selector, self.config.micro_chunk_size) {
            source.visit_entries(chunk, &mut |_, raw| match normalize(&raw) {
                Ok(record) => {
                    stats.kept += 1;
                    histogram.observe(record.identifier);
                }
                Err(rejection) => stats.record(rejection),
            })?;
        }

        if histogram.total() == 0 {
            let metadata = aggregate(container, &self.config.source_tag)?;
            write_metadata(container, &metadata)?;
            return Ok(ProducerReport {
                total_entries,
                planned_range,
                records_persisted: 0,
                shard_counts: Vec::new(),
                normalize: stats,
            });
        }

        let bucket_plan = histogram.plan_buckets(self.config.target_shard_records);
        if bucket_plan.bucket_count() > MAX_SHARDS {
            return Err(FeedError::Configuration(format!(
                "bucket plan wants {} shards, exceeding the {MAX_SHARDS}-shard filename space",
                bucket_plan.bucket_count()
            )));
        }
        debug!(
            buckets = bucket_plan.bucket_count(),
            observed = histogram.total(),
            "bucket boundaries planned"
        );

        // Pass two: route records to bucket spills in positional order, so
        // last-write-wins deduplication sees original update order.
        let mut spill = BucketSpill::create(container, bucket_plan);
        let mut spill_failure: Option<FeedError> = None;
        for (chunk_index, chunk) in
            plan(total_entries, selector, self.config.micro_chunk_size).enumerate()
        {
            source.visit_entries(chunk, &mut |_, raw| {
                if let Ok(record) = normalize(&raw)
                    && let Err(err) = spill.append(&record)
                    && spill_failure.is_none()
                {
                    spill_failure = Some(err);
                }
            })?;
            if let Some(err) = spill_failure.take() {
                return Err(err);
            }
            if self.config.chunk_pause_every > 0
                && chunk_index > 0
                && chunk_index % self.config.chunk_pause_every == 0
            {
                thread::sleep(self.config.chunk_pause);
            }
        }

        let shard_counts = spill.finalize(container)?;
        let records_persisted = shard_counts.iter().sum();
        if let Some(skew) = shard_skew(&shard_counts) {
            debug!(
                shards = skew.shards,
                min = skew.min,
                max = skew.max,
                max_share = skew.max_share,
                "shard balance"
            );
        }

        let metadata = aggregate(container, &self.config.source_tag)?;
        write_metadata(container, &metadata)?;
        debug!(
            persisted = records_persisted,
            rejected = stats.rejected(),
            "producing run finished"
        );

        Ok(ProducerReport {
            total_entries,
            planned_range,
            records_persisted,
            shard_counts,
            normalize: stats,
        })
    }
}
