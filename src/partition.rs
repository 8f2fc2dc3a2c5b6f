//! Key partitioning that makes cross-shard ordering hold by construction.
//!
//! Micro-chunks are only locally sortable, so sorting each chunk and writing
//! shards in chunk order would let shard key ranges overlap. Instead the
//! producer streams the selected half twice: pass one builds a histogram
//! over coarse cells of the identifier domain and turns it into bucket
//! boundaries balanced around a target shard size; pass two routes every
//! surviving record to its bucket's spill file. Each bucket is then loaded
//! alone (bounded by construction), deduplicated last-write-wins, sorted,
//! and persisted as the shard whose index is the bucket's rank. Every
//! identifier in shard *i* is strictly below every identifier in shard
//! *i + 1*.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::debug;

use crate::constants::domain::{DOMAIN_UPPER_EDGE, MIN_IDENTIFIER_EXCLUSIVE};
use crate::constants::shards::{SPILL_FILE_EXT, SPILL_FILE_PREFIX};
use crate::data::CanonicalRecord;
use crate::errors::FeedError;
use crate::shards::write_shard;
use crate::types::{Identifier, Label, ShardIndex};

const DOMAIN_LO: i64 = MIN_IDENTIFIER_EXCLUSIVE + 1;

/// Fixed-cell histogram over the identifier domain, filled in pass one.
#[derive(Clone, Debug)]
pub struct IdentifierHistogram {
    cells: Vec<u64>,
}

impl IdentifierHistogram {
    /// Histogram with `cells` equal-width cells spanning the domain.
    pub fn new(cells: usize) -> Self {
        Self {
            cells: vec![0; cells.max(1)],
        }
    }

    fn cell_width(&self) -> i64 {
        ((DOMAIN_UPPER_EDGE - DOMAIN_LO) / self.cells.len() as i64).max(1)
    }

    fn cell_of(&self, identifier: Identifier) -> usize {
        if identifier < DOMAIN_LO {
            return 0;
        }
        let offset = (identifier - DOMAIN_LO) / self.cell_width();
        (offset as usize).min(self.cells.len() - 1)
    }

    /// Count one observed identifier.
    pub fn observe(&mut self, identifier: Identifier) {
        let cell = self.cell_of(identifier);
        self.cells[cell] += 1;
    }

    /// Total identifiers observed.
    pub fn total(&self) -> u64 {
        self.cells.iter().sum()
    }

    /// Derive bucket boundaries by greedily accumulating cells until each
    /// bucket holds roughly `target_per_bucket` observations.
    ///
    /// Deterministic for a given input; the final bucket always extends to
    /// `i64::MAX` so any valid identifier routes somewhere.
    pub fn plan_buckets(&self, target_per_bucket: usize) -> BucketPlan {
        let target = target_per_bucket.max(1) as u64;
        let width = self.cell_width();
        let mut upper_edges = Vec::new();
        let mut accumulated = 0u64;
        for (cell, count) in self.cells.iter().enumerate() {
            accumulated += count;
            if accumulated >= target {
                upper_edges.push(DOMAIN_LO + width * (cell as i64 + 1));
                accumulated = 0;
            }
        }
        if accumulated > 0 || upper_edges.is_empty() {
            upper_edges.push(i64::MAX);
        } else if let Some(last) = upper_edges.last_mut() {
            *last = i64::MAX;
        }
        BucketPlan { upper_edges }
    }
}

/// Disjoint, contiguous identifier ranges covering the whole domain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BucketPlan {
    upper_edges: Vec<i64>,
}

impl BucketPlan {
    /// Number of buckets (equals the maximum shard count of the run).
    pub fn bucket_count(&self) -> usize {
        self.upper_edges.len()
    }

    /// Rank of the bucket owning `identifier`.
    pub fn route(&self, identifier: Identifier) -> usize {
        self.upper_edges
            .partition_point(|edge| identifier >= *edge)
            .min(self.upper_edges.len() - 1)
    }
}

/// Append-only spill files, one per bucket, filled in pass two.
pub struct BucketSpill {
    dir: PathBuf,
    plan: BucketPlan,
    writers: Vec<Option<BufWriter<File>>>,
}

impl BucketSpill {
    /// Spill writer set for `plan` rooted at `dir`.
    pub fn create(dir: &Path, plan: BucketPlan) -> Self {
        let buckets = plan.bucket_count();
        Self {
            dir: dir.to_path_buf(),
            plan,
            writers: (0..buckets).map(|_| None).collect(),
        }
    }

    fn spill_path(&self, bucket: usize) -> PathBuf {
        self.dir
            .join(format!("{SPILL_FILE_PREFIX}{bucket:03}.{SPILL_FILE_EXT}"))
    }

    /// Route one record to its bucket file. Writers open lazily so sparse
    /// plans never touch the disk for empty buckets.
    pub fn append(&mut self, record: &CanonicalRecord) -> Result<(), FeedError> {
        let bucket = self.plan.route(record.identifier);
        let path = self.spill_path(bucket);
        let slot = &mut self.writers[bucket];
        let writer = match slot {
            Some(writer) => writer,
            None => {
                let file = OpenOptions::new().create(true).append(true).open(&path)?;
                slot.insert(BufWriter::new(file))
            }
        };
        serde_json::to_writer(&mut *writer, record).map_err(|err| {
            FeedError::ShardUnreadable {
                path: path.display().to_string(),
                reason: format!("spill encoding failed: {err}"),
            }
        })?;
        writer.write_all(b"\n")?;
        Ok(())
    }

    /// Load, deduplicate, sort, and persist each non-empty bucket as one
    /// shard; spill files are removed as they are consumed.
    ///
    /// Duplicate identifiers resolve last-write-wins in original positional
    /// order. Returns per-shard record counts in shard order.
    pub fn finalize(mut self, shard_dir: &Path) -> Result<Vec<usize>, FeedError> {
        let mut shard_counts = Vec::new();
        let mut next_shard: ShardIndex = 0;
        for bucket in 0..self.plan.bucket_count() {
            let Some(mut writer) = self.writers[bucket].take() else {
                continue;
            };
            writer.flush()?;
            drop(writer);

            let spill = self.spill_path(bucket);
            let mut merged: IndexMap<Identifier, Label> = IndexMap::new();
            for record in read_spill(&spill)? {
                merged.insert(record.identifier, record.label);
            }
            let mut finalized: Vec<CanonicalRecord> = merged
                .into_iter()
                .map(|(identifier, label)| CanonicalRecord { identifier, label })
                .collect();
            finalized.sort_unstable_by_key(|record| record.identifier);

            write_shard(shard_dir, next_shard, &finalized)?;
            debug!(
                shard = next_shard,
                bucket,
                records = finalized.len(),
                "bucket finalized"
            );
            shard_counts.push(finalized.len());
            next_shard += 1;
            fs::remove_file(&spill)?;
        }
        Ok(shard_counts)
    }
}

fn read_spill(path: &Path) -> Result<Vec<CanonicalRecord>, FeedError> {
    let file = File::open(path).map_err(|err| FeedError::ShardUnreadable {
        path: path.display().to_string(),
        reason: err.to_string(),
    })?;
    let mut records = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|err| FeedError::ShardUnreadable {
            path: path.display().to_string(),
            reason: err.to_string(),
        })?;
        if line.is_empty() {
            continue;
        }
        let record =
            serde_json::from_str(&line).map_err(|err| FeedError::ShardUnreadable {
                path: path.display().to_string(),
                reason: format!("corrupt spill line: {err}"),
            })?;
        records.push(record);
    }
    Ok(records)
}
