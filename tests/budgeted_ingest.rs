use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::time::Duration;

use callfeed::shards::write_shard;
use callfeed::{
    BudgetedIngestor, CanonicalRecord, DirectoryHost, HostRejection, Identifier, MemoryProbe,
    ProcessingBudget, RunOutcome,
};

#[derive(Default)]
struct RecordingHost {
    accepted: Vec<(Identifier, String)>,
    reject_at: Option<usize>,
    rejection: Option<HostRejection>,
}

impl DirectoryHost for RecordingHost {
    fn is_incremental(&self) -> bool {
        false
    }

    fn add_identification_entry(
        &mut self,
        identifier: Identifier,
        label: &str,
    ) -> Result<(), HostRejection> {
        if let Some(at) = self.reject_at
            && self.accepted.len() >= at
        {
            return Err(self.rejection.unwrap_or(HostRejection::Unknown));
        }
        self.accepted.push((identifier, label.to_string()));
        Ok(())
    }

    fn remove_identification_entry(&mut self, _identifier: Identifier) -> Result<(), HostRejection> {
        Ok(())
    }

    fn add_blocking_entry(&mut self, _identifier: Identifier) -> Result<(), HostRejection> {
        Ok(())
    }

    fn remove_blocking_entry(&mut self, _identifier: Identifier) -> Result<(), HostRejection> {
        Ok(())
    }

    fn complete_request(&mut self) -> Result<(), HostRejection> {
        Ok(())
    }
}

/// Probe that replays a scripted sequence of samples, repeating the last.
struct ScriptedProbe {
    samples: RefCell<VecDeque<u64>>,
    last: RefCell<u64>,
}

impl ScriptedProbe {
    fn new(samples: Vec<u64>) -> Self {
        Self {
            samples: RefCell::new(samples.into_iter().collect()),
            last: RefCell::new(0),
        }
    }
}

impl MemoryProbe for ScriptedProbe {
    fn resident_bytes(&self) -> Option<u64> {
        if let Some(next) = self.samples.borrow_mut().pop_front() {
            *self.last.borrow_mut() = next;
        }
        Some(*self.last.borrow())
    }
}

fn quick_budget() -> ProcessingBudget {
    ProcessingBudget {
        cooldown_pause: Duration::ZERO,
        memory_settle_pause: Duration::ZERO,
        ..ProcessingBudget::default()
    }
}

/// Write `shards` consecutive shards of `per_shard` records with globally
/// disjoint, ascending key ranges.
fn write_ordered_shards(dir: &Path, shards: usize, per_shard: usize) -> usize {
    let mut identifier = 1_000_000_001i64;
    for index in 0..shards {
        let records: Vec<CanonicalRecord> = (0..per_shard)
            .map(|_| {
                let record = CanonicalRecord {
                    identifier,
                    label: format!("entry {identifier}"),
                };
                identifier += 7;
                record
            })
            .collect();
        write_shard(dir, index, &records).unwrap();
    }
    shards * per_shard
}

fn assert_strictly_ascending(accepted: &[(Identifier, String)]) {
    for pair in accepted.windows(2) {
        assert!(pair[0].0 < pair[1].0, "prefix must stay strictly ascending");
    }
}

#[test]
fn full_run_streams_every_record_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let total = write_ordered_shards(dir.path(), 6, 40);
    let budget = quick_budget();
    let mut host = RecordingHost::default();

    let report = BudgetedIngestor::new(&budget).run(dir.path(), &mut host);
    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.accepted, total as u64);
    assert_eq!(report.shards_visited, 6);
    assert_eq!(report.shards_skipped, 0);
    assert_eq!(host.accepted.len(), total);
    assert_strictly_ascending(&host.accepted);
}

#[test]
fn empty_container_completes_with_zero_entries() {
    let dir = tempfile::tempdir().unwrap();
    let budget = quick_budget();
    let mut host = RecordingHost::default();

    let report = BudgetedIngestor::new(&budget).run(dir.path(), &mut host);
    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.accepted, 0);
    assert_eq!(report.shards_visited, 0);
}

#[test]
fn missing_container_fails_without_touching_the_host() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent");
    let budget = quick_budget();
    let mut host = RecordingHost::default();

    let report = BudgetedIngestor::new(&budget).run(&missing, &mut host);
    assert_eq!(report.outcome, RunOutcome::Failed);
    assert!(report.failure.is_some());
    assert!(host.accepted.is_empty());
}

#[test]
fn expired_clock_truncates_before_the_first_shard() {
    let dir = tempfile::tempdir().unwrap();
    write_ordered_shards(dir.path(), 4, 10);
    let budget = ProcessingBudget {
        max_wall_clock: Duration::ZERO,
        ..quick_budget()
    };
    let mut host = RecordingHost::default();

    let report = BudgetedIngestor::new(&budget).run(dir.path(), &mut host);
    assert_eq!(report.outcome, RunOutcome::TimedOut);
    assert_eq!(report.accepted, 0);
    assert_strictly_ascending(&host.accepted);
}

#[test]
fn memory_pressure_aborts_after_consecutive_warnings() {
    let dir = tempfile::tempdir().unwrap();
    write_ordered_shards(dir.path(), 8, 5);
    let budget = ProcessingBudget {
        memory_check_every_n_shards: 1,
        max_consecutive_memory_warnings: 3,
        max_resident_memory_bytes: 1000,
        ..quick_budget()
    };
    // First sample (run start) plus checks at shard indices 1..: stay low
    // once, then pin above the ceiling.
    let probe = ScriptedProbe::new(vec![500, 500, 2000]);
    let mut host = RecordingHost::default();

    let report = BudgetedIngestor::new(&budget)
        .with_probe(Box::new(probe))
        .run(dir.path(), &mut host);
    assert_eq!(report.outcome, RunOutcome::MemoryAborted);
    // Shards 0..=3 streamed: the warning counter reaches 3 at the index-4
    // check, before shard 4 is read.
    assert_eq!(report.shards_visited, 4);
    assert_eq!(report.accepted, 20);
    assert_strictly_ascending(&host.accepted);
    assert_eq!(report.memory_end, Some(2000));
}

#[test]
fn recovering_memory_resets_the_warning_counter() {
    let dir = tempfile::tempdir().unwrap();
    write_ordered_shards(dir.path(), 8, 5);
    let budget = ProcessingBudget {
        memory_check_every_n_shards: 1,
        max_consecutive_memory_warnings: 3,
        max_resident_memory_bytes: 1000,
        ..quick_budget()
    };
    // Warnings at indices 1 and 2 are interrupted by a healthy sample at 3,
    // so the run never accumulates three in a row.
    let probe = ScriptedProbe::new(vec![500, 2000, 2000, 500]);
    let mut host = RecordingHost::default();

    let report = BudgetedIngestor::new(&budget)
        .with_probe(Box::new(probe))
        .run(dir.path(), &mut host);
    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.shards_visited, 8);
}

#[test]
fn unreadable_shards_are_skipped_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    write_ordered_shards(dir.path(), 2, 10);
    // Slot an unparseable shard between the two valid ones.
    fs::rename(
        dir.path().join("spam-batch-001.json"),
        dir.path().join("spam-batch-002.json"),
    )
    .unwrap();
    fs::write(dir.path().join("spam-batch-001.json"), b"corrupt").unwrap();

    let budget = quick_budget();
    let mut host = RecordingHost::default();
    let report = BudgetedIngestor::new(&budget).run(dir.path(), &mut host);

    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.shards_visited, 2);
    assert_eq!(report.shards_skipped, 1);
    assert_eq!(report.accepted, 20);
    assert_strictly_ascending(&host.accepted);
}

#[test]
fn host_rejection_is_fatal_and_never_retried() {
    let dir = tempfile::tempdir().unwrap();
    write_ordered_shards(dir.path(), 3, 10);
    let budget = quick_budget();
    let mut host = RecordingHost {
        reject_at: Some(15),
        rejection: Some(HostRejection::EntriesOutOfOrder),
        ..RecordingHost::default()
    };

    let report = BudgetedIngestor::new(&budget).run(dir.path(), &mut host);
    assert_eq!(report.outcome, RunOutcome::Failed);
    assert_eq!(report.accepted, 15);
    assert_eq!(host.accepted.len(), 15);
    assert!(matches!(
        report.failure,
        Some(callfeed::FeedError::HostRejected(
            HostRejection::EntriesOutOfOrder
        ))
    ));
}

#[test]
fn shard_cap_truncates_at_a_shard_boundary() {
    let dir = tempfile::tempdir().unwrap();
    write_ordered_shards(dir.path(), 6, 4);
    let budget = ProcessingBudget {
        max_shards_per_run: 2,
        ..quick_budget()
    };
    let mut host = RecordingHost::default();

    let report = BudgetedIngestor::new(&budget).run(dir.path(), &mut host);
    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.shards_visited, 2);
    assert_eq!(report.accepted, 8);
    assert_strictly_ascending(&host.accepted);
}
