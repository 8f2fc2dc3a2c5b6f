//! Budgeted replay of a shard set into the host.
//!
//! The consumer walks shards in filename order and feeds each record through
//! the host's sequential-add call, one at a time. The host enforces an
//! absolute outer deadline and memory ceiling of its own, so the run
//! self-monitors slightly tighter budgets and stops early at shard
//! boundaries; any prefix delivered before a stop is valid and ordered,
//! which makes a budget stop a terminal outcome rather than an error.

use std::fs;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::config::ProcessingBudget;
use crate::errors::FeedError;
use crate::host::DirectoryHost;
use crate::shards::{list_shard_files, read_shard};

/// Source of resident memory samples for the budget monitor.
pub trait MemoryProbe {
    /// Current resident set size in bytes, if measurable.
    fn resident_bytes(&self) -> Option<u64>;
}

/// Probe reading `VmRSS` from `/proc/self/status`.
pub struct ProcStatusProbe;

impl MemoryProbe for ProcStatusProbe {
    fn resident_bytes(&self) -> Option<u64> {
        let text = fs::read_to_string("/proc/self/status").ok()?;
        parse_vm_rss(&text)
    }
}

fn parse_vm_rss(status: &str) -> Option<u64> {
    for line in status.lines() {
        if let Some(value) = line.strip_prefix("VmRSS:") {
            let kib = value.split_whitespace().next()?.parse::<u64>().ok()?;
            return Some(kib * 1024);
        }
    }
    None
}

/// How one consumer run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every eligible shard was streamed.
    Completed,
    /// The wall-clock budget expired; the streamed prefix stands.
    TimedOut,
    /// Consecutive memory warnings exceeded the limit; the prefix stands.
    MemoryAborted,
    /// An unrecoverable failure unrelated to budgets.
    Failed,
}

/// Terminal report for one consumer run.
#[derive(Debug)]
pub struct RunReport {
    /// Terminal state of the run.
    pub outcome: RunOutcome,
    /// Records accepted by the host.
    pub accepted: u64,
    /// Shards streamed successfully.
    pub shards_visited: usize,
    /// Shards skipped because they failed to parse.
    pub shards_skipped: usize,
    /// Wall-clock time spent.
    pub elapsed: Duration,
    /// Resident memory at run start, if measurable.
    pub memory_start: Option<u64>,
    /// Resident memory at run end, if measurable.
    pub memory_end: Option<u64>,
    /// The failure that ended a `Failed` run.
    pub failure: Option<FeedError>,
}

/// Shard-set consumer enforcing the processing budget.
pub struct BudgetedIngestor<'a> {
    budget: &'a ProcessingBudget,
    probe: Box<dyn MemoryProbe>,
}

impl<'a> BudgetedIngestor<'a> {
    /// Ingestor with the default `/proc`-backed memory probe.
    pub fn new(budget: &'a ProcessingBudget) -> Self {
        Self {
            budget,
            probe: Box::new(ProcStatusProbe),
        }
    }

    /// Replace the memory probe (used by tests and non-Linux hosts).
    pub fn with_probe(mut self, probe: Box<dyn MemoryProbe>) -> Self {
        self.probe = probe;
        self
    }

    /// Stream every shard in `container` into `host`, in order.
    ///
    /// Never returns an error: failures become a `Failed` report so callers
    /// always see the work completed before the stop.
    pub fn run(&self, container: &Path, host: &mut dyn DirectoryHost) -> RunReport {
        let started = Instant::now();
        let memory_start = self.probe.resident_bytes();

        let mut accepted = 0u64;
        let mut shards_visited = 0usize;
        let mut shards_skipped = 0usize;
        let mut outcome = RunOutcome::Completed;
        let mut failure = None;

        debug!(container = %container.display(), "scanning shard container");
        match list_shard_files(container) {
            Err(err) => {
                warn!(%err, "shard scan failed");
                outcome = RunOutcome::Failed;
                failure = Some(err);
            }
            Ok(files) if files.is_empty() => {
                debug!("no shards found, nothing to stream");
            }
            Ok(files) => {
                let mut memory_warnings = 0u32;
                let eligible = files.len().min(self.budget.max_shards_per_run);
                debug!(shards = files.len(), eligible, "streaming shard set");

                'shards: for (index, path) in files.iter().take(eligible).enumerate() {
                    if started.elapsed() > self.budget.max_wall_clock {
                        outcome = RunOutcome::TimedOut;
                        break 'shards;
                    }

                    if index > 0
                        && self.budget.memory_check_every_n_shards > 0
                        && index % self.budget.memory_check_every_n_shards == 0
                        && let Some(resident) = self.probe.resident_bytes()
                    {
                        if resident > self.budget.max_resident_memory_bytes {
                            memory_warnings += 1;
                            warn!(
                                resident,
                                ceiling = self.budget.max_resident_memory_bytes,
                                consecutive = memory_warnings,
                                "resident memory over ceiling"
                            );
                            if memory_warnings >= self.budget.max_consecutive_memory_warnings {
                                outcome = RunOutcome::MemoryAborted;
                                break 'shards;
                            }
                            // Compaction point: nothing is buffered across
                            // shards, so yielding and pausing lets freed
                            // pages settle before the next sample.
                            thread::yield_now();
                            thread::sleep(self.budget.memory_settle_pause);
                        } else {
                            memory_warnings = 0;
                        }
                    }

                    match read_shard(path) {
                        Ok(records) => {
                            for record in &records {
                                if let Err(rejection) = host
                                    .add_identification_entry(record.identifier, &record.label)
                                {
                                    warn!(
                                        code = rejection.code(),
                                        %rejection,
                                        "host rejected entry"
                                    );
                                    outcome = RunOutcome::Failed;
                                    failure = Some(FeedError::HostRejected(rejection));
                                    break 'shards;
                                }
                                accepted += 1;
                            }
                            shards_visited += 1;
                            debug!(
                                shard = %path.display(),
                                records = records.len(),
                                "shard streamed"
                            );
                        }
                        Err(err) => {
                            shards_skipped += 1;
                            warn!(shard = %path.display(), %err, "skipping unreadable shard");
                        }
                    }

                    if self.budget.cooldown_every_n_shards > 0
                        && index > 0
                        && index % self.budget.cooldown_every_n_shards == 0
                    {
                        thread::sleep(self.budget.cooldown_pause);
                    }

                    if started.elapsed() > self.budget.max_wall_clock {
                        outcome = RunOutcome::TimedOut;
                        break 'shards;
                    }
                }
            }
        }

        let report = RunReport {
            outcome,
            accepted,
            shards_visited,
            shards_skipped,
            elapsed: started.elapsed(),
            memory_start,
            memory_end: self.probe.resident_bytes(),
            failure,
        };
        debug!(
            outcome = ?report.outcome,
            accepted = report.accepted,
            visited = report.shards_visited,
            skipped = report.shards_skipped,
            elapsed_ms = report.elapsed.as_millis(),
            "run finished"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vm_rss_parses_kib_lines() {
        let status = "VmPeak:\t  102400 kB\nVmRSS:\t    2048 kB\nThreads:\t3\n";
        assert_eq!(parse_vm_rss(status), Some(2048 * 1024));
    }

    #[test]
    fn vm_rss_absent_or_garbled_yields_none() {
        assert_eq!(parse_vm_rss("VmPeak:\t 1 kB\n"), None);
        assert_eq!(parse_vm_rss("VmRSS:\t not-a-number kB\n"), None);
    }
}
