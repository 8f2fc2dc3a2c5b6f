//! Host-driven run dispatch.
//!
//! The host invokes the pipeline through one lifecycle callback; the
//! operating mode and any pending identifier come from the shared settings
//! document, read once at run start. Whatever the branch does, the host's
//! `complete_request` is always called before returning.

use std::path::Path;

use chrono::Utc;
use tracing::debug;

use crate::config::ProcessingBudget;
use crate::errors::FeedError;
use crate::host::DirectoryHost;
use crate::incremental::{self, UpdateOperation};
use crate::ingest::{BudgetedIngestor, RunOutcome, RunReport};
use crate::settings::{OperatingMode, SettingsStore};
use crate::types::Identifier;

/// What a dispatched run did.
#[derive(Debug)]
pub enum RequestOutcome {
    /// A full budgeted replay ran; the report describes how it ended.
    FullLoad(RunReport),
    /// A single incremental delta was applied.
    Incremental {
        /// The operation performed.
        operation: UpdateOperation,
        /// The identifier it was applied to.
        identifier: Identifier,
    },
}

/// Execute one host request against the shared container.
///
/// Full loads that end with any valid delivered prefix (`Completed`,
/// `TimedOut`, `MemoryAborted`) stamp the last-full-update time, which the
/// incremental path requires. `complete_request` is issued on every path.
pub fn run_directory_request(
    container: &Path,
    budget: &ProcessingBudget,
    host: &mut dyn DirectoryHost,
) -> Result<RequestOutcome, FeedError> {
    let store = SettingsStore::new(container);
    let settings = store.load()?;
    debug!(mode = ?settings.processing_mode, "dispatching directory request");

    let result = match settings.processing_mode {
        OperatingMode::FullLoad => {
            let report = BudgetedIngestor::new(budget).run(container, host);
            if report.outcome != RunOutcome::Failed {
                store.stamp_last_full_update(Utc::now())?;
            }
            Ok(RequestOutcome::FullLoad(report))
        }
        OperatingMode::AddBlock | OperatingMode::RemoveBlock => {
            let operation = if settings.processing_mode == OperatingMode::AddBlock {
                UpdateOperation::Add
            } else {
                UpdateOperation::Remove
            };
            let raw = settings.pending_identifier.clone().ok_or_else(|| {
                FeedError::IncrementalUnavailable("no pending identifier stored".to_string())
            });
            raw.and_then(|raw| incremental::apply(operation, &raw, &settings, host))
                .map(|identifier| RequestOutcome::Incremental {
                    operation,
                    identifier,
                })
        }
    };

    host.complete_request().map_err(FeedError::HostRejected)?;
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::settings::{
        MODE_ADD_ONE_BLOCK_NUMBER, PENDING_IDENTIFIER_KEY, PROCESSING_TYPE_KEY,
    };
    use crate::host::HostRejection;
    use tempfile::tempdir;

    #[derive(Default)]
    struct ScriptedHost {
        incremental: bool,
        identifications: Vec<(Identifier, String)>,
        blocked: Vec<Identifier>,
        completions: usize,
    }

    impl DirectoryHost for ScriptedHost {
        fn is_incremental(&self) -> bool {
            self.incremental
        }

        fn add_identification_entry(
            &mut self,
            identifier: Identifier,
            label: &str,
        ) -> Result<(), HostRejection> {
            self.identifications.push((identifier, label.to_string()));
            Ok(())
        }

        fn remove_identification_entry(
            &mut self,
            _identifier: Identifier,
        ) -> Result<(), HostRejection> {
            Ok(())
        }

        fn add_blocking_entry(&mut self, identifier: Identifier) -> Result<(), HostRejection> {
            self.blocked.push(identifier);
            Ok(())
        }

        fn remove_blocking_entry(&mut self, _identifier: Identifier) -> Result<(), HostRejection> {
            Ok(())
        }

        fn complete_request(&mut self) -> Result<(), HostRejection> {
            self.completions += 1;
            Ok(())
        }
    }

    #[test]
    fn default_mode_runs_a_full_load_and_stamps_the_settings() {
        let dir = tempdir().unwrap();
        let budget = ProcessingBudget::default();
        let mut host = ScriptedHost::default();

        let outcome = run_directory_request(dir.path(), &budget, &mut host).unwrap();
        match outcome {
            RequestOutcome::FullLoad(report) => {
                assert_eq!(report.outcome, RunOutcome::Completed);
                assert_eq!(report.accepted, 0);
            }
            other => panic!("expected full load, got {other:?}"),
        }
        assert_eq!(host.completions, 1);

        let stamped = SettingsStore::new(dir.path()).load().unwrap();
        assert!(stamped.last_full_update.is_some());
    }

    #[test]
    fn block_mode_applies_the_pending_identifier() {
        let dir = tempdir().unwrap();
        let store = SettingsStore::new(dir.path());
        store
            .put_string(PROCESSING_TYPE_KEY, MODE_ADD_ONE_BLOCK_NUMBER)
            .unwrap();
        store
            .put_string(PENDING_IDENTIFIER_KEY, "917995763073")
            .unwrap();
        store.stamp_last_full_update(Utc::now()).unwrap();

        let budget = ProcessingBudget::default();
        let mut host = ScriptedHost {
            incremental: true,
            ..ScriptedHost::default()
        };
        let outcome = run_directory_request(dir.path(), &budget, &mut host).unwrap();
        match outcome {
            RequestOutcome::Incremental {
                operation,
                identifier,
            } => {
                assert_eq!(operation, UpdateOperation::Add);
                assert_eq!(identifier, 917995763073);
            }
            other => panic!("expected incremental, got {other:?}"),
        }
        assert_eq!(host.blocked, vec![917995763073]);
        assert_eq!(host.completions, 1);
    }

    #[test]
    fn incremental_rejection_still_completes_the_request() {
        let dir = tempdir().unwrap();
        let store = SettingsStore::new(dir.path());
        store
            .put_string(PROCESSING_TYPE_KEY, MODE_ADD_ONE_BLOCK_NUMBER)
            .unwrap();
        // No pending identifier stored.

        let budget = ProcessingBudget::default();
        let mut host = ScriptedHost {
            incremental: true,
            ..ScriptedHost::default()
        };
        let err = run_directory_request(dir.path(), &budget, &mut host).unwrap_err();
        assert!(matches!(err, FeedError::IncrementalUnavailable(_)));
        assert_eq!(host.completions, 1);
    }
}
