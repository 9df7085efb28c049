//! Out-of-band failure reports.
//!
//! A consumer that fails to reach its assigned node reports it here so the
//! scheduler stops routing to it immediately instead of waiting for the
//! next telemetry failure. Reports only ever demote; recovery is the health
//! monitor's job.

use std::sync::Arc;

use tracing::{debug, warn};

use fogsched_metrics::TelemetryEmitter;
use fogsched_state::{StateError, StatusStore};

/// What a report did. Every outcome is acknowledged to the reporter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOutcome {
    /// The node moved UP → SUSPECTED.
    Suspected,
    /// The node was already SUSPECTED; its failure time is unchanged.
    AlreadySuspected,
    /// The id is not part of the configured pool.
    UnknownNode,
}

#[derive(Clone)]
pub struct FailureReporter {
    store: StatusStore,
    emitter: Arc<TelemetryEmitter>,
}

impl FailureReporter {
    pub fn new(store: StatusStore, emitter: Arc<TelemetryEmitter>) -> Self {
        Self { store, emitter }
    }

    pub fn report_failure(&self, node: &str) -> ReportOutcome {
        match self.store.mark_suspected(node) {
            Ok(Some(transition)) => {
                self.emitter.transition(&transition);
                ReportOutcome::Suspected
            }
            Ok(None) => {
                debug!(node = %node, "failure report for already suspected node");
                ReportOutcome::AlreadySuspected
            }
            Err(StateError::UnknownNode(_)) => {
                warn!(node = %node, "failure report for unknown node ignored");
                ReportOutcome::UnknownNode
            }
            Err(e) => {
                warn!(node = %node, error = %e, "failure report not applied");
                ReportOutcome::UnknownNode
            }
        }
    }
}
