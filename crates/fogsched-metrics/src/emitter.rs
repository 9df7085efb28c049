//! Telemetry emitter — the record contract with the analysis pipeline.
//!
//! After each placement decision one line is logged:
//!
//! ```text
//! STATUS_UPDATE::{"nodes":{"a":{"status":"UP","cpu":1.5,"memory":42.0}},"chosen":"a"}
//! ```
//!
//! `nodes` keys are in lexical order and each entry always carries
//! `status`, `cpu`, `memory` in that order. `chosen` is `null` when no
//! node was available. Health transitions are logged as they happen:
//!
//! ```text
//! [HEALTH CHECK] Node 'fog-node-1' is now SUSPECTED.
//! [HEALTH CHECK] Node 'fog-node-1' has recovered and is now UP.
//! ```
//!
//! Downstream parsers match on these shapes; do not change them.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use fogsched_state::{NodeId, Snapshot, Transition};

/// Prefix of every per-decision status line.
pub const STATUS_UPDATE_PREFIX: &str = "STATUS_UPDATE::";

/// Tracing target for status update lines.
pub const STATUS_TARGET: &str = "fogsched::status";

/// Tracing target for health transition lines.
pub const HEALTH_TARGET: &str = "fogsched::health";

/// Per-node entry in a status update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeEntry {
    pub status: String,
    pub cpu: f64,
    pub memory: f64,
}

/// One emitted status record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub nodes: BTreeMap<NodeId, NodeEntry>,
    pub chosen: Option<NodeId>,
}

impl StatusUpdate {
    pub fn from_snapshot(snapshot: &Snapshot, chosen: Option<&str>) -> Self {
        let nodes = snapshot
            .iter()
            .map(|r| {
                (
                    r.id.clone(),
                    NodeEntry {
                        status: r.status.label().to_string(),
                        cpu: r.cpu_percent,
                        memory: r.memory_mb,
                    },
                )
            })
            .collect();

        Self {
            nodes,
            chosen: chosen.map(str::to_string),
        }
    }

    /// Render as a single `STATUS_UPDATE::` line.
    pub fn to_line(&self) -> serde_json::Result<String> {
        Ok(format!("{STATUS_UPDATE_PREFIX}{}", serde_json::to_string(self)?))
    }

    /// Extract a record from a log line containing a `STATUS_UPDATE::`
    /// payload. Anything before the prefix (timestamps, level) is ignored.
    pub fn parse_line(line: &str) -> Option<Self> {
        let (_, payload) = line.split_once(STATUS_UPDATE_PREFIX)?;
        serde_json::from_str(payload.trim()).ok()
    }
}

/// Counter values for exposition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmitterCounters {
    pub placements: u64,
    pub placement_failures: u64,
    pub suspected: u64,
    pub recovered: u64,
}

/// Writes status records and transition events, and counts them.
#[derive(Default)]
pub struct TelemetryEmitter {
    placements: AtomicU64,
    placement_failures: AtomicU64,
    suspected: AtomicU64,
    recovered: AtomicU64,
    last: Mutex<Option<StatusUpdate>>,
}

impl TelemetryEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit the record for one placement decision. `chosen` is `None` when
    /// the decision found no available node.
    pub fn emit(&self, snapshot: &Snapshot, chosen: Option<&str>) -> StatusUpdate {
        let update = StatusUpdate::from_snapshot(snapshot, chosen);

        match update.to_line() {
            Ok(line) => info!(target: STATUS_TARGET, "{line}"),
            Err(e) => error!(error = %e, "failed to serialize status update"),
        }

        if chosen.is_some() {
            self.placements.fetch_add(1, Ordering::Relaxed);
        } else {
            self.placement_failures.fetch_add(1, Ordering::Relaxed);
        }

        *self.last.lock().unwrap_or_else(PoisonError::into_inner) = Some(update.clone());
        update
    }

    /// Emit a health transition event.
    pub fn transition(&self, transition: &Transition) {
        let node = transition.node();
        let line = transition.event_line();
        match transition {
            Transition::Suspected { .. } => {
                self.suspected.fetch_add(1, Ordering::Relaxed);
                warn!(target: HEALTH_TARGET, node = %node, "{line}");
            }
            Transition::Recovered { .. } => {
                self.recovered.fetch_add(1, Ordering::Relaxed);
                info!(target: HEALTH_TARGET, node = %node, "{line}");
            }
        }
    }

    pub fn counters(&self) -> EmitterCounters {
        EmitterCounters {
            placements: self.placements.load(Ordering::Relaxed),
            placement_failures: self.placement_failures.load(Ordering::Relaxed),
            suspected: self.suspected.load(Ordering::Relaxed),
            recovered: self.recovered.load(Ordering::Relaxed),
        }
    }

    /// The most recently emitted record.
    pub fn last_update(&self) -> Option<StatusUpdate> {
        self.last
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
