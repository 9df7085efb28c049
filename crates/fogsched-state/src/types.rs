//! Domain types for the status store.
//!
//! A [`NodeRecord`] carries everything the placement engine needs to know
//! about one fog node. Health is a closed enum: the failure timestamp lives
//! inside the `Suspected` variant, so a SUSPECTED node without a failure
//! time (or an UP node with one) cannot be represented.

use std::fmt;
use std::time::{Duration, Instant};

/// Stable identifier of a fog node, fixed at startup.
pub type NodeId = String;

// ── Health ─────────────────────────────────────────────────────────

/// Health of a fog node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    /// Eligible for placement.
    Up,
    /// A liveness or telemetry check failed at `since`.
    Suspected { since: Instant },
}

impl NodeStatus {
    /// Wire label used in emitted records and API responses.
    pub fn label(&self) -> &'static str {
        match self {
            NodeStatus::Up => "UP",
            NodeStatus::Suspected { .. } => "SUSPECTED",
        }
    }

    pub fn is_up(&self) -> bool {
        matches!(self, NodeStatus::Up)
    }

    /// Time of the most recent failure, if suspected.
    pub fn last_failure(&self) -> Option<Instant> {
        match self {
            NodeStatus::Up => None,
            NodeStatus::Suspected { since } => Some(*since),
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ── Resources ──────────────────────────────────────────────────────

/// One successful resource reading for a node.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResourceSample {
    pub cpu_percent: f64,
    pub memory_mb: f64,
}

// ── Record ─────────────────────────────────────────────────────────

/// Per-node health and resource state.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRecord {
    pub id: NodeId,
    pub status: NodeStatus,
    /// Last successfully sampled CPU usage (percent of one core × cores).
    pub cpu_percent: f64,
    /// Last successfully sampled resident memory in MB.
    pub memory_mb: f64,
    /// Placements made by the least-connections strategy.
    pub connections: u64,
    /// When `cpu_percent`/`memory_mb` were last refreshed. `None` means the
    /// values are still the zero defaults.
    pub sampled_at: Option<Instant>,
}

impl NodeRecord {
    pub fn new(id: impl Into<NodeId>) -> Self {
        Self {
            id: id.into(),
            status: NodeStatus::Up,
            cpu_percent: 0.0,
            memory_mb: 0.0,
            connections: 0,
            sampled_at: None,
        }
    }

    pub fn is_up(&self) -> bool {
        self.status.is_up()
    }

    pub fn has_sample(&self) -> bool {
        self.sampled_at.is_some()
    }

    /// How long the node has been suspected as of `now`, or `None` if UP.
    pub fn suspected_for(&self, now: Instant) -> Option<Duration> {
        self.status
            .last_failure()
            .map(|since| now.saturating_duration_since(since))
    }

    /// Whether the health monitor should fetch telemetry for this node.
    ///
    /// UP nodes are always checked; SUSPECTED nodes only once strictly more
    /// than `recovery_timeout` has elapsed since their last failure.
    pub fn due_for_check(&self, now: Instant, recovery_timeout: Duration) -> bool {
        match self.suspected_for(now) {
            None => true,
            Some(elapsed) => elapsed > recovery_timeout,
        }
    }
}

// ── Snapshot ───────────────────────────────────────────────────────

/// Immutable point-in-time copy of the whole table.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Records in configured order.
    pub records: Vec<NodeRecord>,
    /// Whether the telemetry collaborator was reachable at snapshot time.
    pub telemetry_available: bool,
}

impl Snapshot {
    pub fn get(&self, id: &str) -> Option<&NodeRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &NodeRecord> {
        self.records.iter()
    }

    /// Records currently eligible for placement.
    pub fn up_nodes(&self) -> impl Iterator<Item = &NodeRecord> {
        self.records.iter().filter(|r| r.is_up())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ── Transitions ────────────────────────────────────────────────────

/// A health state change that just happened in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// UP → SUSPECTED.
    Suspected { node: NodeId, at: Instant },
    /// SUSPECTED → UP.
    Recovered { node: NodeId },
}

impl Transition {
    pub fn node(&self) -> &str {
        match self {
            Transition::Suspected { node, .. } | Transition::Recovered { node } => node,
        }
    }

    /// The `[HEALTH CHECK]` event line for this transition.
    pub fn event_line(&self) -> String {
        match self {
            Transition::Suspected { node, .. } => {
                format!("[HEALTH CHECK] Node '{node}' is now SUSPECTED.")
            }
            Transition::Recovered { node } => {
                format!("[HEALTH CHECK] Node '{node}' has recovered and is now UP.")
            }
        }
    }
}

/// Result of applying a successful telemetry sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkUp {
    /// The node was already UP; resources refreshed.
    Refreshed,
    /// The node moved from SUSPECTED to UP.
    Recovered(Transition),
    /// The node's status changed since the sample was requested; nothing
    /// was written.
    Stale,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_event_lines() {
        let suspected = Transition::Suspected {
            node: "fog-node-1".into(),
            at: Instant::now(),
        };
        assert_eq!(
            suspected.event_line(),
            "[HEALTH CHECK] Node 'fog-node-1' is now SUSPECTED."
        );

        let recovered = Transition::Recovered {
            node: "fog-node-2".into(),
        };
        assert_eq!(
            recovered.event_line(),
            "[HEALTH CHECK] Node 'fog-node-2' has recovered and is now UP."
        );
    }

    #[test]
    fn status_labels() {
        assert_eq!(NodeStatus::Up.label(), "UP");
        let s = NodeStatus::Suspected { since: Instant::now() };
        assert_eq!(s.to_string(), "SUSPECTED");
        assert!(!s.is_up());
    }

    #[test]
    fn up_record_is_always_due() {
        let record = NodeRecord::new("a");
        assert!(record.due_for_check(Instant::now(), Duration::from_secs(30)));
    }

    #[test]
    fn suspected_record_due_only_after_timeout() {
        let t0 = Instant::now();
        let mut record = NodeRecord::new("a");
        record.status = NodeStatus::Suspected { since: t0 };
        let timeout = Duration::from_secs(30);

        assert!(!record.due_for_check(t0, timeout));
        assert!(!record.due_for_check(t0 + timeout, timeout));
        assert!(record.due_for_check(t0 + timeout + Duration::from_millis(1), timeout));
    }

    #[test]
    fn snapshot_filters_up_nodes() {
        let mut b = NodeRecord::new("b");
        b.status = NodeStatus::Suspected { since: Instant::now() };
        let snapshot = Snapshot {
            records: vec![NodeRecord::new("a"), b],
            telemetry_available: true,
        };

        let up: Vec<_> = snapshot.up_nodes().map(|r| r.id.as_str()).collect();
        assert_eq!(up, vec!["a"]);
        assert!(snapshot.get("b").is_some());
        assert!(snapshot.get("c").is_none());
    }
}
