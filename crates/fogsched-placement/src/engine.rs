//! Placement engine.
//!
//! `select()` is a function of the strategy and the snapshot it is given,
//! with one exception: least-connections bumps the chosen node's counter in
//! the store as part of the decision.

use rand::seq::IndexedRandom;
use thiserror::Error;
use tracing::debug;

use fogsched_state::{NodeId, NodeRecord, Snapshot, StateError, StatusStore};

use crate::strategy::Strategy;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlacementError {
    #[error("No active fog nodes available")]
    NoAvailableNode,

    #[error("unknown placement strategy: {0}")]
    UnknownStrategy(String),

    #[error("state store error: {0}")]
    State(#[from] StateError),
}

/// Outcome of a successful selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub node: NodeId,
    /// Strategy the caller asked for.
    pub requested: Strategy,
    /// Strategy that actually made the choice.
    pub applied: Strategy,
}

impl Placement {
    pub fn fell_back(&self) -> bool {
        self.requested != self.applied
    }
}

pub struct PlacementEngine {
    store: StatusStore,
}

impl PlacementEngine {
    pub fn new(store: StatusStore) -> Self {
        Self { store }
    }

    /// Pick a node from the UP entries of `snapshot`.
    pub fn select(
        &self,
        strategy: Strategy,
        snapshot: &Snapshot,
    ) -> Result<Placement, PlacementError> {
        let candidates: Vec<&NodeRecord> = snapshot.up_nodes().collect();
        if candidates.is_empty() {
            return Err(PlacementError::NoAvailableNode);
        }

        let applied = effective_strategy(strategy, snapshot, &candidates);
        let chosen = match applied {
            Strategy::LeastCpu => least_by(&candidates, |r| r.cpu_percent),
            Strategy::LeastMemory => least_by(&candidates, |r| r.memory_mb),
            Strategy::LeastConnections => candidates
                .iter()
                .copied()
                .min_by(|a, b| a.connections.cmp(&b.connections).then_with(|| a.id.cmp(&b.id))),
            Strategy::Random => candidates.choose(&mut rand::rng()).copied(),
        }
        .ok_or(PlacementError::NoAvailableNode)?;

        if applied == Strategy::LeastConnections {
            let count = self.store.increment_connections(&chosen.id)?;
            debug!(node = %chosen.id, connections = count, "connection counter bumped");
        }

        Ok(Placement {
            node: chosen.id.clone(),
            requested: strategy,
            applied,
        })
    }
}

/// Resolve which strategy can actually run against this snapshot.
fn effective_strategy(
    requested: Strategy,
    snapshot: &Snapshot,
    candidates: &[&NodeRecord],
) -> Strategy {
    if !requested.requires_telemetry() {
        return requested;
    }
    if !snapshot.telemetry_available {
        debug!(requested = %requested, "telemetry unavailable, falling back");
        return Strategy::FALLBACK;
    }
    if !candidates.iter().any(|r| r.has_sample()) {
        debug!(requested = %requested, "no sampled candidates, falling back");
        return Strategy::FALLBACK;
    }
    requested
}

/// Minimum by `key`, ties broken by node id so the result is reproducible.
fn least_by<'a>(
    candidates: &[&'a NodeRecord],
    key: impl Fn(&NodeRecord) -> f64,
) -> Option<&'a NodeRecord> {
    candidates
        .iter()
        .copied()
        .min_by(|a, b| key(a).total_cmp(&key(b)).then_with(|| a.id.cmp(&b.id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fogsched_state::ResourceSample;

    fn sample(cpu: f64, mem: f64) -> ResourceSample {
        ResourceSample {
            cpu_percent: cpu,
            memory_mb: mem,
        }
    }

    fn store_with(usage: &[(&str, f64, f64)]) -> StatusStore {
        let store = StatusStore::new(usage.iter().map(|(id, _, _)| *id)).unwrap();
        for (id, cpu, mem) in usage {
            store.mark_up(id, sample(*cpu, *mem)).unwrap();
        }
        store
    }

    #[test]
    fn least_cpu_picks_global_minimum() {
        let store = store_with(&[("a", 40.0, 1.0), ("b", 5.0, 900.0), ("c", 12.0, 2.0)]);
        let engine = PlacementEngine::new(store.clone());

        let placement = engine.select(Strategy::LeastCpu, &store.snapshot()).unwrap();
        assert_eq!(placement.node, "b");
        assert!(!placement.fell_back());
    }

    #[test]
    fn least_cpu_tie_is_deterministic() {
        let store = store_with(&[("fog-node-2", 7.0, 1.0), ("fog-node-1", 7.0, 1.0)]);
        let engine = PlacementEngine::new(store.clone());
        let snapshot = store.snapshot();

        let first = engine.select(Strategy::LeastCpu, &snapshot).unwrap();
        let second = engine.select(Strategy::LeastCpu, &snapshot).unwrap();
        assert_eq!(first.node, "fog-node-1");
        assert_eq!(first, second);
    }

    #[test]
    fn least_memory_picks_minimum() {
        let store = store_with(&[("a", 1.0, 512.0), ("b", 90.0, 64.0)]);
        let engine = PlacementEngine::new(store.clone());

        let placement = engine.select(Strategy::LeastMemory, &store.snapshot()).unwrap();
        assert_eq!(placement.node, "b");
    }

    #[test]
    fn suspected_nodes_are_never_chosen() {
        let store = store_with(&[("a", 1.0, 1.0), ("b", 50.0, 50.0)]);
        store.mark_suspected("a").unwrap();
        let engine = PlacementEngine::new(store.clone());

        for strategy in Strategy::ALL {
            let placement = engine.select(strategy, &store.snapshot()).unwrap();
            assert_eq!(placement.node, "b", "{strategy}");
        }
    }

    #[test]
    fn all_suspected_is_no_available_node() {
        let store = store_with(&[("a", 1.0, 1.0), ("b", 2.0, 2.0)]);
        store.mark_suspected("a").unwrap();
        store.mark_suspected("b").unwrap();
        let engine = PlacementEngine::new(store.clone());

        for strategy in Strategy::ALL {
            assert_eq!(
                engine.select(strategy, &store.snapshot()),
                Err(PlacementError::NoAvailableNode)
            );
        }
    }

    #[test]
    fn least_connections_counts_its_choices() {
        let store = StatusStore::new(["a", "b"]).unwrap();
        store.mark_suspected("b").unwrap();
        let engine = PlacementEngine::new(store.clone());

        for _ in 0..5 {
            let placement = engine
                .select(Strategy::LeastConnections, &store.snapshot())
                .unwrap();
            assert_eq!(placement.node, "a");
        }
        assert_eq!(store.get("a").unwrap().connections, 5);
        assert_eq!(store.get("b").unwrap().connections, 0);

        // b is back and has strictly fewer connections.
        store.mark_up("b", sample(0.0, 0.0)).unwrap();
        let placement = engine
            .select(Strategy::LeastConnections, &store.snapshot())
            .unwrap();
        assert_eq!(placement.node, "b");
        assert_eq!(store.get("b").unwrap().connections, 1);
    }

    #[test]
    fn least_connections_alternates_on_ties() {
        let store = StatusStore::new(["a", "b"]).unwrap();
        let engine = PlacementEngine::new(store.clone());

        let picks: Vec<NodeId> = (0..4)
            .map(|_| {
                engine
                    .select(Strategy::LeastConnections, &store.snapshot())
                    .unwrap()
                    .node
            })
            .collect();
        assert_eq!(picks, ["a", "b", "a", "b"]);
    }

    #[test]
    fn resource_strategies_do_not_touch_counters() {
        let store = store_with(&[("a", 1.0, 1.0)]);
        let engine = PlacementEngine::new(store.clone());

        engine.select(Strategy::LeastCpu, &store.snapshot()).unwrap();
        engine.select(Strategy::Random, &store.snapshot()).unwrap();
        assert_eq!(store.get("a").unwrap().connections, 0);
    }

    #[test]
    fn telemetry_unavailable_falls_back() {
        let store = store_with(&[("a", 1.0, 1.0), ("b", 90.0, 90.0)]);
        store.increment_connections("a").unwrap();
        store.set_telemetry_available(false);
        let engine = PlacementEngine::new(store.clone());

        let placement = engine.select(Strategy::LeastCpu, &store.snapshot()).unwrap();
        assert_eq!(placement.node, "b");
        assert_eq!(placement.applied, Strategy::LeastConnections);
        assert!(placement.fell_back());
    }

    #[test]
    fn unsampled_pool_falls_back() {
        let store = StatusStore::new(["a", "b"]).unwrap();
        let engine = PlacementEngine::new(store.clone());

        let placement = engine.select(Strategy::LeastMemory, &store.snapshot()).unwrap();
        assert_eq!(placement.applied, Strategy::LeastConnections);
        assert_eq!(store.get(&placement.node).unwrap().connections, 1);
    }

    #[test]
    fn random_stays_within_up_nodes() {
        let store = StatusStore::new(["a", "b", "c"]).unwrap();
        store.mark_suspected("c").unwrap();
        let engine = PlacementEngine::new(store.clone());
        let snapshot = store.snapshot();

        let mut seen = std::collections::BTreeSet::new();
        for _ in 0..200 {
            seen.insert(engine.select(Strategy::Random, &snapshot).unwrap().node);
        }
        assert!(!seen.contains("c"));
        assert_eq!(seen.len(), 2);
    }
}
