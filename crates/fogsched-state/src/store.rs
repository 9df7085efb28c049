//! StatusStore — the fixed, in-memory node status table.
//!
//! All mutations take the table's write lock for the duration of a single
//! record update, which serialises every write to a given node. Readers
//! clone the whole table under the read lock, so a [`Snapshot`] is a true
//! point-in-time view.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

use tracing::debug;

use crate::error::{StateError, StateResult};
use crate::types::*;

struct Inner {
    /// Node id → slot in `records`. Built once at construction.
    index: HashMap<NodeId, usize>,
    records: RwLock<Vec<NodeRecord>>,
    telemetry_available: AtomicBool,
}

/// Thread-safe status table shared by the health monitor, the failure
/// reporter and the placement engine.
#[derive(Clone)]
pub struct StatusStore {
    inner: Arc<Inner>,
}

impl StatusStore {
    /// Create a store for a fixed set of node ids. Every node starts UP with
    /// zeroed resources, as if it had never been sampled.
    pub fn new<I, S>(ids: I) -> StateResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<NodeId>,
    {
        let mut index = HashMap::new();
        let mut records = Vec::new();

        for id in ids {
            let id: NodeId = id.into();
            if index.insert(id.clone(), records.len()).is_some() {
                return Err(StateError::DuplicateNode(id));
            }
            records.push(NodeRecord::new(id));
        }

        if records.is_empty() {
            return Err(StateError::EmptyPool);
        }

        debug!(nodes = records.len(), "status store initialised");

        Ok(Self {
            inner: Arc::new(Inner {
                index,
                records: RwLock::new(records),
                telemetry_available: AtomicBool::new(true),
            }),
        })
    }

    /// Node ids in configured order.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.read_records().iter().map(|r| r.id.clone()).collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner.index.contains_key(id)
    }

    /// Point-in-time copy of every record.
    pub fn snapshot(&self) -> Snapshot {
        let records = self.read_records().clone();
        Snapshot {
            records,
            telemetry_available: self.telemetry_available(),
        }
    }

    /// Copy of a single record.
    pub fn get(&self, id: &str) -> StateResult<NodeRecord> {
        let slot = self.slot(id)?;
        Ok(self.read_records()[slot].clone())
    }

    // ── Mutations ──────────────────────────────────────────────────

    /// Set the node UP and record a fresh resource sample.
    pub fn mark_up(&self, id: &str, sample: ResourceSample) -> StateResult<MarkUp> {
        let slot = self.slot(id)?;
        let mut records = self.write_records();
        Ok(apply_sample(&mut records[slot], sample))
    }

    /// Like [`mark_up`](Self::mark_up), but only if the node's status is
    /// still `expected`. Used when the sample was requested against an older
    /// snapshot: a failure reported while the fetch was in flight wins.
    pub fn mark_up_if(
        &self,
        id: &str,
        sample: ResourceSample,
        expected: NodeStatus,
    ) -> StateResult<MarkUp> {
        let slot = self.slot(id)?;
        let mut records = self.write_records();
        let record = &mut records[slot];
        if record.status != expected {
            debug!(node = %id, current = %record.status, "discarding stale sample");
            return Ok(MarkUp::Stale);
        }
        Ok(apply_sample(record, sample))
    }

    /// Mark the node SUSPECTED as of now.
    pub fn mark_suspected(&self, id: &str) -> StateResult<Option<Transition>> {
        self.mark_suspected_at(id, Instant::now())
    }

    /// Mark the node SUSPECTED with failure time `at`.
    ///
    /// A no-op for a node that is already SUSPECTED: the original failure
    /// time is kept. Returns the transition when one happened.
    pub fn mark_suspected_at(&self, id: &str, at: Instant) -> StateResult<Option<Transition>> {
        let slot = self.slot(id)?;
        let mut records = self.write_records();
        let record = &mut records[slot];
        match record.status {
            NodeStatus::Suspected { .. } => Ok(None),
            NodeStatus::Up => {
                record.status = NodeStatus::Suspected { since: at };
                Ok(Some(Transition::Suspected {
                    node: record.id.clone(),
                    at,
                }))
            }
        }
    }

    /// Bump the node's connection counter and return the new value.
    pub fn increment_connections(&self, id: &str) -> StateResult<u64> {
        let slot = self.slot(id)?;
        let mut records = self.write_records();
        let record = &mut records[slot];
        record.connections += 1;
        Ok(record.connections)
    }

    // ── Telemetry availability ─────────────────────────────────────

    pub fn telemetry_available(&self) -> bool {
        self.inner.telemetry_available.load(Ordering::Acquire)
    }

    /// Record whether the telemetry collaborator is reachable. Returns the
    /// previous value.
    pub fn set_telemetry_available(&self, available: bool) -> bool {
        self.inner
            .telemetry_available
            .swap(available, Ordering::AcqRel)
    }

    // ── Internals ──────────────────────────────────────────────────

    fn slot(&self, id: &str) -> StateResult<usize> {
        self.inner
            .index
            .get(id)
            .copied()
            .ok_or_else(|| StateError::UnknownNode(id.to_string()))
    }

    // Records are plain data and every write leaves them consistent, so a
    // poisoned lock is safe to keep using.
    fn read_records(&self) -> RwLockReadGuard<'_, Vec<NodeRecord>> {
        self.inner.records.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_records(&self) -> RwLockWriteGuard<'_, Vec<NodeRecord>> {
        self.inner
            .records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn apply_sample(record: &mut NodeRecord, sample: ResourceSample) -> MarkUp {
    let was_up = record.is_up();
    record.status = NodeStatus::Up;
    record.cpu_percent = sample.cpu_percent.max(0.0);
    record.memory_mb = sample.memory_mb.max(0.0);
    record.sampled_at = Some(Instant::now());

    if was_up {
        MarkUp::Refreshed
    } else {
        MarkUp::Recovered(Transition::Recovered {
            node: record.id.clone(),
        })
    }
}
