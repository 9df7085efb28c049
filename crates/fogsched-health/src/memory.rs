//! In-memory telemetry source.
//!
//! A scriptable stand-in for the Docker daemon: stats and errors are set
//! per node, fetches are counted, and an optional delay simulates a slow
//! backend. Used by tests across the workspace and for local dry runs.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::source::{NodeStats, TelemetryError, TelemetryFuture, TelemetrySource};

struct Inner {
    available: bool,
    responses: HashMap<String, Result<NodeStats, TelemetryError>>,
    fetches: HashMap<String, usize>,
    delay: Option<Duration>,
}

pub struct InMemoryTelemetry {
    inner: Mutex<Inner>,
}

impl InMemoryTelemetry {
    /// An available source with no nodes configured; every fetch fails with
    /// `NotFound` until stats are set.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                available: true,
                responses: HashMap::new(),
                fetches: HashMap::new(),
                delay: None,
            }),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.lock().available = available;
    }

    pub fn set_stats(&self, node: &str, stats: NodeStats) {
        self.lock().responses.insert(node.to_string(), Ok(stats));
    }

    /// Configure stats that yield exactly `cpu_percent` and `memory_mb`
    /// after sample computation (to two decimals).
    pub fn set_usage(&self, node: &str, cpu_percent: f64, memory_mb: f64) {
        let stats = NodeStats {
            cpu_usage_delta: (cpu_percent * 1_000_000.0).round() as i64,
            system_cpu_delta: 100_000_000,
            online_cores: 1,
            memory_bytes: (memory_mb * 1024.0 * 1024.0).round() as u64,
        };
        self.set_stats(node, stats);
    }

    pub fn set_error(&self, node: &str, error: TelemetryError) {
        self.lock().responses.insert(node.to_string(), Err(error));
    }

    /// Forget the node so fetches report `NotFound`.
    pub fn remove(&self, node: &str) {
        self.lock().responses.remove(node);
    }

    /// Delay every probe and fetch by `delay`.
    pub fn set_delay(&self, delay: Option<Duration>) {
        self.lock().delay = delay;
    }

    /// Number of stats fetches issued for `node`.
    pub fn fetch_count(&self, node: &str) -> usize {
        self.lock().fetches.get(node).copied().unwrap_or(0)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for InMemoryTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetrySource for InMemoryTelemetry {
    fn probe(&self) -> TelemetryFuture<'_, ()> {
        Box::pin(async move {
            let delay = self.lock().delay;
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            if self.lock().available {
                Ok(())
            } else {
                Err(TelemetryError::Transport("telemetry source offline".into()))
            }
        })
    }

    fn fetch_stats<'a>(&'a self, node: &'a str) -> TelemetryFuture<'a, NodeStats> {
        Box::pin(async move {
            let delay = {
                let mut inner = self.lock();
                *inner.fetches.entry(node.to_string()).or_insert(0) += 1;
                inner.delay
            };
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            let inner = self.lock();
            if !inner.available {
                return Err(TelemetryError::Transport("telemetry source offline".into()));
            }
            inner
                .responses
                .get(node)
                .cloned()
                .unwrap_or_else(|| Err(TelemetryError::NotFound(node.to_string())))
        })
    }
}
