//! Scheduler — wires the monitor, engine and emitter into one request path.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use fogsched_health::{HealthMonitor, HealthSettings, TelemetrySource};
use fogsched_metrics::TelemetryEmitter;
use fogsched_placement::{Placement, PlacementEngine, PlacementError, Strategy};
use fogsched_state::StatusStore;

use crate::error::SchedulerResult;
use crate::reporter::FailureReporter;

/// Placement scheduler for a fixed pool of fog nodes.
///
/// Cheap to share behind an `Arc`; all mutable state lives in the
/// [`StatusStore`] and the emitter counters.
pub struct Scheduler {
    store: StatusStore,
    monitor: HealthMonitor,
    engine: PlacementEngine,
    emitter: Arc<TelemetryEmitter>,
    strategy: Strategy,
}

impl Scheduler {
    pub fn new(
        store: StatusStore,
        source: Arc<dyn TelemetrySource>,
        settings: HealthSettings,
        strategy: Strategy,
    ) -> Self {
        let emitter = Arc::new(TelemetryEmitter::new());
        let monitor = HealthMonitor::new(store.clone(), source, emitter.clone(), settings);
        let engine = PlacementEngine::new(store.clone());
        Self {
            store,
            monitor,
            engine,
            emitter,
            strategy,
        }
    }

    pub fn store(&self) -> &StatusStore {
        &self.store
    }

    pub fn emitter(&self) -> &Arc<TelemetryEmitter> {
        &self.emitter
    }

    /// Configured default strategy.
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// A reporter sharing this scheduler's store and emitter.
    pub fn reporter(&self) -> FailureReporter {
        FailureReporter::new(self.store.clone(), self.emitter.clone())
    }

    /// Probe the telemetry source once at startup.
    pub async fn start(&self) -> bool {
        let available = self.monitor.probe().await;
        info!(
            nodes = self.store.node_ids().len(),
            strategy = %self.strategy,
            telemetry_available = available,
            "scheduler started"
        );
        available
    }

    /// Place one unit of work, optionally overriding the configured strategy.
    pub async fn place(&self, strategy: Option<Strategy>) -> SchedulerResult<Placement> {
        self.place_at(Instant::now(), strategy).await
    }

    /// [`place`](Self::place) with an explicit clock reading for the refresh.
    pub async fn place_at(
        &self,
        now: Instant,
        strategy: Option<Strategy>,
    ) -> SchedulerResult<Placement> {
        self.monitor.refresh_all_at(now).await;

        let snapshot = self.store.snapshot();
        let requested = strategy.unwrap_or(self.strategy);
        match self.engine.select(requested, &snapshot) {
            Ok(placement) => {
                if placement.fell_back() {
                    debug!(
                        requested = %placement.requested,
                        applied = %placement.applied,
                        "placement used fallback strategy"
                    );
                }
                self.emitter.emit(&snapshot, Some(&placement.node));
                Ok(placement)
            }
            Err(PlacementError::NoAvailableNode) => {
                self.emitter.emit(&snapshot, None);
                warn!(strategy = %requested, "no active fog nodes available");
                Err(PlacementError::NoAvailableNode.into())
            }
            Err(e) => Err(e.into()),
        }
    }
}
