//! Health monitor — refreshes the status store from the telemetry source.
//!
//! `refresh_all()` is called synchronously inside every placement request.
//! Nodes are fetched in parallel and each fetch is bounded by
//! `fetch_timeout`, so one stuck node adds at most that much latency. A
//! failure on one node never aborts the refresh for the others.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use fogsched_metrics::TelemetryEmitter;
use fogsched_state::{MarkUp, NodeId, NodeStatus, StatusStore};

use crate::sample::compute_sample;
use crate::source::{NodeStats, TelemetryError, TelemetrySource};

/// Timing knobs for the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthSettings {
    /// Minimum quiet period before a SUSPECTED node is fetched again.
    pub recovery_timeout: Duration,
    /// Upper bound on a single probe or stats fetch.
    pub fetch_timeout: Duration,
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self {
            recovery_timeout: Duration::from_secs(30),
            fetch_timeout: Duration::from_secs(2),
        }
    }
}

/// What one refresh cycle did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub telemetry_available: bool,
    /// Successful fetches applied to the store (including recoveries).
    pub sampled: usize,
    /// Nodes that moved SUSPECTED → UP.
    pub recovered: usize,
    /// Fetches that failed.
    pub failed: usize,
    /// Nodes not fetched (inside the recovery window, or telemetry down).
    pub skipped: usize,
    /// Successful fetches discarded because the node changed state meanwhile.
    pub stale: usize,
}

type FetchOutcome = (NodeId, NodeStatus, Result<NodeStats, TelemetryError>);

pub struct HealthMonitor {
    store: StatusStore,
    source: Arc<dyn TelemetrySource>,
    emitter: Arc<TelemetryEmitter>,
    settings: HealthSettings,
}

impl HealthMonitor {
    pub fn new(
        store: StatusStore,
        source: Arc<dyn TelemetrySource>,
        emitter: Arc<TelemetryEmitter>,
        settings: HealthSettings,
    ) -> Self {
        Self {
            store,
            source,
            emitter,
            settings,
        }
    }

    /// Check whether the telemetry source is reachable and record the
    /// answer in the store.
    pub async fn probe(&self) -> bool {
        let fetch_timeout = self.settings.fetch_timeout;
        let result = match tokio::time::timeout(fetch_timeout, self.source.probe()).await {
            Ok(result) => result,
            Err(_) => Err(TelemetryError::Transport(format!(
                "probe timed out after {fetch_timeout:?}"
            ))),
        };

        let available = result.is_ok();
        let was_available = self.store.set_telemetry_available(available);
        match result {
            Ok(()) if !was_available => info!("telemetry source reachable"),
            Err(e) if was_available => warn!(
                kind = e.kind(),
                error = %e,
                "telemetry source unavailable, falling back to least-connections placement"
            ),
            _ => {}
        }
        available
    }

    /// Refresh every due node as of now.
    pub async fn refresh_all(&self) -> RefreshReport {
        self.refresh_all_at(Instant::now()).await
    }

    /// Refresh every due node, using `now` as the clock reading for the
    /// recovery-window check and for any failure recorded in this cycle.
    pub async fn refresh_all_at(&self, now: Instant) -> RefreshReport {
        let snapshot = self.store.snapshot();
        let mut report = RefreshReport::default();

        if !snapshot.telemetry_available && !self.probe().await {
            debug!("telemetry unavailable, skipping refresh");
            report.skipped = snapshot.len();
            return report;
        }
        report.telemetry_available = true;

        let mut fetches: JoinSet<FetchOutcome> = JoinSet::new();
        for record in snapshot.iter() {
            if !record.due_for_check(now, self.settings.recovery_timeout) {
                debug!(node = %record.id, "node inside recovery window, not fetching");
                report.skipped += 1;
                continue;
            }

            let source = Arc::clone(&self.source);
            let id = record.id.clone();
            let observed = record.status;
            let fetch_timeout = self.settings.fetch_timeout;
            fetches.spawn(async move {
                let fetch = tokio::time::timeout(fetch_timeout, source.fetch_stats(&id));
                let result = match fetch.await {
                    Ok(result) => result,
                    Err(_) => Err(TelemetryError::Transport(format!(
                        "fetch timed out after {fetch_timeout:?}"
                    ))),
                };
                (id, observed, result)
            });
        }

        while let Some(joined) = fetches.join_next().await {
            match joined {
                Ok((id, observed, result)) => self.apply(&id, observed, result, now, &mut report),
                Err(e) => {
                    report.failed += 1;
                    error!(error = %e, "telemetry fetch task failed");
                }
            }
        }

        debug!(
            sampled = report.sampled,
            recovered = report.recovered,
            failed = report.failed,
            skipped = report.skipped,
            stale = report.stale,
            "health refresh complete"
        );
        report
    }

    fn apply(
        &self,
        id: &str,
        observed: NodeStatus,
        result: Result<NodeStats, TelemetryError>,
        now: Instant,
        report: &mut RefreshReport,
    ) {
        match result {
            Ok(stats) => {
                let sample = compute_sample(&stats);
                match self.store.mark_up_if(id, sample, observed) {
                    Ok(MarkUp::Refreshed) => {
                        report.sampled += 1;
                        debug!(
                            node = %id,
                            cpu = sample.cpu_percent,
                            memory = sample.memory_mb,
                            "node sampled"
                        );
                    }
                    Ok(MarkUp::Recovered(transition)) => {
                        report.sampled += 1;
                        report.recovered += 1;
                        self.emitter.transition(&transition);
                    }
                    Ok(MarkUp::Stale) => report.stale += 1,
                    Err(e) => error!(node = %id, error = %e, "failed to record sample"),
                }
            }
            Err(err) => {
                report.failed += 1;
                match &err {
                    TelemetryError::NotFound(_) => {
                        warn!(node = %id, kind = err.kind(), "node not found by telemetry source")
                    }
                    TelemetryError::Transport(_) => warn!(
                        node = %id,
                        kind = err.kind(),
                        error = %err,
                        "telemetry transport error"
                    ),
                    TelemetryError::Malformed(_) => {
                        warn!(node = %id, kind = err.kind(), error = %err, "malformed telemetry")
                    }
                }
                // A failed recovery attempt keeps the first failure time, so
                // the node stays due and is retried on the next refresh.
                match self.store.mark_suspected_at(id, now) {
                    Ok(Some(transition)) => self.emitter.transition(&transition),
                    Ok(None) => debug!(node = %id, "recovery attempt failed"),
                    Err(e) => error!(node = %id, error = %e, "failed to record failure"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryTelemetry;

    const RECOVERY: Duration = Duration::from_secs(30);

    struct Fixture {
        store: StatusStore,
        telemetry: Arc<InMemoryTelemetry>,
        emitter: Arc<TelemetryEmitter>,
        monitor: HealthMonitor,
    }

    fn fixture() -> Fixture {
        let store = StatusStore::new(["fog-node-1", "fog-node-2"]).unwrap();
        let telemetry = Arc::new(InMemoryTelemetry::new());
        telemetry.set_usage("fog-node-1", 10.0, 100.0);
        telemetry.set_usage("fog-node-2", 5.0, 200.0);
        let emitter = Arc::new(TelemetryEmitter::new());
        let monitor = HealthMonitor::new(
            store.clone(),
            telemetry.clone(),
            emitter.clone(),
            HealthSettings {
                recovery_timeout: RECOVERY,
                fetch_timeout: Duration::from_millis(500),
            },
        );
        Fixture {
            store,
            telemetry,
            emitter,
            monitor,
        }
    }

    #[tokio::test]
    async fn successful_refresh_records_samples() {
        let f = fixture();
        let report = f.monitor.refresh_all().await;

        assert_eq!(report.sampled, 2);
        assert_eq!(report.failed, 0);
        let node = f.store.get("fog-node-2").unwrap();
        assert!(node.is_up());
        assert_eq!(node.cpu_percent, 5.0);
        assert_eq!(node.memory_mb, 200.0);
    }

    #[tokio::test]
    async fn fetch_failure_suspects_only_that_node() {
        let f = fixture();
        f.monitor.refresh_all().await;
        let before = f.store.get("fog-node-1").unwrap();

        f.telemetry.remove("fog-node-2");
        let t0 = Instant::now();
        let report = f.monitor.refresh_all_at(t0).await;

        assert_eq!(report.failed, 1);
        assert_eq!(
            f.store.get("fog-node-2").unwrap().status,
            NodeStatus::Suspected { since: t0 }
        );
        let after = f.store.get("fog-node-1").unwrap();
        assert!(after.is_up());
        assert_eq!(after.cpu_percent, before.cpu_percent);
        assert_eq!(f.emitter.counters().suspected, 1);
    }

    #[tokio::test]
    async fn every_error_kind_suspects() {
        for err in [
            TelemetryError::NotFound("fog-node-1".into()),
            TelemetryError::Transport("refused".into()),
            TelemetryError::Malformed("truncated".into()),
        ] {
            let f = fixture();
            f.telemetry.set_error("fog-node-1", err);
            f.monitor.refresh_all().await;
            assert!(!f.store.get("fog-node-1").unwrap().is_up());
            assert!(f.store.get("fog-node-2").unwrap().is_up());
        }
    }

    #[tokio::test]
    async fn suspected_node_is_not_fetched_inside_recovery_window() {
        let f = fixture();
        f.telemetry.remove("fog-node-1");
        let t0 = Instant::now();
        f.monitor.refresh_all_at(t0).await;
        assert_eq!(f.telemetry.fetch_count("fog-node-1"), 1);

        // Telemetry is healthy again, but the window has not elapsed.
        f.telemetry.set_usage("fog-node-1", 1.0, 1.0);
        for secs in [1, 10, 29, 30] {
            let report = f.monitor.refresh_all_at(t0 + Duration::from_secs(secs)).await;
            assert_eq!(report.skipped, 1);
            assert!(!f.store.get("fog-node-1").unwrap().is_up());
        }
        assert_eq!(f.telemetry.fetch_count("fog-node-1"), 1);
    }

    #[tokio::test]
    async fn suspected_node_recovers_after_window_on_success() {
        let f = fixture();
        f.telemetry.remove("fog-node-2");
        let t0 = Instant::now();
        f.monitor.refresh_all_at(t0).await;

        f.telemetry.set_usage("fog-node-2", 3.0, 50.0);
        let report = f
            .monitor
            .refresh_all_at(t0 + RECOVERY + Duration::from_secs(1))
            .await;

        assert_eq!(report.recovered, 1);
        let node = f.store.get("fog-node-2").unwrap();
        assert!(node.is_up());
        assert_eq!(node.cpu_percent, 3.0);
        assert_eq!(f.emitter.counters().recovered, 1);
    }

    #[tokio::test]
    async fn failed_recovery_attempt_keeps_first_failure_time() {
        let f = fixture();
        f.telemetry.remove("fog-node-1");
        let t0 = Instant::now();
        f.monitor.refresh_all_at(t0).await;

        let t1 = t0 + RECOVERY + Duration::from_secs(1);
        f.monitor.refresh_all_at(t1).await;
        assert_eq!(f.telemetry.fetch_count("fog-node-1"), 2);
        assert_eq!(
            f.store.get("fog-node-1").unwrap().status.last_failure(),
            Some(t0)
        );

        // Still past the window: the next refresh retries and recovers.
        f.telemetry.set_usage("fog-node-1", 4.0, 40.0);
        let report = f.monitor.refresh_all_at(t1 + Duration::from_secs(5)).await;
        assert_eq!(f.telemetry.fetch_count("fog-node-1"), 3);
        assert_eq!(report.recovered, 1);
        assert!(f.store.get("fog-node-1").unwrap().is_up());
        // Only one SUSPECTED transition was emitted.
        assert_eq!(f.emitter.counters().suspected, 1);
    }

    #[tokio::test]
    async fn slow_fetch_is_bounded_by_timeout() {
        let f = fixture();
        f.telemetry.set_delay(Some(Duration::from_secs(5)));

        let started = std::time::Instant::now();
        let report = f.monitor.refresh_all().await;

        assert!(started.elapsed() < Duration::from_secs(3));
        assert_eq!(report.failed, 2);
        assert!(!f.store.get("fog-node-1").unwrap().is_up());
    }

    #[tokio::test]
    async fn unavailable_telemetry_skips_fetching() {
        let f = fixture();
        f.telemetry.set_available(false);
        assert!(!f.monitor.probe().await);

        let report = f.monitor.refresh_all().await;
        assert!(!report.telemetry_available);
        assert_eq!(report.skipped, 2);
        assert_eq!(f.telemetry.fetch_count("fog-node-1"), 0);
        assert!(f.store.get("fog-node-1").unwrap().is_up());
        assert!(!f.store.telemetry_available());

        // The next refresh re-probes and resumes fetching.
        f.telemetry.set_available(true);
        let report = f.monitor.refresh_all().await;
        assert!(report.telemetry_available);
        assert_eq!(report.sampled, 2);
        assert!(f.store.telemetry_available());
    }

    #[tokio::test]
    async fn failure_report_during_fetch_wins_over_sample() {
        let f = fixture();
        f.telemetry.set_delay(Some(Duration::from_millis(100)));

        let store = f.store.clone();
        let (report, _) = tokio::join!(f.monitor.refresh_all(), async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            store.mark_suspected("fog-node-1").unwrap();
        });

        assert_eq!(report.stale, 1);
        assert!(!f.store.get("fog-node-1").unwrap().is_up());
        assert!(f.store.get("fog-node-2").unwrap().is_up());
    }
}
