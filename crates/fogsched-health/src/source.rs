//! The telemetry collaborator interface.

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

/// Raw resource counters for one node, as reported by the telemetry source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeStats {
    /// Container CPU time consumed between the two samples.
    pub cpu_usage_delta: i64,
    /// Host CPU time elapsed between the two samples.
    pub system_cpu_delta: i64,
    pub online_cores: u32,
    /// Resident memory usage.
    pub memory_bytes: u64,
}

/// Why a stats fetch failed. Every variant demotes the node; they are kept
/// apart so logs can tell a removed container from an unreachable daemon.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TelemetryError {
    #[error("node not found: {0}")]
    NotFound(String),

    #[error("telemetry transport error: {0}")]
    Transport(String),

    #[error("malformed telemetry: {0}")]
    Malformed(String),
}

impl TelemetryError {
    /// Stable label for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            TelemetryError::NotFound(_) => "not_found",
            TelemetryError::Transport(_) => "transport",
            TelemetryError::Malformed(_) => "malformed",
        }
    }
}

/// Boxed future returned by [`TelemetrySource`] methods.
pub type TelemetryFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, TelemetryError>> + Send + 'a>>;

/// Source of per-node resource stats. Injected so the monitor can be
/// driven by Docker in production and by an in-memory table in tests.
pub trait TelemetrySource: Send + Sync {
    /// Check that the source itself is reachable.
    fn probe(&self) -> TelemetryFuture<'_, ()>;

    /// Fetch one stats reading for `node`.
    fn fetch_stats<'a>(&'a self, node: &'a str) -> TelemetryFuture<'a, NodeStats>;
}
