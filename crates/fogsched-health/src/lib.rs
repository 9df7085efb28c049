//! fogsched-health — telemetry polling and failure detection for fog nodes.
//!
//! The health monitor is pull-based: it runs inside each placement
//! request rather than as a background loop. Every refresh fetches
//! resource stats for the nodes that are due and feeds the result into
//! the per-node state machine held by the `StatusStore`.
//!
//! # Architecture
//!
//! ```text
//! HealthMonitor
//!   ├── probe() → telemetry availability flag in StatusStore
//!   └── refresh_all()
//!       ├── skip SUSPECTED nodes still inside the recovery timeout
//!       ├── fetch_stats() per due node, in parallel, each bounded by a timeout
//!       ├── success → ResourceSample → mark_up_if()
//!       └── failure → mark_suspected_at() → SUSPECTED
//! ```
//!
//! # State machine
//!
//! `UP → SUSPECTED` on any fetch failure (not found, transport, malformed).
//! `SUSPECTED → UP` only on a successful fetch made strictly after the
//! recovery timeout. There is no terminal state.

pub mod docker;
pub mod memory;
pub mod monitor;
pub mod sample;
pub mod source;

pub use docker::{DockerEndpoint, DockerTelemetry};
pub use memory::InMemoryTelemetry;
pub use monitor::{HealthMonitor, HealthSettings, RefreshReport};
pub use sample::{compute_sample, cpu_percent, memory_mb};
pub use source::{NodeStats, TelemetryError, TelemetryFuture, TelemetrySource};
