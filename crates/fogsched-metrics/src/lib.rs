//! fogsched-metrics — observability for the fog placement scheduler.
//!
//! Emits the records the offline analysis pipeline consumes and renders
//! node status for Prometheus scraping.
//!
//! # Architecture
//!
//! ```text
//! TelemetryEmitter
//!   ├── emit() ← called after every placement decision
//!   │     └── STATUS_UPDATE::{...} line (target `fogsched::status`)
//!   ├── transition() ← called when a node changes state
//!   │     └── [HEALTH CHECK] line (target `fogsched::health`)
//!   └── counters() → EmitterCounters
//!
//! Prometheus exposition
//!   └── render_prometheus() → text/plain for /metrics endpoint
//! ```

pub mod emitter;
pub mod prometheus;

pub use emitter::{
    EmitterCounters, HEALTH_TARGET, NodeEntry, STATUS_TARGET, STATUS_UPDATE_PREFIX,
    StatusUpdate, TelemetryEmitter,
};
pub use prometheus::render_prometheus;
