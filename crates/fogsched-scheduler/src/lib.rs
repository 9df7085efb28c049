//! fogsched-scheduler — the placement request path.
//!
//! Every placement request runs the same pipeline:
//!
//! ```text
//! HealthMonitor::refresh_all()      poll telemetry, apply UP/SUSPECTED transitions
//!   → StatusStore::snapshot()       one consistent view for the whole decision
//!   → PlacementEngine::select()     strategy + fallback
//!   → TelemetryEmitter::emit()      STATUS_UPDATE:: record
//! ```
//!
//! [`FailureReporter`] demotes nodes out of band, independent of this flow.

pub mod error;
pub mod reporter;
pub mod scheduler;

pub use error::{SchedulerError, SchedulerResult};
pub use reporter::{FailureReporter, ReportOutcome};
pub use scheduler::Scheduler;
