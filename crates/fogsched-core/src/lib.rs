//! fogsched-core — shared configuration for the fog placement scheduler.
//!
//! The scheduler is configured once at startup from a `fogsched.toml`
//! file (every section optional) and CLI overrides. Nothing in here is
//! mutated after the daemon has started: the node pool, the recovery
//! timeout and the default placement strategy are fixed for the process
//! lifetime.

pub mod config;

pub use config::{
    ConfigError, FogschedConfig, SchedulerSection, ServerSection, TelemetrySection,
    parse_duration,
};
