//! fogsched-placement — picks the fog node that receives a unit of work.
//!
//! The engine only ever looks at one [`Snapshot`](fogsched_state::Snapshot)
//! per decision. Candidates are restricted to UP nodes; the requested
//! [`Strategy`] then picks among them. Telemetry-driven strategies fall back
//! to least-connections when there is no telemetry to rank by.
//!
//! # Components
//!
//! - **`strategy`** — Strategy enum and name parsing
//! - **`engine`** — Candidate filtering, ranking and fallback

pub mod engine;
pub mod strategy;

pub use engine::{Placement, PlacementEngine, PlacementError};
pub use strategy::Strategy;
