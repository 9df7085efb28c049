//! fogsched-state — authoritative in-memory status of the fog node pool.
//!
//! # Architecture
//!
//! ```text
//! StatusStore (Clone, Arc-backed)
//!   ├── id → slot index (built once, never mutated)
//!   ├── RwLock<Vec<NodeRecord>> (one record per configured node)
//!   └── telemetry availability flag
//! ```
//!
//! The node set is fixed at construction. Every update is an in-place
//! mutation of an existing record under the table lock, so a concurrent
//! health refresh and failure report on the same node never interleave.
//! Readers take a [`Snapshot`], a point-in-time copy that does not change
//! while a placement decision is being made.

pub mod error;
pub mod store;
pub mod types;

pub use error::{StateError, StateResult};
pub use store::StatusStore;
pub use types::*;
