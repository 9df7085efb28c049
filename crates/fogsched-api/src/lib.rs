//! fogsched-api — HTTP surface of the fog placement scheduler.
//!
//! # Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/get_fog_node` | Place one unit of work (`?strategy=` overrides) |
//! | POST | `/report_failure` | Report an unreachable node (`{"node": "<id>"}`) |
//! | GET | `/nodes` | Current node status table |
//! | GET | `/metrics` | Prometheus exposition |

pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use fogsched_scheduler::{FailureReporter, Scheduler};

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub scheduler: Arc<Scheduler>,
    pub reporter: FailureReporter,
}

impl ApiState {
    pub fn new(scheduler: Arc<Scheduler>) -> Self {
        let reporter = scheduler.reporter();
        Self {
            scheduler,
            reporter,
        }
    }
}

/// Build the complete API router.
pub fn build_router(scheduler: Arc<Scheduler>) -> Router {
    Router::new()
        .route("/get_fog_node", get(handlers::get_fog_node))
        .route("/report_failure", post(handlers::report_failure))
        .route("/nodes", get(handlers::list_nodes))
        .route("/metrics", get(handlers::prometheus_metrics))
        .with_state(ApiState::new(scheduler))
}
