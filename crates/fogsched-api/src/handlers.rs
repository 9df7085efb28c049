//! HTTP handlers.
//!
//! Response bodies for `/get_fog_node` and `/report_failure` are consumed
//! by the IoT clients as-is, so their shapes are fixed.

use std::collections::BTreeMap;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use tracing::debug;

use fogsched_metrics::render_prometheus;
use fogsched_placement::Strategy;
use fogsched_scheduler::SchedulerError;
use fogsched_state::NodeId;

use crate::ApiState;

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(msg: &str, status: StatusCode) -> impl IntoResponse {
    (
        status,
        Json(ErrorBody {
            error: msg.to_string(),
        }),
    )
}

// ── Placement ──────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct PlacementQuery {
    pub strategy: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PlacementResponse {
    pub fog_node_host: NodeId,
}

/// GET /get_fog_node
pub async fn get_fog_node(
    State(state): State<ApiState>,
    Query(query): Query<PlacementQuery>,
) -> impl IntoResponse {
    let strategy = query.strategy.as_deref().map(Strategy::parse_or_fallback);

    match state.scheduler.place(strategy).await {
        Ok(placement) => Json(PlacementResponse {
            fog_node_host: placement.node,
        })
        .into_response(),
        Err(e @ SchedulerError::NoAvailableNode) => {
            error_response(&e.to_string(), StatusCode::SERVICE_UNAVAILABLE).into_response()
        }
        Err(e) => error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response(),
    }
}

// ── Failure reports ────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct FailureReport {
    #[serde(default)]
    pub node: Option<String>,
}

/// POST /report_failure
///
/// Always acknowledged. A body that is not JSON or has no `node` is
/// accepted and ignored.
pub async fn report_failure(State(state): State<ApiState>, body: Bytes) -> impl IntoResponse {
    let report: FailureReport = serde_json::from_slice(&body).unwrap_or_else(|e| {
        debug!(error = %e, "unreadable failure report body");
        FailureReport::default()
    });

    match report.node.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        Some(node) => {
            let outcome = state.reporter.report_failure(node);
            debug!(node = %node, ?outcome, "failure report handled");
        }
        None => debug!("failure report without node id"),
    }

    Json(serde_json::json!({ "status": "acknowledged" }))
}

// ── Status ─────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct NodeView {
    pub status: String,
    pub cpu: f64,
    pub memory: f64,
    pub connections: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NodesResponse {
    pub strategy: String,
    pub telemetry_available: bool,
    pub nodes: BTreeMap<NodeId, NodeView>,
}

/// GET /nodes
///
/// Reads the table as-is; no telemetry refresh.
pub async fn list_nodes(State(state): State<ApiState>) -> impl IntoResponse {
    let snapshot = state.scheduler.store().snapshot();
    let nodes = snapshot
        .iter()
        .map(|r| {
            (
                r.id.clone(),
                NodeView {
                    status: r.status.label().to_string(),
                    cpu: r.cpu_percent,
                    memory: r.memory_mb,
                    connections: r.connections,
                },
            )
        })
        .collect();

    Json(NodesResponse {
        strategy: state.scheduler.strategy().to_string(),
        telemetry_available: snapshot.telemetry_available,
        nodes,
    })
}

// ── Prometheus ─────────────────────────────────────────────────

/// GET /metrics
pub async fn prometheus_metrics(State(state): State<ApiState>) -> impl IntoResponse {
    let snapshot = state.scheduler.store().snapshot();
    let body = render_prometheus(&snapshot, &state.scheduler.emitter().counters());
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}
