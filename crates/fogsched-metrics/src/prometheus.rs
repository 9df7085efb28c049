//! Prometheus text exposition format.
//!
//! Renders the current node status table and emitter counters for
//! scraping by a Prometheus server or compatible agent.

use std::fmt::Write;

use fogsched_state::Snapshot;

use crate::emitter::EmitterCounters;

/// Render a snapshot and counters into Prometheus text format.
///
/// Per-node values are GAUGE metrics with a `node` label.
pub fn render_prometheus(snapshot: &Snapshot, counters: &EmitterCounters) -> String {
    let mut out = String::new();

    out.push_str("# HELP fogsched_node_up Whether the node is UP (1) or SUSPECTED (0).\n");
    out.push_str("# TYPE fogsched_node_up gauge\n");
    for r in snapshot.iter() {
        let _ = writeln!(out, "fogsched_node_up{{node=\"{}\"}} {}", r.id, u8::from(r.is_up()));
    }

    out.push_str("# HELP fogsched_node_cpu_percent Last sampled CPU usage in percent.\n");
    out.push_str("# TYPE fogsched_node_cpu_percent gauge\n");
    for r in snapshot.iter() {
        let _ = writeln!(
            out,
            "fogsched_node_cpu_percent{{node=\"{}\"}} {:.2}",
            r.id, r.cpu_percent
        );
    }

    out.push_str("# HELP fogsched_node_memory_mb Last sampled memory usage in MB.\n");
    out.push_str("# TYPE fogsched_node_memory_mb gauge\n");
    for r in snapshot.iter() {
        let _ = writeln!(out, "fogsched_node_memory_mb{{node=\"{}\"}} {:.2}", r.id, r.memory_mb);
    }

    out.push_str("# HELP fogsched_node_connections Placements made by least-connections.\n");
    out.push_str("# TYPE fogsched_node_connections gauge\n");
    for r in snapshot.iter() {
        let _ = writeln!(out, "fogsched_node_connections{{node=\"{}\"}} {}", r.id, r.connections);
    }

    out.push_str(
        "# HELP fogsched_telemetry_available Whether the telemetry source is reachable.\n",
    );
    out.push_str("# TYPE fogsched_telemetry_available gauge\n");
    let _ = writeln!(
        out,
        "fogsched_telemetry_available {}",
        u8::from(snapshot.telemetry_available)
    );

    out.push_str("# HELP fogsched_placements_total Successful placement decisions.\n");
    out.push_str("# TYPE fogsched_placements_total counter\n");
    let _ = writeln!(out, "fogsched_placements_total {}", counters.placements);

    out.push_str("# HELP fogsched_placement_failures_total Placement requests with no UP node.\n");
    out.push_str("# TYPE fogsched_placement_failures_total counter\n");
    let _ = writeln!(
        out,
        "fogsched_placement_failures_total {}",
        counters.placement_failures
    );

    out.push_str("# HELP fogsched_transitions_total Health transitions by target status.\n");
    out.push_str("# TYPE fogsched_transitions_total counter\n");
    let _ = writeln!(out, "fogsched_transitions_total{{to=\"SUSPECTED\"}} {}", counters.suspected);
    let _ = writeln!(out, "fogsched_transitions_total{{to=\"UP\"}} {}", counters.recovered);

    out
}
