//! Conversion from raw counters to the resource sample stored per node.
//!
//! Each reading is self-contained: the telemetry source supplies both the
//! current and the previous counters, so no baseline is carried between
//! fetches.

use fogsched_state::ResourceSample;

use crate::source::NodeStats;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// CPU usage in percent: `(cpu Δ / system Δ) × cores × 100`.
///
/// Zero when either delta is not positive (counter reset, zero-width
/// sampling window).
pub fn cpu_percent(stats: &NodeStats) -> f64 {
    if stats.cpu_usage_delta <= 0 || stats.system_cpu_delta <= 0 {
        return 0.0;
    }
    (stats.cpu_usage_delta as f64 / stats.system_cpu_delta as f64)
        * f64::from(stats.online_cores)
        * 100.0
}

/// Resident memory in MB.
pub fn memory_mb(stats: &NodeStats) -> f64 {
    stats.memory_bytes as f64 / BYTES_PER_MB
}

/// Both values, rounded to two decimals.
pub fn compute_sample(stats: &NodeStats) -> ResourceSample {
    ResourceSample {
        cpu_percent: round2(cpu_percent(stats)),
        memory_mb: round2(memory_mb(stats)),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(cpu: i64, system: i64, cores: u32, mem: u64) -> NodeStats {
        NodeStats {
            cpu_usage_delta: cpu,
            system_cpu_delta: system,
            online_cores: cores,
            memory_bytes: mem,
        }
    }

    #[test]
    fn cpu_scales_with_cores() {
        assert_eq!(cpu_percent(&stats(50, 1000, 1, 0)), 5.0);
        assert_eq!(cpu_percent(&stats(50, 1000, 4, 0)), 20.0);
    }

    #[test]
    fn non_positive_deltas_clamp_to_zero() {
        assert_eq!(cpu_percent(&stats(0, 1000, 2, 0)), 0.0);
        assert_eq!(cpu_percent(&stats(-10, 1000, 2, 0)), 0.0);
        assert_eq!(cpu_percent(&stats(10, 0, 2, 0)), 0.0);
        assert_eq!(cpu_percent(&stats(10, -5, 2, 0)), 0.0);
    }

    #[test]
    fn memory_converts_to_mb() {
        assert_eq!(memory_mb(&stats(0, 0, 1, 64 * 1024 * 1024)), 64.0);
        assert_eq!(memory_mb(&stats(0, 0, 1, 512 * 1024)), 0.5);
    }

    #[test]
    fn sample_is_rounded() {
        let sample = compute_sample(&stats(1, 3, 1, 1_000_000));
        assert_eq!(sample.cpu_percent, 33.33);
        assert_eq!(sample.memory_mb, 0.95);
    }
}
