//! Placement strategies.

use std::fmt;
use std::str::FromStr;

use tracing::warn;

use crate::engine::PlacementError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Lowest sampled CPU usage.
    LeastCpu,
    /// Lowest sampled memory usage.
    LeastMemory,
    /// Fewest placements so far. Needs no telemetry.
    LeastConnections,
    /// Uniform among UP nodes.
    Random,
}

impl Strategy {
    pub const ALL: [Strategy; 4] = [
        Strategy::LeastCpu,
        Strategy::LeastMemory,
        Strategy::LeastConnections,
        Strategy::Random,
    ];

    /// Strategy used when the requested one cannot be applied.
    pub const FALLBACK: Strategy = Strategy::LeastConnections;

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::LeastCpu => "least_cpu",
            Strategy::LeastMemory => "least_memory",
            Strategy::LeastConnections => "least_connections",
            Strategy::Random => "random",
        }
    }

    /// Whether ranking depends on telemetry samples.
    pub fn requires_telemetry(&self) -> bool {
        matches!(self, Strategy::LeastCpu | Strategy::LeastMemory)
    }

    /// Parse a configured strategy name. An unrecognized name is logged and
    /// degrades to [`Strategy::FALLBACK`] rather than failing.
    pub fn parse_or_fallback(name: &str) -> Strategy {
        match name.parse() {
            Ok(strategy) => strategy,
            Err(e) => {
                warn!(error = %e, fallback = Self::FALLBACK.as_str(), "using fallback strategy");
                Self::FALLBACK
            }
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts `least_cpu`, `LEAST_CPU`, `least-cpu`, `LeastCPU` and the like.
impl FromStr for Strategy {
    type Err = PlacementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .map(|c| c.to_ascii_lowercase())
            .collect();

        match normalized.as_str() {
            "leastcpu" => Ok(Strategy::LeastCpu),
            "leastmemory" | "leastmem" => Ok(Strategy::LeastMemory),
            "leastconnections" | "leastconn" => Ok(Strategy::LeastConnections),
            "random" => Ok(Strategy::Random),
            _ => Err(PlacementError::UnknownStrategy(s.to_string())),
        }
    }
}
