//! fogsched.toml configuration parser.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid duration for `{field}`: {value}")]
    Duration { field: &'static str, value: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FogschedConfig {
    pub scheduler: SchedulerSection,
    pub telemetry: TelemetrySection,
    pub server: ServerSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerSection {
    /// Ordered, fixed set of fog node ids.
    pub nodes: Vec<String>,
    /// Minimum quiet period before a SUSPECTED node is probed again.
    pub recovery_timeout: String,
    /// Default placement strategy name. Resolved (with fallback) by the
    /// placement crate, never rejected here.
    pub strategy: String,
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            nodes: vec!["fog-node-1".to_string(), "fog-node-2".to_string()],
            recovery_timeout: "30s".to_string(),
            strategy: "least_cpu".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySection {
    /// Docker Engine endpoint: `unix:///path/to.sock` or `http://host:port`.
    pub endpoint: String,
    /// Upper bound on a single stats fetch.
    pub fetch_timeout: String,
}

impl Default for TelemetrySection {
    fn default() -> Self {
        Self {
            endpoint: "unix:///var/run/docker.sock".to_string(),
            fetch_timeout: "2s".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub listen: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:5000".to_string(),
        }
    }
}

impl FogschedConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn recovery_timeout(&self) -> Result<Duration, ConfigError> {
        let raw = &self.scheduler.recovery_timeout;
        parse_duration(raw).ok_or_else(|| ConfigError::Duration {
            field: "scheduler.recovery_timeout",
            value: raw.clone(),
        })
    }

    pub fn fetch_timeout(&self) -> Result<Duration, ConfigError> {
        let raw = &self.telemetry.fetch_timeout;
        parse_duration(raw).ok_or_else(|| ConfigError::Duration {
            field: "telemetry.fetch_timeout",
            value: raw.clone(),
        })
    }

    /// Check the invariants the rest of the scheduler relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scheduler.nodes.is_empty() {
            return Err(ConfigError::Invalid("scheduler.nodes must not be empty".into()));
        }

        let mut seen = HashSet::new();
        for node in &self.scheduler.nodes {
            if node.trim().is_empty() {
                return Err(ConfigError::Invalid("node ids must not be blank".into()));
            }
            if !seen.insert(node.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate node id: {node}")));
            }
        }

        self.recovery_timeout()?;
        if self.fetch_timeout()?.is_zero() {
            return Err(ConfigError::Invalid(
                "telemetry.fetch_timeout must be greater than zero".into(),
            ));
        }

        Ok(())
    }
}

/// Parse a duration string like "5s", "500ms", "2m" or a bare number of
/// seconds.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(ms) = s.strip_suffix("ms") {
        ms.trim().parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = s.strip_suffix('s') {
        secs.trim().parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.trim().parse::<u64>().ok().map(|m| Duration::from_secs(m * 60))
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_deployment() {
        let config = FogschedConfig::default();
        assert_eq!(config.scheduler.nodes, vec!["fog-node-1", "fog-node-2"]);
        assert_eq!(config.recovery_timeout().unwrap(), Duration::from_secs(30));
        assert_eq!(config.scheduler.strategy, "least_cpu");
        assert_eq!(config.server.listen, "0.0.0.0:5000");
        config.validate().unwrap();
    }

    #[test]
    fn parse_partial_file_keeps_defaults() {
        let config = FogschedConfig::from_toml_str(
            r#"
[scheduler]
nodes = ["a", "b", "c"]
strategy = "random"
"#,
        )
        .unwrap();
        assert_eq!(config.scheduler.nodes.len(), 3);
        assert_eq!(config.scheduler.strategy, "random");
        assert_eq!(config.scheduler.recovery_timeout, "30s");
        assert_eq!(config.telemetry.fetch_timeout, "2s");
    }

    #[test]
    fn from_file_reads_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fogsched.toml");
        std::fs::write(&path, "[server]\nlisten = \"127.0.0.1:7000\"\n").unwrap();

        let config = FogschedConfig::from_file(&path).unwrap();
        assert_eq!(config.server.listen, "127.0.0.1:7000");
    }

    #[test]
    fn from_file_missing_is_read_error() {
        let err = FogschedConfig::from_file(Path::new("/nonexistent/fogsched.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read(_)));
    }

    #[test]
    fn validate_rejects_empty_pool() {
        let mut config = FogschedConfig::default();
        config.scheduler.nodes.clear();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn validate_rejects_duplicates() {
        let mut config = FogschedConfig::default();
        config.scheduler.nodes = vec!["a".into(), "a".into()];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate node id: a"));
    }

    #[test]
    fn validate_rejects_bad_durations() {
        let mut config = FogschedConfig::default();
        config.scheduler.recovery_timeout = "soon".into();
        assert!(matches!(config.validate(), Err(ConfigError::Duration { .. })));

        let mut config = FogschedConfig::default();
        config.telemetry.fetch_timeout = "0ms".into();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn validate_does_not_judge_strategy() {
        let mut config = FogschedConfig::default();
        config.scheduler.strategy = "LEAST_ENTROPY".into();
        config.validate().unwrap();
    }

    #[test]
    fn parse_duration_values() {
        assert_eq!(parse_duration("5s"), Some(Duration::from_secs(5)));
        assert_eq!(parse_duration("500ms"), Some(Duration::from_millis(500)));
        assert_eq!(parse_duration("2m"), Some(Duration::from_secs(120)));
        assert_eq!(parse_duration("10"), Some(Duration::from_secs(10)));
        assert_eq!(parse_duration("later"), None);
    }
}
