//! Command-line interface.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};

use fogsched_core::FogschedConfig;

#[derive(Parser)]
#[command(name = "fogschedd", about = "Fog node placement scheduler")]
pub struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Serve placement requests.
    Run(RunArgs),
}

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Path to fogsched.toml. Built-in defaults are used when omitted.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Address to listen on, e.g. 0.0.0.0:5000.
    #[arg(long)]
    pub listen: Option<String>,

    /// Fog node id. Repeat to configure the pool; replaces the file's list.
    #[arg(long = "node")]
    pub nodes: Vec<String>,

    /// Default placement strategy (least_cpu, least_memory, least_connections, random).
    #[arg(long)]
    pub strategy: Option<String>,

    /// Recovery timeout, e.g. 30s.
    #[arg(long)]
    pub recovery_timeout: Option<String>,

    /// Docker Engine endpoint, e.g. unix:///var/run/docker.sock.
    #[arg(long)]
    pub telemetry_endpoint: Option<String>,
}

impl RunArgs {
    /// Load the config file (or defaults), apply flag overrides and validate.
    pub fn load_config(&self) -> anyhow::Result<FogschedConfig> {
        let mut config = match &self.config {
            Some(path) => FogschedConfig::from_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => FogschedConfig::default(),
        };

        if let Some(listen) = &self.listen {
            config.server.listen = listen.clone();
        }
        if !self.nodes.is_empty() {
            config.scheduler.nodes = self.nodes.clone();
        }
        if let Some(strategy) = &self.strategy {
            config.scheduler.strategy = strategy.clone();
        }
        if let Some(timeout) = &self.recovery_timeout {
            config.scheduler.recovery_timeout = timeout.clone();
        }
        if let Some(endpoint) = &self.telemetry_endpoint {
            config.telemetry.endpoint = endpoint.clone();
        }

        config.validate()?;
        Ok(config)
    }
}
