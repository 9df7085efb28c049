//! fogschedd — the fog placement scheduler daemon.
//!
//! Assembles the status store, Docker telemetry, health monitor, placement
//! engine and HTTP API into one process.
//!
//! # Usage
//!
//! ```text
//! fogschedd run --config /etc/fogsched.toml
//! fogschedd run --node fog-node-1 --node fog-node-2 --strategy least_cpu
//! ```

mod cli;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{Subscriber, error, info, warn};
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use fogsched_health::{DockerEndpoint, DockerTelemetry, HealthSettings};
use fogsched_metrics::STATUS_TARGET;
use fogsched_placement::Strategy;
use fogsched_scheduler::Scheduler;
use fogsched_state::StatusStore;

use crate::cli::{Cli, Command, RunArgs};

const DEFAULT_LOG_FILTER: &str = "info,fogschedd=debug,fogsched=debug";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cli.command {
        Command::Run(args) => run(args).await,
    }
}

fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    if json {
        json_subscriber(filter, std::io::stdout).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// JSON logging for everything except `STATUS_UPDATE::` records, which
/// stay plain text so line consumers can match the prefix.
fn json_subscriber<W>(filter: EnvFilter, writer: W) -> impl Subscriber + Send + Sync + 'static
where
    W: for<'a> MakeWriter<'a> + Clone + Send + Sync + 'static,
{
    let json = fmt::layer()
        .json()
        .with_writer(writer.clone())
        .with_filter(filter_fn(|meta| meta.target() != STATUS_TARGET));
    let status = fmt::layer()
        .with_ansi(false)
        .with_writer(writer)
        .with_filter(filter_fn(|meta| meta.target() == STATUS_TARGET));

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(status)
}

async fn run(args: RunArgs) -> anyhow::Result<()> {
    let config = args.load_config()?;
    info!("fogsched daemon starting");

    // ── Initialize subsystems ──────────────────────────────────

    let settings = HealthSettings {
        recovery_timeout: config.recovery_timeout()?,
        fetch_timeout: config.fetch_timeout()?,
    };
    let strategy = Strategy::parse_or_fallback(&config.scheduler.strategy);

    let store = StatusStore::new(config.scheduler.nodes.iter().cloned())?;
    info!(nodes = ?config.scheduler.nodes, "status store initialized");

    let endpoint = DockerEndpoint::parse(&config.telemetry.endpoint)
        .with_context(|| format!("invalid telemetry endpoint: {}", config.telemetry.endpoint))?;
    let telemetry = Arc::new(DockerTelemetry::new(endpoint));
    info!(endpoint = %config.telemetry.endpoint, "docker telemetry configured");

    let scheduler = Arc::new(Scheduler::new(store, telemetry, settings, strategy));
    if !scheduler.start().await {
        warn!("telemetry unavailable at startup, placing by least-connections until it returns");
    }

    // ── Start API server ───────────────────────────────────────

    let router = fogsched_api::build_router(scheduler);
    let addr: SocketAddr = config
        .server
        .listen
        .parse()
        .with_context(|| format!("invalid listen address: {}", config.server.listen))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "API server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("fogsched daemon stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
