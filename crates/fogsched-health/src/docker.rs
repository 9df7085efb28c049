//! Docker Engine telemetry source.
//!
//! Reads one-shot container stats over the Engine HTTP API, either on the
//! local Unix socket or a TCP endpoint. Fog nodes are containers named by
//! their node id.

use std::path::PathBuf;

use bytes::Bytes;
use http_body_util::{BodyExt, Empty};
use hyper::StatusCode;
use hyper_util::rt::TokioIo;
use serde::Deserialize;
use tracing::debug;

use crate::source::{NodeStats, TelemetryError, TelemetryFuture, TelemetrySource};

/// Where the Docker Engine API listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DockerEndpoint {
    /// `unix:///var/run/docker.sock`
    Unix(PathBuf),
    /// `http://127.0.0.1:2375` or `tcp://127.0.0.1:2375`
    Tcp(String),
}

impl DockerEndpoint {
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if let Some(path) = s.strip_prefix("unix://") {
            if path.is_empty() {
                return None;
            }
            return Some(DockerEndpoint::Unix(PathBuf::from(path)));
        }
        let addr = s
            .strip_prefix("http://")
            .or_else(|| s.strip_prefix("tcp://"))?
            .trim_end_matches('/');
        if addr.is_empty() || addr.contains('/') {
            return None;
        }
        Some(DockerEndpoint::Tcp(addr.to_string()))
    }
}

/// [`TelemetrySource`] backed by the Docker Engine API.
#[derive(Debug, Clone)]
pub struct DockerTelemetry {
    endpoint: DockerEndpoint,
}

impl DockerTelemetry {
    pub fn new(endpoint: DockerEndpoint) -> Self {
        Self { endpoint }
    }

    async fn get(&self, path: &str) -> Result<(StatusCode, Bytes), TelemetryError> {
        match &self.endpoint {
            DockerEndpoint::Tcp(addr) => {
                let stream = tokio::net::TcpStream::connect(addr.as_str())
                    .await
                    .map_err(|e| TelemetryError::Transport(format!("connect {addr}: {e}")))?;
                send_get(TokioIo::new(stream), addr, path).await
            }
            #[cfg(unix)]
            DockerEndpoint::Unix(socket) => {
                let stream = tokio::net::UnixStream::connect(socket).await.map_err(|e| {
                    TelemetryError::Transport(format!("connect {}: {e}", socket.display()))
                })?;
                send_get(TokioIo::new(stream), "docker", path).await
            }
            #[cfg(not(unix))]
            DockerEndpoint::Unix(_) => Err(TelemetryError::Transport(
                "unix sockets are not supported on this platform".to_string(),
            )),
        }
    }
}

impl TelemetrySource for DockerTelemetry {
    fn probe(&self) -> TelemetryFuture<'_, ()> {
        Box::pin(async move {
            let (status, _) = self.get("/_ping").await?;
            if status.is_success() {
                Ok(())
            } else {
                Err(TelemetryError::Transport(format!("ping returned {status}")))
            }
        })
    }

    fn fetch_stats<'a>(&'a self, node: &'a str) -> TelemetryFuture<'a, NodeStats> {
        Box::pin(async move {
            let path = format!("/containers/{node}/stats?stream=false");
            let (status, body) = self.get(&path).await?;
            match status {
                s if s.is_success() => parse_stats(&body),
                StatusCode::NOT_FOUND => Err(TelemetryError::NotFound(node.to_string())),
                s => Err(TelemetryError::Transport(format!("stats for {node} returned {s}"))),
            }
        })
    }
}

/// Issue a single GET over an established connection and collect the body.
async fn send_get<I>(io: I, host: &str, path: &str) -> Result<(StatusCode, Bytes), TelemetryError>
where
    I: hyper::rt::Read + hyper::rt::Write + Unpin + Send + 'static,
{
    let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
        .await
        .map_err(|e| TelemetryError::Transport(format!("handshake failed: {e}")))?;

    // Drive the connection in the background.
    tokio::spawn(async move {
        if let Err(e) = conn.await {
            debug!(error = %e, "telemetry connection closed with error");
        }
    });

    let req = http::Request::builder()
        .method("GET")
        .uri(path)
        .header("host", host)
        .header("user-agent", "fogsched/0.1")
        .body(Empty::<Bytes>::new())
        .map_err(|e| TelemetryError::Transport(format!("invalid request {path}: {e}")))?;

    let resp = sender
        .send_request(req)
        .await
        .map_err(|e| TelemetryError::Transport(format!("request {path} failed: {e}")))?;
    let status = resp.status();
    let body = resp
        .into_body()
        .collect()
        .await
        .map_err(|e| TelemetryError::Transport(format!("reading {path} failed: {e}")))?
        .to_bytes();

    Ok((status, body))
}

// ── Stats payload ──────────────────────────────────────────────────

#[derive(Deserialize)]
struct StatsPayload {
    cpu_stats: CpuStats,
    #[serde(default)]
    precpu_stats: Option<CpuStats>,
    memory_stats: MemoryStats,
}

#[derive(Deserialize)]
struct CpuStats {
    cpu_usage: CpuUsage,
    system_cpu_usage: Option<u64>,
    online_cpus: Option<u32>,
}

#[derive(Deserialize)]
struct CpuUsage {
    #[serde(default)]
    total_usage: u64,
    percpu_usage: Option<Vec<u64>>,
}

#[derive(Deserialize)]
struct MemoryStats {
    usage: Option<u64>,
}

/// Decode a `/containers/{id}/stats?stream=false` response body.
pub fn parse_stats(body: &[u8]) -> Result<NodeStats, TelemetryError> {
    let payload: StatsPayload =
        serde_json::from_slice(body).map_err(|e| TelemetryError::Malformed(e.to_string()))?;

    let system = payload
        .cpu_stats
        .system_cpu_usage
        .ok_or_else(|| TelemetryError::Malformed("missing cpu_stats.system_cpu_usage".into()))?;
    let memory_bytes = payload
        .memory_stats
        .usage
        .ok_or_else(|| TelemetryError::Malformed("missing memory_stats.usage".into()))?;

    let online_cores = match payload.cpu_stats.online_cpus {
        Some(n) if n > 0 => n,
        _ => payload
            .cpu_stats
            .cpu_usage
            .percpu_usage
            .as_ref()
            .map(|v| v.len())
            .filter(|&n| n > 0)
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| TelemetryError::Malformed("cannot determine online cpus".into()))?,
    };

    let (pre_total, pre_system) = payload
        .precpu_stats
        .map(|p| (p.cpu_usage.total_usage, p.system_cpu_usage.unwrap_or(0)))
        .unwrap_or((0, 0));

    Ok(NodeStats {
        cpu_usage_delta: delta(payload.cpu_stats.cpu_usage.total_usage, pre_total),
        system_cpu_delta: delta(system, pre_system),
        online_cores,
        memory_bytes,
    })
}

fn delta(current: u64, previous: u64) -> i64 {
    if current >= previous {
        i64::try_from(current - previous).unwrap_or(i64::MAX)
    } else {
        i64::try_from(previous - current).map_or(i64::MIN, |d| -d)
    }
}
