//! Diagnostics HTTP endpoint.
//!
//! # Responsibilities
//! - Serve live profiling data on a fixed port
//! - Run detached on its own thread, independent of the proxy runtime
//!
//! # Routes
//! - `GET /debug/pprof/` (index)
//! - `GET /debug/pprof/profile?seconds=N` (CPU profile, pprof protobuf)
//! - `GET /debug/pprof/heap` (heap snapshot, JSON)
//! - `GET /debug/pprof/cmdline` (process arguments)
//! - `GET /debug/runtime` (CPU and worker thread counts)

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    extract::Query,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::diagnostics::heap::HeapSnapshot;
use crate::diagnostics::profiler::{self, ProfilerError};
use crate::lifecycle::scheduler;

/// Fixed diagnostics address (all interfaces, port 6061).
pub const DIAGNOSTICS_ADDR: SocketAddr =
    SocketAddr::new(std::net::IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED), 6061);

/// Default CPU capture length.
pub const DEFAULT_PROFILE_SECS: u64 = 30;

/// Longest CPU capture accepted.
pub const MAX_PROFILE_SECS: u64 = 300;

const INDEX: &str = "\
/debug/pprof/profile?seconds=N  CPU profile (pprof protobuf), default 30s
/debug/pprof/heap               heap snapshot (JSON)
/debug/pprof/cmdline            process command line
/debug/runtime                  CPU and worker thread counts
";

/// Build the diagnostics router.
pub fn router() -> Router {
    Router::new()
        .route("/debug/pprof/", get(index))
        .route("/debug/pprof/profile", get(cpu_profile))
        .route("/debug/pprof/heap", get(heap))
        .route("/debug/pprof/cmdline", get(cmdline))
        .route("/debug/runtime", get(runtime_info))
        .layer(TraceLayer::new_for_http())
}

/// Serve diagnostics on an already bound listener until it fails.
pub async fn serve(listener: TcpListener) -> io::Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!(address = %addr, "Diagnostics endpoint listening");
    axum::serve(listener, router()).await
}

/// Bind `addr` and serve on a private current-thread runtime. Blocks.
pub fn run(addr: SocketAddr) -> io::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let listener = TcpListener::bind(addr).await?;
        serve(listener).await
    })
}

/// Start the endpoint on a background thread and return immediately.
///
/// Failures are logged as warnings; nothing is reported to the caller.
pub fn spawn_detached(addr: SocketAddr) {
    let spawned = std::thread::Builder::new()
        .name("diagnostics".to_string())
        .spawn(move || {
            if let Err(e) = run(addr) {
                tracing::warn!(address = %addr, error = %e, "Diagnostics endpoint stopped");
            }
        });

    if let Err(e) = spawned {
        tracing::warn!(address = %addr, error = %e, "Failed to start diagnostics thread");
    }
}

async fn index() -> &'static str {
    INDEX
}

#[derive(Debug, Deserialize)]
struct ProfileParams {
    #[serde(default = "default_profile_secs")]
    seconds: u64,
}

fn default_profile_secs() -> u64 {
    DEFAULT_PROFILE_SECS
}

async fn cpu_profile(Query(params): Query<ProfileParams>) -> Response {
    if params.seconds == 0 || params.seconds > MAX_PROFILE_SECS {
        return (
            StatusCode::BAD_REQUEST,
            format!("seconds must be between 1 and {MAX_PROFILE_SECS}"),
        )
            .into_response();
    }

    let duration = Duration::from_secs(params.seconds);
    match tokio::task::spawn_blocking(move || profiler::capture(duration)).await {
        Ok(Ok(profile)) => (
            [
                (header::CONTENT_TYPE, "application/octet-stream"),
                (header::CONTENT_DISPOSITION, "attachment; filename=\"profile\""),
            ],
            profile,
        )
            .into_response(),
        Ok(Err(e @ ProfilerError::Start(_))) => {
            tracing::warn!(error = %e, "CPU profile request rejected");
            (StatusCode::CONFLICT, e.to_string()).into_response()
        }
        Ok(Err(e)) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "CPU profile task failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn heap() -> Json<HeapSnapshot> {
    Json(HeapSnapshot::capture())
}

async fn cmdline() -> String {
    std::env::args().collect::<Vec<_>>().join("\0")
}

#[derive(Debug, Serialize)]
struct RuntimeInfo {
    logical_cpus: usize,
    worker_threads: usize,
    pid: u32,
}

async fn runtime_info() -> Json<RuntimeInfo> {
    Json(RuntimeInfo {
        logical_cpus: scheduler::available_cpus(),
        worker_threads: scheduler::worker_threads(),
        pid: std::process::id(),
    })
}
