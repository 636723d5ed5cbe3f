//! Cluster proxy entry point.
//!
//! # Startup
//!
//! ```text
//! conf/proxy.ini
//!     → load + validate + clamp      (lifecycle::startup)
//!     → log sink, profiling, :6061   (process side effects, once)
//!     → Tokio runtime, `cpu` workers (lifecycle::scheduler)
//!     → wait for SIGINT/SIGTERM
//!     → drop RuntimeGuard            (CPU profile written, logs flushed)
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use cluster_proxy::config::{load_config, validation};
use cluster_proxy::diagnostics::CountingAllocator;
use cluster_proxy::lifecycle::{bootstrap, scheduler, signals, Bootstrap};

#[global_allocator]
static ALLOCATOR: CountingAllocator = CountingAllocator;

#[derive(Parser)]
#[command(name = "cluster-proxy")]
#[command(about = "Redis cluster proxy", long_about = None)]
struct Cli {
    /// Path to the INI config file.
    #[arg(short, long, default_value = "conf/proxy.ini")]
    config: PathBuf,

    /// Validate the config, print the resolved values and exit.
    #[arg(long)]
    check: bool,
}

fn main() -> ExitCode {
    CountingAllocator::mark_installed();
    let cli = Cli::parse();

    if cli.check {
        return check(&cli.config);
    }

    let Bootstrap { config, guard, .. } = match bootstrap(&cli.config) {
        Ok(bootstrap) => bootstrap,
        Err(e) => {
            if e.precedes_logging() {
                eprintln!("cluster-proxy: {e}");
            }
            return ExitCode::FAILURE;
        }
    };
    let config = Arc::new(config);

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(scheduler::worker_threads())
        .thread_name("proxy-worker")
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => return fatal(&e),
    };

    runtime.block_on(async {
        tracing::info!(
            name = %config.proxy.name,
            port = config.proxy.port,
            worker_threads = scheduler::worker_threads(),
            "Proxy ready"
        );
        signals::shutdown_signal().await;
    });

    drop(runtime);
    drop(guard);
    ExitCode::SUCCESS
}

fn check(path: &std::path::Path) -> ExitCode {
    let config = match load_config(path) {
        Ok(config) => config,
        Err(e) => return fatal(&e),
    };

    match validation::normalize(config, scheduler::available_cpus()) {
        Ok((config, adjustments)) => {
            let report = serde_json::json!({
                "config": config,
                "adjustments": adjustments,
            });
            match serde_json::to_string_pretty(&report) {
                Ok(text) => {
                    println!("{text}");
                    ExitCode::SUCCESS
                }
                Err(e) => fatal(&e),
            }
        }
        Err(e) => fatal(&e),
    }
}

fn fatal(error: &dyn std::error::Error) -> ExitCode {
    if tracing::dispatcher::has_been_set() {
        tracing::error!(error = %error, "Fatal startup error");
    } else {
        eprintln!("cluster-proxy: {error}");
    }
    ExitCode::FAILURE
}
