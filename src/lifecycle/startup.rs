//! Startup orchestration.
//!
//! # Responsibilities
//! - Load configuration and apply it to the process, once
//! - Configure logging before anything else is reported
//! - Start profiling and the diagnostics endpoint
//!
//! # Design Decisions
//! - Fail fast: a fatal error is returned before any later step runs
//! - Steps run in a fixed order on the caller's thread
//! - Out-of-range values are corrected with a warning, never fatal
//! - Resources that must live until shutdown are owned by `RuntimeGuard`

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::config::loader::{load_config, ConfigError};
use crate::config::schema::ProxyConfig;
use crate::config::validation::{self, Adjustment, ValidationError};
use crate::diagnostics::{CpuProfile, DIAGNOSTICS_ADDR};
use crate::lifecycle::runtime::{RuntimeHooks, SystemRuntime};
use crate::observability::logging::{self, LogGuard, LoggingError};

/// Fatal startup errors.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("set log output {target} failed: {source}")]
    Logging {
        target: String,
        #[source]
        source: LoggingError,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("create cpu profile {} failed: {source}", .path.display())]
    CpuProfile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StartupError {
    /// True when the error happened before the log sink was installed, so
    /// it has not been logged yet.
    pub fn precedes_logging(&self) -> bool {
        matches!(self, StartupError::Config(_) | StartupError::Logging { .. })
    }
}

/// Resources that must stay alive until the process shuts down.
///
/// Dropping the guard writes the CPU profile (if any) and then flushes the
/// log writer.
#[derive(Debug, Default)]
pub struct RuntimeGuard {
    cpu_profile: Option<CpuProfile>,
    _log: LogGuard,
}

impl RuntimeGuard {
    pub fn is_profiling(&self) -> bool {
        self.cpu_profile.is_some()
    }
}

impl Drop for RuntimeGuard {
    fn drop(&mut self) {
        if let Some(profile) = self.cpu_profile.take() {
            match profile.stop() {
                Ok(path) => tracing::info!(path = %path.display(), "CPU profile written"),
                Err(e) => tracing::warn!(error = %e, "Failed to write CPU profile"),
            }
        }
    }
}

/// Result of a successful bootstrap.
#[derive(Debug)]
pub struct Bootstrap {
    /// The finalized configuration.
    pub config: ProxyConfig,

    /// Values corrected during validation, in the order applied.
    pub adjustments: Vec<Adjustment>,

    pub guard: RuntimeGuard,
}

/// Load the config file at `path` and apply it to this process.
///
/// Must be called at most once per process.
pub fn bootstrap(path: &Path) -> Result<Bootstrap, StartupError> {
    let config = load_config(path)?;
    apply_runtime_settings(config, &mut SystemRuntime)
}

/// Validate `config`, correct out-of-range values and apply it to the process.
///
/// Steps, in order: log sink, name, port, CPU clamp, connection clamp,
/// scheduler parallelism, pool size clamp, CPU profile, heap snapshot,
/// diagnostics endpoint.
pub fn apply_runtime_settings<H: RuntimeHooks>(
    config: ProxyConfig,
    hooks: &mut H,
) -> Result<Bootstrap, StartupError> {
    let level = logging::parse_level(&config.log.level);
    let log = hooks
        .init_logging(level.unwrap_or(LevelFilter::INFO), config.log.file.as_deref())
        .map_err(|source| StartupError::Logging {
            target: log_target(&config),
            source,
        })?;

    if level.is_none() {
        tracing::warn!(
            field = "log::loglevel",
            value = %config.log.level,
            "Unrecognized log level, using info"
        );
    }
    if let Some(path) = &config.log.file {
        tracing::info!(path = %path.display(), "Logging to file, rotated daily");
    }

    match apply_validated(config, hooks) {
        Ok((config, adjustments, cpu_profile)) => Ok(Bootstrap {
            config,
            adjustments,
            guard: RuntimeGuard {
                cpu_profile,
                _log: log,
            },
        }),
        Err(e) => {
            // Reported here while the log sink is still alive.
            tracing::error!(error = %e, "Fatal startup error");
            Err(e)
        }
    }
}

fn apply_validated<H: RuntimeHooks>(
    mut config: ProxyConfig,
    hooks: &mut H,
) -> Result<(ProxyConfig, Vec<Adjustment>, Option<CpuProfile>), StartupError> {
    validation::check_name(&config)?;
    validation::check_port(&config)?;

    let mut adjustments = Vec::new();

    let cpus = hooks.available_cpus();
    record(&mut adjustments, validation::clamp_cpu(&mut config, cpus));
    record(&mut adjustments, validation::clamp_max_connections(&mut config));

    hooks.set_parallelism(config.proxy.cpu);

    record(&mut adjustments, validation::clamp_pool_size(&mut config));

    let cpu_profile = match &config.debug.cpu_profile {
        Some(path) => start_cpu_profile(hooks, path)?,
        None => None,
    };

    if let Some(path) = &config.debug.heap_profile {
        write_heap_profile(hooks, path);
    }

    hooks.spawn_diagnostics(DIAGNOSTICS_ADDR);

    tracing::info!(
        name = %config.proxy.name,
        port = config.proxy.port,
        cpu = config.proxy.cpu,
        max_connections = config.proxy.max_connections,
        pool_size = config.redis.pool_size,
        nodes = ?config.redis.nodes,
        "Proxy configuration applied"
    );
    tracing::debug!(config = ?config, "Full configuration");

    Ok((config, adjustments, cpu_profile))
}

fn log_target(config: &ProxyConfig) -> String {
    match &config.log.file {
        Some(path) => path.display().to_string(),
        None => "stdout".to_string(),
    }
}

fn record(adjustments: &mut Vec<Adjustment>, adjustment: Option<Adjustment>) {
    if let Some(adjustment) = adjustment {
        tracing::warn!(
            field = adjustment.field,
            from = adjustment.from,
            to = adjustment.to,
            "Config value out of range, adjusted"
        );
        adjustments.push(adjustment);
    }
}

fn start_cpu_profile<H: RuntimeHooks>(
    hooks: &mut H,
    path: &Path,
) -> Result<Option<CpuProfile>, StartupError> {
    let file = File::create(path).map_err(|source| StartupError::CpuProfile {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::warn!(path = %path.display(), "Starting CPU profile");
    match hooks.start_cpu_profile(file, path) {
        Ok(profile) => Ok(profile),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "CPU profiler did not start");
            Ok(None)
        }
    }
}

// Unlike the CPU profile, a heap snapshot that cannot be written is skipped.
fn write_heap_profile<H: RuntimeHooks>(hooks: &mut H, path: &Path) {
    let file = match File::create(path) {
        Ok(file) => file,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Cannot create heap profile, skipping");
            return;
        }
    };

    tracing::warn!(path = %path.display(), "Writing heap profile");
    if let Err(e) = hooks.write_heap_profile(file) {
        tracing::warn!(path = %path.display(), error = %e, "Failed to write heap profile");
    }
}
