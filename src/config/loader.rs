//! Configuration loading from a key/value source.

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::config::schema::{
    DebugSettings, LogSettings, ProxyConfig, ProxySettings, RedisSettings, TimeoutSettings,
};
use crate::config::source::{IniSource, KeyValueSource};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read or parsed.
    #[error("read config file failed: {0}")]
    Source(#[from] ::config::ConfigError),
}

/// Load configuration from an INI file.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let source = IniSource::open(path)?;
    Ok(ProxyConfig::from_source(&source))
}

impl ProxyConfig {
    /// Read every field from `source`, defaulting whatever is absent.
    ///
    /// Values are taken as written; range checks happen at bootstrap.
    pub fn from_source(source: &dyn KeyValueSource) -> Self {
        let defaults = ProxyConfig::default();

        let proxy = ProxySettings {
            name: source.string("proxy::name", &defaults.proxy.name),
            port: source.int("proxy::port", defaults.proxy.port),
            // Negative parallelism means "leave the runtime default".
            cpu: usize::try_from(source.int("proxy::cpu", 0)).unwrap_or(0),
            slave_ok: source.boolean("proxy::slaveok", defaults.proxy.slave_ok),
            max_connections: source.int("proxy::maxconn", defaults.proxy.max_connections),
            concurrency: source.int("proxy::concurrency", defaults.proxy.concurrency),
            pipeline_length: source.int("proxy::pipelength", defaults.proxy.pipeline_length),
        };

        let redis = RedisSettings {
            nodes: split_nodes(&source.string("redis::nodes", "")),
            excluded_nodes: split_nodes(&source.string("redis::kickoff", "")),
            pool_size: source.int("redis::poolsize", defaults.redis.pool_size),
            slot_reload_interval: seconds(source, "redis::reloadslot", defaults.redis.slot_reload_interval),
        };

        let timeouts = TimeoutSettings {
            idle: seconds(source, "common::idletimeout", defaults.timeouts.idle),
            read: seconds(source, "common::readtimeout", defaults.timeouts.read),
            write: seconds(source, "common::writetimeout", defaults.timeouts.write),
            dial: seconds(source, "common::dialtimeout", defaults.timeouts.dial),
        };

        let log = LogSettings {
            level: source.string("log::loglevel", &defaults.log.level),
            file: optional_path(source, "log::logfile"),
        };

        let debug = DebugSettings {
            cpu_profile: optional_path(source, "debug::cpufile"),
            heap_profile: optional_path(source, "debug::memfile"),
        };

        Self {
            proxy,
            redis,
            timeouts,
            log,
            debug,
        }
    }
}

/// Split a whitespace-delimited node list, keeping order.
pub fn split_nodes(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(str::to_string).collect()
}

// A negative timeout expires immediately, same as zero.
fn seconds(source: &dyn KeyValueSource, key: &str, default: Duration) -> Duration {
    let secs = source.int(key, default.as_secs() as i64);
    Duration::from_secs(u64::try_from(secs).unwrap_or(0))
}

fn optional_path(source: &dyn KeyValueSource, key: &str) -> Option<PathBuf> {
    let value = source.string(key, "");
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(PathBuf::from(value))
    }
}
