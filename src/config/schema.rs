//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy,
//! one struct per config file section. All defaults live here.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Serialize, Serializer};

/// Root configuration for the proxy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct ProxyConfig {
    /// Identity, listener and runtime settings (`[proxy]`).
    pub proxy: ProxySettings,

    /// Backend cluster settings (`[redis]`).
    pub redis: RedisSettings,

    /// Connection timeouts (`[common]`).
    pub timeouts: TimeoutSettings,

    /// Log sink settings (`[log]`).
    pub log: LogSettings,

    /// Profiling output settings (`[debug]`).
    pub debug: DebugSettings,
}

/// Proxy identity and listener configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProxySettings {
    /// Instance name. Required.
    pub name: String,

    /// Listen port. Required; loaded as written.
    pub port: i64,

    /// Scheduler parallelism (0 = runtime default).
    pub cpu: usize,

    /// Allow reads to be served by replica nodes.
    pub slave_ok: bool,

    /// Maximum concurrent client connections.
    pub max_connections: i64,

    /// Concurrent requests per backend connection.
    pub concurrency: i64,

    /// Maximum pipelined commands per batch.
    pub pipeline_length: i64,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            name: String::new(),
            port: 0,
            cpu: 0,
            slave_ok: false,
            max_connections: 4000,
            concurrency: 5,
            pipeline_length: 4096,
        }
    }
}

/// Backend cluster configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RedisSettings {
    /// Seed node addresses, in configured order.
    pub nodes: Vec<String>,

    /// Nodes to exclude from routing. Not consumed yet.
    pub excluded_nodes: Vec<String>,

    /// Connections kept per backend node.
    pub pool_size: i64,

    /// How often the slot table is refreshed.
    #[serde(serialize_with = "as_secs")]
    pub slot_reload_interval: Duration,
}

impl Default for RedisSettings {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            excluded_nodes: Vec::new(),
            pool_size: 10,
            slot_reload_interval: Duration::from_secs(600),
        }
    }
}

/// Timeout configuration, whole seconds. Negative values read as zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeoutSettings {
    #[serde(serialize_with = "as_secs")]
    pub idle: Duration,

    #[serde(serialize_with = "as_secs")]
    pub read: Duration,

    #[serde(serialize_with = "as_secs")]
    pub write: Duration,

    #[serde(serialize_with = "as_secs")]
    pub dial: Duration,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            idle: Duration::from_secs(30),
            read: Duration::from_secs(5),
            write: Duration::from_secs(5),
            dial: Duration::from_secs(3),
        }
    }
}

/// Log sink configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogSettings {
    /// Level name (trace, debug, info, warn, error).
    pub level: String,

    /// Log file; stdout when unset. Rotated daily.
    pub file: Option<PathBuf>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// Profiling output configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct DebugSettings {
    /// Where to write the CPU profile collected over the process lifetime.
    pub cpu_profile: Option<PathBuf>,

    /// Where to write a heap snapshot taken at startup.
    pub heap_profile: Option<PathBuf>,
}

fn as_secs<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_secs())
}
