//! Configuration validation.
//!
//! # Responsibilities
//! - Reject configs missing required identity/network fields
//! - Clamp out-of-range values to safe bounds
//!
//! # Design Decisions
//! - Missing name or port is fatal; everything else is corrected
//! - Each correction is reported as an `Adjustment` so the caller can warn
//! - Pure functions: no logging, no process state

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::config::schema::ProxyConfig;

/// Upper bound for `proxy::maxconn`.
pub const MAX_CONNECTIONS_LIMIT: i64 = 10_000;

/// Accepted range for `redis::poolsize`.
pub const POOL_SIZE_MIN: i64 = 1;
pub const POOL_SIZE_MAX: i64 = 30;

/// Value `redis::poolsize` is reset to when out of range.
pub const POOL_SIZE_FALLBACK: i64 = 10;

/// A required field is missing or zero.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("proxy::name must not be empty")]
    MissingName,

    #[error("proxy::port must not be 0")]
    ZeroPort,
}

/// A value corrected during validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Adjustment {
    /// Config key that was corrected.
    pub field: &'static str,
    pub from: i64,
    pub to: i64,
}

impl fmt::Display for Adjustment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} adjusted to {}", self.field, self.from, self.to)
    }
}

pub fn check_name(config: &ProxyConfig) -> Result<(), ValidationError> {
    if config.proxy.name.is_empty() {
        return Err(ValidationError::MissingName);
    }
    Ok(())
}

pub fn check_port(config: &ProxyConfig) -> Result<(), ValidationError> {
    if config.proxy.port == 0 {
        return Err(ValidationError::ZeroPort);
    }
    Ok(())
}

/// Cap the requested parallelism at the number of logical CPUs.
pub fn clamp_cpu(config: &mut ProxyConfig, available: usize) -> Option<Adjustment> {
    let requested = config.proxy.cpu;
    if requested <= available {
        return None;
    }
    config.proxy.cpu = available;
    Some(Adjustment {
        field: "proxy::cpu",
        from: requested as i64,
        to: available as i64,
    })
}

pub fn clamp_max_connections(config: &mut ProxyConfig) -> Option<Adjustment> {
    let requested = config.proxy.max_connections;
    if requested <= MAX_CONNECTIONS_LIMIT {
        return None;
    }
    config.proxy.max_connections = MAX_CONNECTIONS_LIMIT;
    Some(Adjustment {
        field: "proxy::maxconn",
        from: requested,
        to: MAX_CONNECTIONS_LIMIT,
    })
}

pub fn clamp_pool_size(config: &mut ProxyConfig) -> Option<Adjustment> {
    let requested = config.redis.pool_size;
    if (POOL_SIZE_MIN..=POOL_SIZE_MAX).contains(&requested) {
        return None;
    }
    config.redis.pool_size = POOL_SIZE_FALLBACK;
    Some(Adjustment {
        field: "redis::poolsize",
        from: requested,
        to: POOL_SIZE_FALLBACK,
    })
}

/// Run every check and clamp in startup order, without side effects.
pub fn normalize(
    mut config: ProxyConfig,
    available_cpus: usize,
) -> Result<(ProxyConfig, Vec<Adjustment>), ValidationError> {
    check_name(&config)?;
    check_port(&config)?;

    let adjustments = [
        clamp_cpu(&mut config, available_cpus),
        clamp_max_connections(&mut config),
        clamp_pool_size(&mut config),
    ]
    .into_iter()
    .flatten()
    .collect();

    Ok((config, adjustments))
}
