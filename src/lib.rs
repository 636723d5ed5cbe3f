//! Startup configuration for the cluster proxy.
//!
//! Loads the INI config, validates and clamps it, and applies it to the
//! process once: log sink, scheduler parallelism, profiling and the
//! diagnostics endpoint.

pub mod config;
pub mod diagnostics;
pub mod lifecycle;
pub mod observability;

pub use config::ProxyConfig;
pub use lifecycle::{bootstrap, Bootstrap, RuntimeGuard, StartupError};
