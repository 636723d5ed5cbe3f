//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Log sink → Validate → Clamp → Tune scheduler
//!         → Profiling → Diagnostics endpoint → RuntimeGuard
//!
//! Runtime (scheduler.rs):
//!     Configured parallelism → worker threads of the Tokio runtime
//!
//! Shutdown (signals.rs):
//!     SIGTERM/SIGINT → drop RuntimeGuard (CPU profile written, logs flushed)
//! ```
//!
//! # Design Decisions
//! - Bootstrap runs before any async runtime exists
//! - Process side effects go through `RuntimeHooks` so the sequence is testable
//! - Bootstrap is one-shot; calling it twice would start a second profiler

pub mod runtime;
pub mod scheduler;
pub mod signals;
pub mod startup;

pub use runtime::{RuntimeHooks, SystemRuntime};
pub use startup::{apply_runtime_settings, bootstrap, Bootstrap, RuntimeGuard, StartupError};
