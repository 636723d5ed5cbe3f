//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events with structured fields
//!
//! logging.rs routes them to:
//!     → stdout (default)
//!     → a file rotated daily (log::logfile)
//! ```
//!
//! # Design Decisions
//! - The sink is installed once, before any validation warning is emitted
//! - Level comes from config; `RUST_LOG` wins when set

pub mod logging;
