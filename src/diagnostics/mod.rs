//! Runtime diagnostics subsystem.
//!
//! # Data Flow
//! ```text
//! debug::cpufile  → profiler.rs (session owned by RuntimeGuard, written at shutdown)
//! debug::memfile  → heap.rs (one snapshot at startup)
//! always          → server.rs (detached HTTP endpoint on :6061)
//! ```
//!
//! # Design Decisions
//! - Nothing here can fail startup except opening the CPU profile file
//! - The endpoint owns its thread and runtime; no handle is returned

pub mod heap;
pub mod profiler;
pub mod server;

pub use heap::{CountingAllocator, HeapSnapshot};
pub use profiler::{CpuProfile, ProfilerError};
pub use server::DIAGNOSTICS_ADDR;
