//! Process collaborators used during bootstrap.
//!
//! `RuntimeHooks` is everything the bootstrap sequence does to the process:
//! logging, CPU tuning, profiling and the diagnostics endpoint.
//! `SystemRuntime` performs it for real; tests substitute a recorder.

use std::fs::File;
use std::io;
use std::net::SocketAddr;
use std::path::Path;

use tracing::level_filters::LevelFilter;

use crate::diagnostics::{heap, profiler::CpuProfile, server, ProfilerError};
use crate::lifecycle::scheduler;
use crate::observability::logging::{self, LogGuard, LoggingError};

pub trait RuntimeHooks {
    /// Install the global log sink.
    fn init_logging(&mut self, level: LevelFilter, file: Option<&Path>) -> Result<LogGuard, LoggingError>;

    /// Logical CPUs available to the process.
    fn available_cpus(&self) -> usize;

    /// Apply the scheduler parallelism (0 keeps the default).
    fn set_parallelism(&mut self, threads: usize);

    /// Begin CPU sampling into an already created file.
    fn start_cpu_profile(&mut self, file: File, path: &Path) -> Result<Option<CpuProfile>, ProfilerError>;

    /// Write one heap snapshot into an already created file.
    fn write_heap_profile(&mut self, file: File) -> io::Result<()>;

    /// Launch the diagnostics endpoint in the background.
    fn spawn_diagnostics(&mut self, addr: SocketAddr);
}

/// The real process.
#[derive(Debug, Default)]
pub struct SystemRuntime;

impl RuntimeHooks for SystemRuntime {
    fn init_logging(&mut self, level: LevelFilter, file: Option<&Path>) -> Result<LogGuard, LoggingError> {
        logging::init(level, file)
    }

    fn available_cpus(&self) -> usize {
        scheduler::available_cpus()
    }

    fn set_parallelism(&mut self, threads: usize) {
        scheduler::set_parallelism(threads);
    }

    fn start_cpu_profile(&mut self, file: File, path: &Path) -> Result<Option<CpuProfile>, ProfilerError> {
        CpuProfile::start(file, path).map(Some)
    }

    fn write_heap_profile(&mut self, file: File) -> io::Result<()> {
        heap::write_heap_profile(file)
    }

    fn spawn_diagnostics(&mut self, addr: SocketAddr) {
        server::spawn_detached(addr);
    }
}
