//! CPU profiling.
//!
//! # Responsibilities
//! - Long-running sessions that write a profile when stopped
//! - Fixed-length captures for the diagnostics endpoint
//!
//! # Design Decisions
//! - Sampling is process-wide; only one session can run at a time
//! - Output is the pprof protobuf format, readable by `go tool pprof`

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use pprof::protos::Message;
use pprof::ProfilerGuard;
use thiserror::Error;

/// Samples per second.
pub const SAMPLE_FREQUENCY: i32 = 100;

#[derive(Debug, Error)]
pub enum ProfilerError {
    /// The sampler could not be started, usually because a session is
    /// already running.
    #[error("could not start profiler: {0}")]
    Start(#[source] pprof::Error),

    #[error("could not build profile: {0}")]
    Report(#[source] pprof::Error),

    #[error("failed to write profile: {0}")]
    Io(#[from] io::Error),
}

/// A running CPU profile that is written to its file on `stop`.
pub struct CpuProfile {
    guard: ProfilerGuard<'static>,
    file: File,
    path: PathBuf,
}

impl CpuProfile {
    /// Start sampling; the report goes to `file` when stopped.
    pub fn start(file: File, path: &Path) -> Result<Self, ProfilerError> {
        let guard = ProfilerGuard::new(SAMPLE_FREQUENCY).map_err(ProfilerError::Start)?;
        Ok(Self {
            guard,
            file,
            path: path.to_path_buf(),
        })
    }

    /// Stop sampling and write the profile.
    pub fn stop(self) -> Result<PathBuf, ProfilerError> {
        let CpuProfile {
            guard,
            mut file,
            path,
        } = self;

        let encoded = finish(guard)?;
        file.write_all(&encoded)?;
        file.flush()?;
        Ok(path)
    }
}

impl std::fmt::Debug for CpuProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpuProfile").field("path", &self.path).finish()
    }
}

/// Sample the CPU for `duration` and return the encoded profile.
///
/// Blocks the calling thread for the whole duration.
pub fn capture(duration: Duration) -> Result<Vec<u8>, ProfilerError> {
    let guard = ProfilerGuard::new(SAMPLE_FREQUENCY).map_err(ProfilerError::Start)?;
    std::thread::sleep(duration);
    finish(guard)
}

// Sampling stops when the guard is dropped.
fn finish(guard: ProfilerGuard<'static>) -> Result<Vec<u8>, ProfilerError> {
    let report = guard.report().build().map_err(ProfilerError::Report)?;
    drop(guard);

    let profile = report.pprof().map_err(ProfilerError::Report)?;
    let mut encoded = Vec::new();
    profile.write_to_vec(&mut encoded).map_err(io::Error::other)?;
    Ok(encoded)
}

/// Serializes tests that start the process-wide sampler.
#[cfg(test)]
pub(crate) static SAMPLER_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
