//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::fs::File;
use std::io::{self, Write};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use cluster_proxy::diagnostics::{CpuProfile, ProfilerError};
use cluster_proxy::lifecycle::RuntimeHooks;
use cluster_proxy::observability::logging::{LogGuard, LoggingError};
use tracing::level_filters::LevelFilter;

/// A process side effect requested during bootstrap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    InitLogging { level: LevelFilter, file: Option<PathBuf> },
    SetParallelism(usize),
    StartCpuProfile(PathBuf),
    WriteHeapProfile,
    SpawnDiagnostics(SocketAddr),
}

/// Runtime that records every hook call instead of touching the process.
#[derive(Debug)]
pub struct RecordingRuntime {
    pub cpus: usize,
    pub fail_logging: bool,
    /// Start a real sampler instead of only recording the request.
    pub profile_cpu: bool,
    pub calls: Vec<Call>,
}

impl RecordingRuntime {
    pub fn with_cpus(cpus: usize) -> Self {
        Self {
            cpus,
            fail_logging: false,
            profile_cpu: false,
            calls: Vec::new(),
        }
    }

    pub fn failing_logging() -> Self {
        Self {
            fail_logging: true,
            ..Self::with_cpus(4)
        }
    }

    pub fn profiling() -> Self {
        Self {
            profile_cpu: true,
            ..Self::with_cpus(4)
        }
    }

    pub fn called(&self, predicate: impl Fn(&Call) -> bool) -> bool {
        self.calls.iter().any(predicate)
    }
}

impl RuntimeHooks for RecordingRuntime {
    fn init_logging(&mut self, level: LevelFilter, file: Option<&Path>) -> Result<LogGuard, LoggingError> {
        self.calls.push(Call::InitLogging {
            level,
            file: file.map(Path::to_path_buf),
        });
        if self.fail_logging {
            return Err(LoggingError::InvalidPath(
                file.map(Path::to_path_buf).unwrap_or_default(),
            ));
        }
        Ok(LogGuard::none())
    }

    fn available_cpus(&self) -> usize {
        self.cpus
    }

    fn set_parallelism(&mut self, threads: usize) {
        self.calls.push(Call::SetParallelism(threads));
    }

    fn start_cpu_profile(&mut self, file: File, path: &Path) -> Result<Option<CpuProfile>, ProfilerError> {
        self.calls.push(Call::StartCpuProfile(path.to_path_buf()));
        if self.profile_cpu {
            return CpuProfile::start(file, path).map(Some);
        }
        Ok(None)
    }

    fn write_heap_profile(&mut self, mut file: File) -> io::Result<()> {
        self.calls.push(Call::WriteHeapProfile);
        file.write_all(b"{}\n")
    }

    fn spawn_diagnostics(&mut self, addr: SocketAddr) {
        self.calls.push(Call::SpawnDiagnostics(addr));
    }
}

/// Write an INI file into `dir` and return its path.
pub fn write_ini(dir: &Path, contents: &str) -> PathBuf {
    let path = dir.join("proxy.ini");
    std::fs::write(&path, contents).unwrap();
    path
}

/// In-memory log sink shared between a subscriber and the test.
#[derive(Debug, Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    /// Lines at `level` (e.g. "WARN") that mention `needle`.
    pub fn lines(&self, level: &str, needle: &str) -> Vec<String> {
        self.contents()
            .lines()
            .filter(|line| line.contains(level) && line.contains(needle))
            .map(str::to_string)
            .collect()
    }

    pub fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync {
        let buffer = self.clone();
        tracing_subscriber::fmt()
            .with_max_level(LevelFilter::TRACE)
            .with_ansi(false)
            .without_time()
            .with_writer(move || buffer.clone())
            .finish()
    }
}

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `f` with a subscriber that records into the returned buffer.
pub fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, LogBuffer) {
    let logs = LogBuffer::default();
    let result = tracing::subscriber::with_default(logs.subscriber(), f);
    (result, logs)
}
