//! End-to-end bootstrap scenarios: INI file → load → apply.

use std::time::Duration;

use cluster_proxy::config::{load_config, ProxyConfig, ValidationError};
use cluster_proxy::diagnostics::DIAGNOSTICS_ADDR;
use cluster_proxy::lifecycle::{apply_runtime_settings, bootstrap, StartupError};
use tracing::level_filters::LevelFilter;

mod common;
use common::{capture_logs, write_ini, Call, RecordingRuntime};

fn load(contents: &str) -> ProxyConfig {
    let dir = tempfile::tempdir().unwrap();
    let path = write_ini(dir.path(), contents);
    load_config(&path).unwrap()
}

#[test]
fn test_minimal_file_gets_defaults() {
    let config = load("[proxy]\nname = p1\nport = 6380\n");
    let mut runtime = RecordingRuntime::with_cpus(4);

    let bootstrap = apply_runtime_settings(config, &mut runtime).unwrap();
    let config = bootstrap.config;

    assert_eq!(config.proxy.max_connections, 4000);
    assert_eq!(config.redis.pool_size, 10);
    assert_eq!(config.redis.slot_reload_interval, Duration::from_secs(600));
    assert_eq!(config.timeouts.idle, Duration::from_secs(30));
    assert!(config.redis.nodes.is_empty());
    assert!(bootstrap.adjustments.is_empty());
    assert!(!bootstrap.guard.is_profiling());
}

#[test]
fn test_oversized_pool_is_reset_with_warning() {
    let config = load("[proxy]\nname = p1\nport = 6380\n\n[redis]\npoolsize = 50\n");
    let mut runtime = RecordingRuntime::with_cpus(4);

    let (bootstrap, logs) = capture_logs(|| apply_runtime_settings(config, &mut runtime));
    let bootstrap = bootstrap.unwrap();

    assert_eq!(bootstrap.config.proxy.port, 6380);
    assert_eq!(bootstrap.config.redis.pool_size, 10);
    assert_eq!(bootstrap.adjustments.len(), 1);
    assert_eq!(bootstrap.adjustments[0].field, "redis::poolsize");
    assert_eq!(bootstrap.adjustments[0].from, 50);
    assert_eq!(bootstrap.adjustments[0].to, 10);

    let warnings = logs.lines("WARN", "redis::poolsize");
    assert_eq!(warnings.len(), 1, "{}", logs.contents());
    assert!(warnings[0].contains("from=50"));
    assert!(warnings[0].contains("to=10"));
}

#[test]
fn test_unbounded_values_do_not_fail_startup() {
    let config = load("[proxy]\nname = p1\nport = 70000\nmaxconn = -5\nconcurrency = -1\n\n[common]\nidletimeout = -1\n");
    let mut runtime = RecordingRuntime::with_cpus(4);

    let bootstrap = apply_runtime_settings(config, &mut runtime).unwrap();

    assert_eq!(bootstrap.config.proxy.port, 70_000);
    assert_eq!(bootstrap.config.proxy.max_connections, -5);
    assert_eq!(bootstrap.config.proxy.concurrency, -1);
    assert_eq!(bootstrap.config.timeouts.idle, Duration::ZERO);
    assert!(bootstrap.adjustments.is_empty());
}

#[test]
fn test_missing_name_is_fatal_before_clamping() {
    let config = load("[proxy]\nport = 6380\nmaxconn = 50000\n");
    let mut runtime = RecordingRuntime::with_cpus(4);

    let err = apply_runtime_settings(config, &mut runtime).unwrap_err();

    assert!(matches!(err, StartupError::Validation(ValidationError::MissingName)));
    assert!(err.to_string().contains("proxy::name"));
    assert!(!err.precedes_logging());
    assert_eq!(
        runtime.calls,
        vec![Call::InitLogging {
            level: LevelFilter::INFO,
            file: None
        }]
    );
}

#[test]
fn test_zero_port_is_fatal() {
    let config = load("[proxy]\nname = p1\n");
    let mut runtime = RecordingRuntime::with_cpus(4);

    let err = apply_runtime_settings(config, &mut runtime).unwrap_err();

    assert!(matches!(err, StartupError::Validation(ValidationError::ZeroPort)));
    assert!(!runtime.called(|c| matches!(c, Call::SetParallelism(_))));
    assert!(!runtime.called(|c| matches!(c, Call::SpawnDiagnostics(_))));
}

#[test]
fn test_cpu_clamped_to_available_and_applied() {
    let config = load("[proxy]\nname = p1\nport = 6380\ncpu = 8\n");
    let mut runtime = RecordingRuntime::with_cpus(2);

    let bootstrap = apply_runtime_settings(config, &mut runtime).unwrap();

    assert_eq!(bootstrap.config.proxy.cpu, 2);
    assert_eq!(bootstrap.adjustments[0].field, "proxy::cpu");
    assert_eq!(bootstrap.adjustments[0].to, 2);
    assert!(runtime.called(|c| *c == Call::SetParallelism(2)));
}

#[test]
fn test_zero_cpu_is_passed_through() {
    let config = load("[proxy]\nname = p1\nport = 6380\n");
    let mut runtime = RecordingRuntime::with_cpus(2);

    apply_runtime_settings(config, &mut runtime).unwrap();

    assert!(runtime.called(|c| *c == Call::SetParallelism(0)));
}

#[test]
fn test_max_connections_capped() {
    let config = load("[proxy]\nname = p1\nport = 6380\nmaxconn = 25000\n");
    let mut runtime = RecordingRuntime::with_cpus(4);

    let bootstrap = apply_runtime_settings(config, &mut runtime).unwrap();

    assert_eq!(bootstrap.config.proxy.max_connections, 10_000);
}

#[test]
fn test_side_effects_run_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let cpu = dir.path().join("cpu.prof");
    let mem = dir.path().join("mem.prof");
    let config = load(&format!(
        "[proxy]\nname = p1\nport = 6380\ncpu = 1\n\n[log]\nloglevel = debug\n\n[debug]\ncpufile = {}\nmemfile = {}\n",
        cpu.display(),
        mem.display()
    ));
    let mut runtime = RecordingRuntime::with_cpus(4);

    apply_runtime_settings(config, &mut runtime).unwrap();

    assert_eq!(
        runtime.calls,
        vec![
            Call::InitLogging {
                level: LevelFilter::DEBUG,
                file: None
            },
            Call::SetParallelism(1),
            Call::StartCpuProfile(cpu.clone()),
            Call::WriteHeapProfile,
            Call::SpawnDiagnostics(DIAGNOSTICS_ADDR),
        ]
    );
    assert!(cpu.exists());
    assert_eq!(std::fs::read_to_string(&mem).unwrap(), "{}\n");
}

#[test]
fn test_unwritable_cpu_profile_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let cpu = dir.path().join("missing").join("cpu.prof");
    let config = load(&format!(
        "[proxy]\nname = p1\nport = 6380\n\n[debug]\ncpufile = {}\n",
        cpu.display()
    ));
    let mut runtime = RecordingRuntime::with_cpus(4);

    let err = apply_runtime_settings(config, &mut runtime).unwrap_err();

    match err {
        StartupError::CpuProfile { path, .. } => assert_eq!(path, cpu),
        other => panic!("unexpected error: {other}"),
    }
    assert!(!runtime.called(|c| matches!(c, Call::StartCpuProfile(_))));
    assert!(!runtime.called(|c| matches!(c, Call::SpawnDiagnostics(_))));
}

#[test]
fn test_unwritable_heap_profile_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let mem = dir.path().join("missing").join("mem.prof");
    let config = load(&format!(
        "[proxy]\nname = p1\nport = 6380\n\n[debug]\nmemfile = {}\n",
        mem.display()
    ));
    let mut runtime = RecordingRuntime::with_cpus(4);

    let (bootstrap, logs) = capture_logs(|| apply_runtime_settings(config, &mut runtime));

    assert!(bootstrap.is_ok());
    assert!(!mem.exists());
    assert_eq!(logs.lines("WARN", "Cannot create heap profile").len(), 1);
    assert!(!runtime.called(|c| *c == Call::WriteHeapProfile));
    assert!(runtime.called(|c| matches!(c, Call::SpawnDiagnostics(_))));
}

#[test]
fn test_cpu_profile_written_when_guard_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let cpu = dir.path().join("cpu.prof");
    let config = load(&format!(
        "[proxy]\nname = p1\nport = 6380\n\n[debug]\ncpufile = {}\n",
        cpu.display()
    ));
    let mut runtime = RecordingRuntime::profiling();

    let bootstrap = apply_runtime_settings(config, &mut runtime).unwrap();

    // Still sampling after bootstrap returns; nothing written yet.
    assert!(bootstrap.guard.is_profiling());
    assert_eq!(std::fs::metadata(&cpu).unwrap().len(), 0);

    drop(bootstrap);
    assert!(std::fs::metadata(&cpu).unwrap().len() > 0);
}

#[test]
fn test_log_sink_failure_is_fatal() {
    let config = load("[proxy]\nname = p1\nport = 6380\n\n[log]\nlogfile = /tmp/proxy.log\n");
    let mut runtime = RecordingRuntime::failing_logging();

    let err = apply_runtime_settings(config, &mut runtime).unwrap_err();

    assert!(matches!(err, StartupError::Logging { .. }));
    assert!(err.precedes_logging());
    assert!(err.to_string().contains("/tmp/proxy.log"));
    assert_eq!(runtime.calls.len(), 1);
}

#[test]
fn test_unknown_level_falls_back_to_info() {
    let config = load("[proxy]\nname = p1\nport = 6380\n\n[log]\nloglevel = chatty\n");
    let mut runtime = RecordingRuntime::with_cpus(4);

    let bootstrap = apply_runtime_settings(config, &mut runtime).unwrap();

    assert_eq!(bootstrap.config.log.level, "chatty");
    assert_eq!(
        runtime.calls[0],
        Call::InitLogging {
            level: LevelFilter::INFO,
            file: None
        }
    );
}

#[test]
fn test_missing_config_file_is_fatal() {
    let dir = tempfile::tempdir().unwrap();

    let err = bootstrap(&dir.path().join("absent.ini")).unwrap_err();

    assert!(matches!(err, StartupError::Config(_)));
    assert!(err.precedes_logging());
}

#[test]
fn test_nodes_keep_order() {
    let config = load("[proxy]\nname = p1\nport = 6380\n\n[redis]\nnodes = 10.0.0.2:7000   10.0.0.1:7000 10.0.0.3:7000\n");
    let mut runtime = RecordingRuntime::with_cpus(4);

    let bootstrap = apply_runtime_settings(config, &mut runtime).unwrap();

    assert_eq!(
        bootstrap.config.redis.nodes,
        vec!["10.0.0.2:7000", "10.0.0.1:7000", "10.0.0.3:7000"]
    );
}
