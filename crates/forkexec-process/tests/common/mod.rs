//! Shared helpers for the executor integration tests.

#![allow(dead_code)]

use forkexec_process::{Executor, ExecutorConfig, LaunchBackend, MemorySink};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Every backend available on this platform.
pub fn backends() -> Vec<LaunchBackend> {
    [LaunchBackend::Spawn, LaunchBackend::ForkExec]
        .into_iter()
        .filter(|backend| backend.is_supported())
        .collect()
}

/// Executor for `config` whose diagnostics land in the returned sink.
pub fn executor_with(config: ExecutorConfig) -> (Executor, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    let executor = Executor::new(config).with_diagnostics(sink.clone());
    (executor, sink)
}

pub fn executor(backend: LaunchBackend) -> (Executor, Arc<MemorySink>) {
    executor_with(ExecutorConfig::default().with_backend(backend))
}

/// Shell snippet that publishes its own pid to `path` atomically, then
/// becomes `sleep 30` under the same pid.
pub fn pid_publishing_script(path: &Path) -> String {
    let tmp = path.with_extension("tmp");
    format!(
        "echo $$ > '{}' && mv '{}' '{}' && exec sleep 30",
        tmp.display(),
        tmp.display(),
        path.display()
    )
}

/// Poll until `path` holds a pid.
pub fn wait_for_pid_file(path: &Path, timeout: Duration) -> u32 {
    let deadline = Instant::now() + timeout;
    loop {
        if let Ok(content) = std::fs::read_to_string(path) {
            if let Ok(pid) = content.trim().parse() {
                return pid;
            }
        }
        assert!(
            Instant::now() < deadline,
            "pid file {} never appeared",
            path.display()
        );
        std::thread::sleep(Duration::from_millis(10));
    }
}
