//! Exactly one child exists while an invocation runs.
//!
//! Kept in its own test binary so no other test spawns children of this
//! process concurrently.

#![cfg(target_os = "linux")]

mod common;

use common::{backends, executor, pid_publishing_script, wait_for_pid_file};
use forkexec_process::force_kill;
use std::time::Duration;

/// Pids of the live children of this test process, read from `/proc`.
fn children_of_self() -> Vec<u32> {
    let me = std::process::id();
    let mut children = Vec::new();

    for entry in std::fs::read_dir("/proc").unwrap().flatten() {
        let Ok(pid) = entry.file_name().to_string_lossy().parse::<u32>() else {
            continue;
        };
        // The process may exit between readdir and read.
        let Ok(stat) = std::fs::read_to_string(entry.path().join("stat")) else {
            continue;
        };
        // comm may contain spaces and parens; fields resume after the last ')'.
        let Some((_, rest)) = stat.rsplit_once(')') else {
            continue;
        };
        let mut fields = rest.split_whitespace();
        let _state = fields.next();
        if fields.next().and_then(|ppid| ppid.parse::<u32>().ok()) == Some(me) {
            children.push(pid);
        }
    }

    children
}

#[test]
fn test_one_child_per_invocation() {
    for backend in backends() {
        assert!(children_of_self().is_empty(), "stray children before run");

        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("child.pid");
        let script = pid_publishing_script(&pid_file);

        let (executor, _sink) = executor(backend);
        let runner = std::thread::spawn(move || {
            executor.execute_detailed("sh", &["sh", "-c", script.as_str()])
        });

        let pid = wait_for_pid_file(&pid_file, Duration::from_secs(10));
        assert_eq!(children_of_self(), vec![pid], "backend {}", backend);

        force_kill(pid).unwrap();
        let record = runner.join().unwrap();
        assert_eq!(record.pid, Some(pid));
        assert!(
            children_of_self().is_empty(),
            "child left behind, backend {}",
            backend
        );
    }
}
