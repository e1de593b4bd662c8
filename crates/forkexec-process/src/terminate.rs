//! Process termination primitives.
//!
//! Used by the deadline path of the executor, and handy for harnesses that
//! need to kill a child mid-run.

use forkexec_common::{ProcessError, ProcessResult};
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;

/// Ask a process to terminate (SIGTERM).
pub fn terminate_gracefully(pid: u32) -> ProcessResult<()> {
    send_signal(pid, Signal::SIGTERM)
}

/// Force kill a process (SIGKILL).
pub fn force_kill(pid: u32) -> ProcessResult<()> {
    send_signal(pid, Signal::SIGKILL)
}

fn send_signal(pid: u32, signal: Signal) -> ProcessResult<()> {
    // 0 and anything that wraps negative would address a process group.
    let raw = i32::try_from(pid)
        .ok()
        .filter(|raw| *raw > 0)
        .ok_or_else(|| {
            ProcessError::signal_failed(pid.to_string(), signal.as_str(), "invalid pid")
        })?;

    kill(Pid::from_raw(raw), signal)
        .map_err(|e| ProcessError::signal_failed(pid.to_string(), signal.as_str(), e.to_string()))
}
