//! Waiting on a launched child.
//!
//! A [`ChildHandle`] is the parent's view of exactly one child, whichever
//! backend created it. Every wait targets that child's pid; nothing here ever
//! waits on "any child".

use crate::outcome::ExitOutcome;
use forkexec_common::{ProcessError, ProcessResult};
use std::io;
use std::process::{Child, ExitStatus};
use std::time::Duration;
use tracing::warn;
use wait_timeout::ChildExt;

#[cfg(unix)]
use crate::fork_exec::ForkedChild;

/// Raw termination status of a reaped child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Termination {
    Exited(i32),
    Signaled { signal: i32, core_dumped: bool },
    /// Ended without an exit code or signal we can name.
    Unknown,
}

impl Termination {
    pub(crate) fn into_outcome(self) -> ExitOutcome {
        match self {
            Termination::Exited(code) => ExitOutcome::Normal(code),
            Termination::Signaled {
                signal,
                core_dumped,
            } => ExitOutcome::Abnormal {
                signal: Some(signal),
                core_dumped,
            },
            Termination::Unknown => ExitOutcome::Abnormal {
                signal: None,
                core_dumped: false,
            },
        }
    }
}

impl From<ExitStatus> for Termination {
    fn from(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return Termination::Exited(code);
        }

        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return Termination::Signaled {
                    signal,
                    core_dumped: status.core_dumped(),
                };
            }
        }

        Termination::Unknown
    }
}

/// The parent's handle on one child.
#[derive(Debug)]
pub(crate) enum ChildHandle {
    Spawned(Child),
    #[cfg(unix)]
    Forked(ForkedChild),
}

impl ChildHandle {
    pub(crate) fn pid(&self) -> u32 {
        match self {
            ChildHandle::Spawned(child) => child.id(),
            #[cfg(unix)]
            ChildHandle::Forked(child) => child.pid(),
        }
    }

    /// Block until the child terminates and reap it.
    pub(crate) fn wait(&mut self) -> io::Result<Termination> {
        match self {
            ChildHandle::Spawned(child) => child.wait().map(Termination::from),
            #[cfg(unix)]
            ChildHandle::Forked(child) => child.wait(),
        }
    }

    /// Wait at most `timeout`; `None` means the child is still running.
    pub(crate) fn wait_timeout(&mut self, timeout: Duration) -> io::Result<Option<Termination>> {
        match self {
            ChildHandle::Spawned(child) => Ok(child.wait_timeout(timeout)?.map(Termination::from)),
            #[cfg(unix)]
            ChildHandle::Forked(child) => child.wait_timeout(timeout),
        }
    }

    /// Deliver SIGTERM (`force == false`) or SIGKILL to the child.
    pub(crate) fn terminate(&mut self, force: bool) -> ProcessResult<()> {
        #[cfg(unix)]
        {
            let pid = self.pid();
            if force {
                crate::terminate::force_kill(pid)
            } else {
                crate::terminate::terminate_gracefully(pid)
            }
        }

        #[cfg(not(unix))]
        {
            // No graceful request exists here; both steps kill.
            let _ = force;
            match self {
                ChildHandle::Spawned(child) => child
                    .kill()
                    .map_err(|e| ProcessError::signal_failed(child.id().to_string(), "kill", e.to_string())),
            }
        }
    }
}

/// Wait with a deadline, escalating SIGTERM then SIGKILL once it passes.
///
/// Returns the child's actual termination and whether the deadline fired. The
/// child is always reaped before this returns `Ok`.
pub(crate) fn wait_with_deadline(
    child: &mut ChildHandle,
    limit: Duration,
    grace: Duration,
) -> io::Result<(Termination, bool)> {
    let pid = child.pid();

    match child.wait_timeout(limit) {
        Ok(Some(termination)) => return Ok((termination, false)),
        Ok(None) => {}
        Err(e) => return Err(reap_after_error(child, e)),
    }

    warn!(pid, ?limit, "Child exceeded its deadline, sending SIGTERM");
    if let Err(e) = child.terminate(false) {
        warn!(pid, "Failed to request termination: {}", e);
    }

    match child.wait_timeout(grace) {
        Ok(Some(termination)) => return Ok((termination, true)),
        Ok(None) => {}
        Err(e) => return Err(reap_after_error(child, e)),
    }

    warn!(pid, ?grace, "Child outlived its grace period, sending SIGKILL");
    if let Err(e) = child.terminate(true) {
        warn!(pid, "Failed to kill child: {}", e);
    }

    match child.wait() {
        Ok(termination) => Ok((termination, true)),
        Err(e) => Err(reap_after_error(child, e)),
    }
}

/// Kill and reap a child whose deadline wait failed, then hand back the error.
fn reap_after_error(child: &mut ChildHandle, err: io::Error) -> io::Error {
    let pid = child.pid();
    warn!(pid, "Deadline wait failed, killing and reaping child: {}", err);

    if let Err(e) = child.terminate(true) {
        warn!(pid, "Failed to kill child: {}", e);
    }
    if let Err(e) = child.wait() {
        warn!(pid, "Failed to reap child: {}", e);
    }

    err
}

/// Map a failed wait to a process error for logging.
pub(crate) fn wait_error(pid: u32, err: &io::Error) -> ProcessError {
    ProcessError::wait_failed(pid.to_string(), err.to_string())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::process::Command;

    #[test]
    fn test_termination_into_outcome() {
        assert_eq!(Termination::Exited(3).into_outcome(), ExitOutcome::Normal(3));
        assert_eq!(
            Termination::Signaled {
                signal: 9,
                core_dumped: false
            }
            .into_outcome(),
            ExitOutcome::Abnormal {
                signal: Some(9),
                core_dumped: false
            }
        );
        assert_eq!(
            Termination::Unknown.into_outcome().signal(),
            None
        );
    }

    #[test]
    fn test_spawned_wait_timeout_returns_none_while_running() {
        let child = Command::new("sleep").arg("30").spawn().unwrap();
        let mut handle = ChildHandle::Spawned(child);

        assert_eq!(
            handle.wait_timeout(Duration::from_millis(50)).unwrap(),
            None
        );

        handle.terminate(true).unwrap();
        assert!(matches!(
            handle.wait().unwrap(),
            Termination::Signaled { .. }
        ));
    }

    #[test]
    fn test_failed_deadline_wait_still_reaps_child() {
        let child = Command::new("sleep").arg("30").spawn().unwrap();
        let mut handle = ChildHandle::Spawned(child);
        let pid = handle.pid();

        let err = reap_after_error(&mut handle, io::Error::other("waitpid interrupted"));

        assert_eq!(err.to_string(), "waitpid interrupted");
        assert!(!crate::check::process_exists(pid).unwrap());
    }

    #[test]
    fn test_huge_deadline_waits_for_exit() {
        let child = Command::new("sh").args(["-c", "exit 3"]).spawn().unwrap();
        let mut handle = ChildHandle::Spawned(child);

        let (termination, timed_out) =
            wait_with_deadline(&mut handle, Duration::MAX, Duration::MAX).unwrap();
        assert_eq!(termination, Termination::Exited(3));
        assert!(!timed_out);
    }

    #[test]
    fn test_deadline_not_hit_for_fast_child() {
        let child = Command::new("true").spawn().unwrap();
        let mut handle = ChildHandle::Spawned(child);

        let (termination, timed_out) =
            wait_with_deadline(&mut handle, Duration::from_secs(10), Duration::from_secs(1))
                .unwrap();
        assert_eq!(termination, Termination::Exited(0));
        assert!(!timed_out);
    }
}
