//! Child creation.
//!
//! Two backends produce the same observable outcomes:
//!
//! - [`LaunchBackend::Spawn`] uses the platform spawn primitive
//!   (`std::process::Command`), which forks and execs internally and reports
//!   a failed exec back as a spawn error.
//! - [`LaunchBackend::ForkExec`] performs fork, execvp and waitpid explicitly
//!   (Unix only).

use crate::validation::validate_command;
use crate::wait::ChildHandle;
use forkexec_common::LaunchError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::process::Command;
use tracing::debug;

/// How the child is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LaunchBackend {
    #[default]
    Spawn,
    ForkExec,
}

impl LaunchBackend {
    /// Whether this backend can run on the current platform.
    pub fn is_supported(&self) -> bool {
        match self {
            LaunchBackend::Spawn => true,
            LaunchBackend::ForkExec => cfg!(unix),
        }
    }
}

impl fmt::Display for LaunchBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaunchBackend::Spawn => write!(f, "spawn"),
            LaunchBackend::ForkExec => write!(f, "fork_exec"),
        }
    }
}

/// Create one child running `command` with `args` (argument zero included).
pub(crate) fn launch<S: AsRef<str>>(
    backend: LaunchBackend,
    command: &str,
    args: &[S],
) -> Result<ChildHandle, LaunchError> {
    validate_command(command, args)?;
    debug!(%backend, argc = args.len(), "Launching child");

    match backend {
        LaunchBackend::Spawn => spawn_child(command, args),
        #[cfg(unix)]
        LaunchBackend::ForkExec => {
            crate::fork_exec::fork_exec(command, args).map(ChildHandle::Forked)
        }
        #[cfg(not(unix))]
        LaunchBackend::ForkExec => Err(LaunchError::creation_failed(
            command,
            "fork_exec backend is only available on Unix",
            None,
        )),
    }
}

fn spawn_child<S: AsRef<str>>(command: &str, args: &[S]) -> Result<ChildHandle, LaunchError> {
    let mut cmd = Command::new(command);

    if let Some((arg0, rest)) = args.split_first() {
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.arg0(arg0.as_ref());
        }
        #[cfg(not(unix))]
        let _ = arg0;

        cmd.args(rest.iter().map(|arg| arg.as_ref()));
    }

    cmd.spawn()
        .map(ChildHandle::Spawned)
        .map_err(|e| classify_spawn_error(command, &e))
}

/// Split spawn errors into "no child could be created" and "the child could
/// not become the target".
pub(crate) fn classify_spawn_error(command: &str, err: &io::Error) -> LaunchError {
    match err.kind() {
        io::ErrorKind::WouldBlock | io::ErrorKind::OutOfMemory => {
            LaunchError::creation_failed(command, err.to_string(), err.raw_os_error())
        }
        _ => LaunchError::image_replacement_failed(command, err.to_string(), err.raw_os_error()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_spawn_errors() {
        let not_found = io::Error::from(io::ErrorKind::NotFound);
        assert!(matches!(
            classify_spawn_error("x", &not_found),
            LaunchError::ImageReplacementFailed { .. }
        ));

        let denied = io::Error::from(io::ErrorKind::PermissionDenied);
        assert!(matches!(
            classify_spawn_error("x", &denied),
            LaunchError::ImageReplacementFailed { .. }
        ));

        let exhausted = io::Error::from(io::ErrorKind::WouldBlock);
        assert!(matches!(
            classify_spawn_error("x", &exhausted),
            LaunchError::CreationFailed { .. }
        ));

        let oom = io::Error::from(io::ErrorKind::OutOfMemory);
        assert!(matches!(
            classify_spawn_error("x", &oom),
            LaunchError::CreationFailed { .. }
        ));
    }

    #[test]
    #[cfg(unix)]
    fn test_eagain_is_creation_failure() {
        let err = io::Error::from_raw_os_error(libc::EAGAIN);
        let launch = classify_spawn_error("ls", &err);
        assert_eq!(launch.errno(), Some(libc::EAGAIN));
        assert!(matches!(launch, LaunchError::CreationFailed { .. }));
    }

    #[test]
    fn test_backend_support_and_display() {
        assert!(LaunchBackend::Spawn.is_supported());
        assert_eq!(LaunchBackend::ForkExec.is_supported(), cfg!(unix));
        assert_eq!(LaunchBackend::default(), LaunchBackend::Spawn);
        assert_eq!(LaunchBackend::ForkExec.to_string(), "fork_exec");
    }

    #[test]
    #[cfg(unix)]
    fn test_launch_rejects_empty_command() {
        for backend in [LaunchBackend::Spawn, LaunchBackend::ForkExec] {
            let err = launch(backend, "", &["x"]).unwrap_err();
            assert!(matches!(err, LaunchError::InvalidCommand { .. }));
        }
    }
}
