//! Structured exit outcome of one invocation.
//!
//! [`ExitOutcome`] is the fine-grained result. Callers that only want the
//! shell convention (0 is success, anything else failure) collapse it with
//! [`ExitOutcome::shell_status`], which folds both launch failures and
//! abnormal terminations into [`SHELL_FAILURE_STATUS`].

use forkexec_common::{LaunchError, SHELL_FAILURE_STATUS};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why no target program ran to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LaunchFailureKind {
    /// Rejected before any child existed (empty command, interior NUL).
    InvalidCommand,
    /// The child process could not be created.
    Creation,
    /// The child was created but exec of the target failed; the child exited
    /// with the exec-failure code and has been reaped.
    ImageReplacement,
}

impl From<&LaunchError> for LaunchFailureKind {
    fn from(err: &LaunchError) -> Self {
        match err {
            LaunchError::InvalidCommand { .. } => Self::InvalidCommand,
            LaunchError::CreationFailed { .. } => Self::Creation,
            LaunchError::ImageReplacementFailed { .. } => Self::ImageReplacement,
        }
    }
}

impl fmt::Display for LaunchFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCommand => write!(f, "invalid_command"),
            Self::Creation => write!(f, "creation"),
            Self::ImageReplacement => write!(f, "image_replacement"),
        }
    }
}

/// Terminal outcome of one `execute` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitOutcome {
    /// The child exited on its own with this code (0-255 on Unix).
    Normal(i32),
    /// The child was killed by a signal or otherwise ended without an exit code.
    Abnormal {
        signal: Option<i32>,
        core_dumped: bool,
    },
    /// The target program never ran.
    LaunchFailure(LaunchFailureKind),
}

impl ExitOutcome {
    /// Shell-style status: the exit code for a normal exit, `-1` otherwise.
    ///
    /// This deliberately loses the difference between a launch failure and an
    /// abnormal termination.
    pub fn shell_status(&self) -> i32 {
        match self {
            Self::Normal(code) => *code,
            Self::Abnormal { .. } | Self::LaunchFailure(_) => SHELL_FAILURE_STATUS,
        }
    }

    /// True only for `Normal(0)`.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Normal(0))
    }

    /// Exit code of a normal termination.
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::Normal(code) => Some(*code),
            _ => None,
        }
    }

    /// Terminating signal of an abnormal termination, if known.
    pub fn signal(&self) -> Option<i32> {
        match self {
            Self::Abnormal { signal, .. } => *signal,
            _ => None,
        }
    }
}

impl From<ExitOutcome> for i32 {
    fn from(outcome: ExitOutcome) -> Self {
        outcome.shell_status()
    }
}

impl fmt::Display for ExitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal(code) => write!(f, "exited with code {}", code),
            Self::Abnormal {
                signal: Some(signal),
                core_dumped,
            } => {
                write!(f, "killed by {}", signal_name(*signal))?;
                if *core_dumped {
                    write!(f, " (core dumped)")?;
                }
                Ok(())
            }
            Self::Abnormal { signal: None, .. } => write!(f, "terminated without an exit code"),
            Self::LaunchFailure(kind) => write!(f, "launch failure ({})", kind),
        }
    }
}

/// Human-readable name for a signal number, e.g. `SIGKILL`.
pub fn signal_name(signal: i32) -> String {
    #[cfg(unix)]
    {
        match nix::sys::signal::Signal::try_from(signal) {
            Ok(sig) => sig.as_str().to_string(),
            Err(_) => format!("signal {}", signal),
        }
    }

    #[cfg(not(unix))]
    {
        format!("signal {}", signal)
    }
}
