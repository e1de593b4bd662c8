//! Error types for forkexec.
//!
//! Launch failures are kept apart from the rest because callers of the
//! executor never see them as `Err`: they are folded into the structured
//! outcome. Everything else that can go wrong around a child (waiting,
//! signalling, state bookkeeping) is a [`ProcessError`].

use thiserror::Error;

/// Failure to get a child running the target program.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LaunchError {
    /// Rejected before any child was created.
    #[error("Invalid command: {reason}")]
    InvalidCommand { reason: String },

    /// The child process could not be created (resource exhaustion, limits).
    #[error("Process creation failed: {command} - {reason}")]
    CreationFailed {
        command: String,
        reason: String,
        errno: Option<i32>,
    },

    /// The child was created but could not become the target program.
    #[error("Image replacement failed: {command} - {reason}")]
    ImageReplacementFailed {
        command: String,
        reason: String,
        errno: Option<i32>,
    },
}

impl LaunchError {
    pub fn invalid_command(reason: impl Into<String>) -> Self {
        Self::InvalidCommand {
            reason: reason.into(),
        }
    }

    pub fn creation_failed(
        command: impl Into<String>,
        reason: impl Into<String>,
        errno: Option<i32>,
    ) -> Self {
        Self::CreationFailed {
            command: command.into(),
            reason: reason.into(),
            errno,
        }
    }

    pub fn image_replacement_failed(
        command: impl Into<String>,
        reason: impl Into<String>,
        errno: Option<i32>,
    ) -> Self {
        Self::ImageReplacementFailed {
            command: command.into(),
            reason: reason.into(),
            errno,
        }
    }

    /// OS error number behind the failure, when one is known.
    pub fn errno(&self) -> Option<i32> {
        match self {
            Self::InvalidCommand { .. } => None,
            Self::CreationFailed { errno, .. } | Self::ImageReplacementFailed { errno, .. } => {
                *errno
            }
        }
    }

    /// Short failure description without the command prefix.
    pub fn reason(&self) -> &str {
        match self {
            Self::InvalidCommand { reason }
            | Self::CreationFailed { reason, .. }
            | Self::ImageReplacementFailed { reason, .. } => reason,
        }
    }
}

/// Process-level errors raised around a running or finished child.
#[derive(Error, Debug, Clone)]
pub enum ProcessError {
    #[error("Wait failed: {id} - {reason}")]
    WaitFailed { id: String, reason: String },

    #[error("Signal delivery failed: {id} - {signal}: {reason}")]
    SignalFailed {
        id: String,
        signal: String,
        reason: String,
    },

    #[error("Invalid state transition: {id} - {from} -> {to}")]
    InvalidTransition { id: String, from: String, to: String },

    #[error("Process configuration error: {id} - {reason}")]
    Configuration { id: String, reason: String },

    #[error("Task panicked for invocation '{id}': {message}")]
    TaskPanic { id: String, message: String },
}

impl ProcessError {
    pub fn wait_failed(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::WaitFailed {
            id: id.into(),
            reason: reason.into(),
        }
    }

    pub fn signal_failed(
        id: impl Into<String>,
        signal: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::SignalFailed {
            id: id.into(),
            signal: signal.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_transition(
        id: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Self::InvalidTransition {
            id: id.into(),
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn configuration(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Configuration {
            id: id.into(),
            reason: reason.into(),
        }
    }

    pub fn task_panic(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TaskPanic {
            id: id.into(),
            message: message.into(),
        }
    }
}

/// Result type for process operations.
pub type ProcessResult<T> = std::result::Result<T, ProcessError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_error_accessors() {
        let err = LaunchError::image_replacement_failed("nope", "No such file or directory", Some(2));
        assert_eq!(err.errno(), Some(2));
        assert_eq!(err.reason(), "No such file or directory");
        assert_eq!(
            err.to_string(),
            "Image replacement failed: nope - No such file or directory"
        );

        let err = LaunchError::invalid_command("command is empty");
        assert_eq!(err.errno(), None);
        assert!(matches!(err, LaunchError::InvalidCommand { .. }));
    }

    #[test]
    fn test_process_error_construction() {
        let error = ProcessError::wait_failed("1234", "ECHILD");
        assert!(matches!(error, ProcessError::WaitFailed { .. }));
        assert_eq!(format!("{}", error), "Wait failed: 1234 - ECHILD");

        let error = ProcessError::invalid_transition("inv-1", "created", "created");
        assert!(format!("{}", error).contains("created -> created"));
    }
}
