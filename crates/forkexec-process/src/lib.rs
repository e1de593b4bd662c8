//! # forkexec process
//!
//! The fork-exec-wait primitive: create one child, replace its image with a
//! target program, block until it terminates and report how it ended.
//!
//! This crate provides:
//! - [`Executor`] and the [`execute`] / [`execute_command`] shortcuts
//! - Two launch backends (platform spawn, explicit fork + exec)
//! - An explicit diagnostic sink instead of writes to a global stream
//! - An optional deadline with SIGTERM/SIGKILL escalation
//! - Process termination and existence checks
//!
//! ```rust,no_run
//! use forkexec_process::{ExitOutcome, Executor, ExecutorConfig, LaunchBackend};
//!
//! let executor = Executor::new(ExecutorConfig::default().with_backend(LaunchBackend::ForkExec));
//! match executor.execute("false", &["false"]) {
//!     ExitOutcome::Normal(code) => println!("exit code {}", code),
//!     other => println!("{}", other),
//! }
//! ```

pub mod async_exec;
pub mod config;
pub mod diagnostics;
pub mod execute;
pub mod launch;
pub mod logging;
pub mod outcome;
pub mod state;
pub mod validation;

#[cfg(unix)]
pub mod check;
#[cfg(unix)]
pub mod terminate;

#[cfg(unix)]
mod fork_exec;
mod wait;

// Re-export main types
pub use config::{DiagnosticsTarget, ExecutorConfig};
pub use diagnostics::{
    Diagnostic, DiagnosticKind, DiagnosticSink, MemorySink, StderrSink, TracingSink,
};
pub use execute::{execute, execute_command, ExecutionRecord, Executor};
pub use launch::LaunchBackend;
pub use logging::init_logging;
pub use outcome::{signal_name, ExitOutcome, LaunchFailureKind};
pub use state::{ExecutionState, StateTransition, TerminationKind};
pub use validation::validate_command;

#[cfg(unix)]
pub use check::*;
#[cfg(unix)]
pub use terminate::*;

pub use forkexec_common::{InvocationId, LaunchError, ProcessError, ProcessResult};
