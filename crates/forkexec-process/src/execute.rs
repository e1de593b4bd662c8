//! Process execution.
//!
//! [`Executor::execute`] creates exactly one child, turns it into the target
//! program, blocks until that child terminates and classifies how it ended.
//! Failures never escape as `Err` or panics: they become an [`ExitOutcome`]
//! plus a diagnostic on the executor's sink.

use crate::config::ExecutorConfig;
use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink};
use crate::launch;
use crate::outcome::{ExitOutcome, LaunchFailureKind};
use crate::state::{ExecutionState, ExecutionStateMachine, StateTransition, TerminationKind};
use crate::wait::{self, Termination};
use chrono::{DateTime, Utc};
use forkexec_common::{InvocationId, LaunchError};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, info_span};

/// Everything observed about one invocation.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionRecord {
    pub invocation: InvocationId,
    pub command: String,
    pub outcome: ExitOutcome,
    /// Pid of the child, if one was observed running.
    pub pid: Option<u32>,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    /// The configured deadline fired and the child was signalled.
    pub timed_out: bool,
    pub transitions: Vec<StateTransition>,
}

impl ExecutionRecord {
    pub fn final_state(&self) -> ExecutionState {
        self.transitions
            .last()
            .map(|t| t.to)
            .unwrap_or(ExecutionState::NotStarted)
    }
}

/// Runs commands with fork-exec-wait semantics.
///
/// Cheap to clone; clones share the diagnostic sink.
#[derive(Debug, Clone)]
pub struct Executor {
    config: ExecutorConfig,
    diagnostics: Arc<dyn DiagnosticSink>,
}

impl Default for Executor {
    fn default() -> Self {
        Self::new(ExecutorConfig::default())
    }
}

impl Executor {
    pub fn new(config: ExecutorConfig) -> Self {
        let diagnostics = config.diagnostics.sink();
        Self {
            config,
            diagnostics,
        }
    }

    /// Replace the diagnostic sink chosen by the config.
    pub fn with_diagnostics(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = sink;
        self
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Run `command` with `args` (argument zero included) and wait for it.
    ///
    /// An empty `args` is treated as `[command]`.
    pub fn execute<S: AsRef<str>>(&self, command: &str, args: &[S]) -> ExitOutcome {
        self.execute_detailed(command, args).outcome
    }

    /// Shell-style variant: the exit code, or `-1` for anything abnormal.
    pub fn execute_status<S: AsRef<str>>(&self, command: &str, args: &[S]) -> i32 {
        self.execute(command, args).shell_status()
    }

    /// Like [`execute`](Self::execute) but returns the full record.
    pub fn execute_detailed<S: AsRef<str>>(&self, command: &str, args: &[S]) -> ExecutionRecord {
        let invocation = InvocationId::next();
        let span = info_span!("execute", invocation = %invocation, command);
        let _guard = span.enter();

        let started_at = Utc::now();
        let clock = Instant::now();
        let mut state = ExecutionStateMachine::new(invocation);
        let mut pid = None;
        let mut timed_out = false;

        let outcome = match launch::launch(self.config.backend, command, args) {
            Ok(mut child) => {
                advance(&mut state, ExecutionState::Created);
                let child_pid = child.pid();
                pid = Some(child_pid);
                info!(pid = child_pid, backend = %self.config.backend, "Spawned child process");

                let waited = match self.config.wait_timeout {
                    None => child.wait().map(|termination| (termination, false)),
                    Some(limit) => {
                        wait::wait_with_deadline(&mut child, limit, self.config.kill_grace_period)
                    }
                };

                match waited {
                    Ok((termination, expired)) => {
                        timed_out = expired;
                        if expired {
                            self.report(
                                DiagnosticKind::Timeout,
                                invocation,
                                command,
                                format!(
                                    "child {} exceeded its {:?} deadline and was terminated",
                                    child_pid,
                                    self.config.wait_timeout.unwrap_or_default()
                                ),
                            );
                        }
                        self.finish(&mut state, invocation, command, child_pid, termination)
                    }
                    Err(e) => {
                        error!(pid = child_pid, "{}", wait::wait_error(child_pid, &e));
                        self.report(DiagnosticKind::WaitFailure, invocation, command, e.to_string());
                        advance(&mut state, ExecutionState::Terminated(TerminationKind::Abnormal));
                        ExitOutcome::Abnormal {
                            signal: None,
                            core_dumped: false,
                        }
                    }
                }
            }
            Err(err) => self.launch_failed(&mut state, invocation, command, &err),
        };

        let elapsed = clock.elapsed();
        info!(outcome = %outcome, ?elapsed, "Invocation finished");

        ExecutionRecord {
            invocation,
            command: command.to_string(),
            outcome,
            pid,
            started_at,
            elapsed,
            timed_out,
            transitions: state.into_history(),
        }
    }

    fn finish(
        &self,
        state: &mut ExecutionStateMachine,
        invocation: InvocationId,
        command: &str,
        pid: u32,
        termination: Termination,
    ) -> ExitOutcome {
        let outcome = termination.into_outcome();

        match outcome {
            ExitOutcome::Normal(code) => {
                debug!(pid, code, "Child exited normally");
                advance(state, ExecutionState::Terminated(TerminationKind::Normal));
            }
            _ => {
                self.report(
                    DiagnosticKind::AbnormalTermination,
                    invocation,
                    command,
                    format!("child {} {}", pid, outcome),
                );
                advance(state, ExecutionState::Terminated(TerminationKind::Abnormal));
            }
        }

        outcome
    }

    fn launch_failed(
        &self,
        state: &mut ExecutionStateMachine,
        invocation: InvocationId,
        command: &str,
        err: &LaunchError,
    ) -> ExitOutcome {
        let kind = LaunchFailureKind::from(err);
        debug!(%kind, "Launch failed: {}", err);

        let diagnostic = match kind {
            LaunchFailureKind::ImageReplacement => {
                // The child existed and has already been reaped.
                advance(state, ExecutionState::Created);
                advance(
                    state,
                    ExecutionState::Terminated(TerminationKind::ImageReplacementFailed),
                );
                DiagnosticKind::ImageReplacementFailure
            }
            LaunchFailureKind::Creation => {
                advance(state, ExecutionState::CreationFailed);
                DiagnosticKind::CreationFailure
            }
            LaunchFailureKind::InvalidCommand => {
                advance(state, ExecutionState::CreationFailed);
                DiagnosticKind::InvalidCommand
            }
        };

        self.report(diagnostic, invocation, command, err.reason());
        ExitOutcome::LaunchFailure(kind)
    }

    fn report(
        &self,
        kind: DiagnosticKind,
        invocation: InvocationId,
        command: &str,
        detail: impl Into<String>,
    ) {
        self.diagnostics.report(&Diagnostic {
            kind,
            invocation,
            command: command.to_string(),
            detail: detail.into(),
        });
    }
}

fn advance(state: &mut ExecutionStateMachine, to: ExecutionState) {
    if let Err(e) = state.transition_to(to) {
        error!("{}", e);
    }
}

/// Run `command` with a default executor (spawn backend, stderr diagnostics).
///
/// ```rust,no_run
/// use forkexec_process::{execute, ExitOutcome};
///
/// assert_eq!(execute("echo", &["echo", "Hello"]), ExitOutcome::Normal(0));
/// ```
pub fn execute<S: AsRef<str>>(command: &str, args: &[S]) -> ExitOutcome {
    Executor::default().execute(command, args)
}

/// Shell-style [`execute`]: the exit code, or `-1` on launch failure or
/// abnormal termination.
pub fn execute_command<S: AsRef<str>>(command: &str, args: &[S]) -> i32 {
    execute(command, args).shell_status()
}
