//! Invocation state machine.
//!
//! ```text
//! NotStarted -> Created -> Terminated(Normal | Abnormal | ImageReplacementFailed)
//! NotStarted -> CreationFailed
//! ```
//!
//! `Created` is reachable exactly once and terminal states accept nothing.
//! The image-replaced sub-state lives in the child and is never observed here.

use chrono::{DateTime, Utc};
use forkexec_common::{InvocationId, ProcessError, ProcessResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a created child ended, as seen by the parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationKind {
    Normal,
    Abnormal,
    ImageReplacementFailed,
}

/// Lifecycle state of one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionState {
    NotStarted,
    Created,
    Terminated(TerminationKind),
    CreationFailed,
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionState::NotStarted => write!(f, "not_started"),
            ExecutionState::Created => write!(f, "created"),
            ExecutionState::Terminated(TerminationKind::Normal) => write!(f, "terminated(normal)"),
            ExecutionState::Terminated(TerminationKind::Abnormal) => {
                write!(f, "terminated(abnormal)")
            }
            ExecutionState::Terminated(TerminationKind::ImageReplacementFailed) => {
                write!(f, "terminated(image_replacement_failed)")
            }
            ExecutionState::CreationFailed => write!(f, "creation_failed"),
        }
    }
}

impl ExecutionState {
    /// Check if the invocation has reached a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionState::Terminated(_) | ExecutionState::CreationFailed
        )
    }

    /// Check if a transition from this state to `target` is allowed
    pub fn can_transition_to(&self, target: ExecutionState) -> bool {
        matches!(
            (self, target),
            (ExecutionState::NotStarted, ExecutionState::Created)
                | (ExecutionState::NotStarted, ExecutionState::CreationFailed)
                | (ExecutionState::Created, ExecutionState::Terminated(_))
        )
    }
}

/// A recorded state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTransition {
    pub from: ExecutionState,
    pub to: ExecutionState,
    pub timestamp: DateTime<Utc>,
}

/// Tracks the state of a single invocation and its transition history.
#[derive(Debug, Clone)]
pub struct ExecutionStateMachine {
    invocation: InvocationId,
    current: ExecutionState,
    history: Vec<StateTransition>,
}

impl ExecutionStateMachine {
    pub fn new(invocation: InvocationId) -> Self {
        Self {
            invocation,
            current: ExecutionState::NotStarted,
            history: Vec::new(),
        }
    }

    pub fn current(&self) -> ExecutionState {
        self.current
    }

    pub fn history(&self) -> &[StateTransition] {
        &self.history
    }

    /// Move to `target`, rejecting anything the lifecycle does not allow.
    pub fn transition_to(&mut self, target: ExecutionState) -> ProcessResult<()> {
        if !self.current.can_transition_to(target) {
            return Err(ProcessError::invalid_transition(
                self.invocation.to_string(),
                self.current.to_string(),
                target.to_string(),
            ));
        }

        self.history.push(StateTransition {
            from: self.current,
            to: target,
            timestamp: Utc::now(),
        });

        tracing::debug!(
            "Invocation {} transitioned from {} to {}",
            self.invocation,
            self.current,
            target
        );
        self.current = target;

        Ok(())
    }

    pub fn into_history(self) -> Vec<StateTransition> {
        self.history
    }
}
