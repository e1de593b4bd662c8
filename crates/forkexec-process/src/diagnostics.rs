//! Diagnostic side channel.
//!
//! The executor never writes to a process-wide error stream directly; it
//! reports through the [`DiagnosticSink`] it owns. The default sink writes
//! `perror`-style lines to standard error, tests swap in a [`MemorySink`].

use forkexec_common::InvocationId;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;

/// What went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    InvalidCommand,
    CreationFailure,
    ImageReplacementFailure,
    AbnormalTermination,
    WaitFailure,
    Timeout,
}

impl DiagnosticKind {
    /// Leading context of the rendered message.
    pub fn context(&self) -> &'static str {
        match self {
            DiagnosticKind::InvalidCommand => "invalid command",
            DiagnosticKind::CreationFailure => "fork failed",
            DiagnosticKind::ImageReplacementFailure => "exec() has failed",
            DiagnosticKind::AbnormalTermination => "child did not exit normally",
            DiagnosticKind::WaitFailure => "wait failed",
            DiagnosticKind::Timeout => "deadline exceeded",
        }
    }
}

/// A single diagnostic message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub invocation: InvocationId,
    pub command: String,
    pub detail: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.kind.context(), self.command, self.detail)
    }
}

/// Receives diagnostics from an executor.
pub trait DiagnosticSink: Send + Sync + fmt::Debug {
    fn report(&self, diagnostic: &Diagnostic);
}

/// Writes each diagnostic as one line on standard error.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrSink;

impl DiagnosticSink for StderrSink {
    fn report(&self, diagnostic: &Diagnostic) {
        let mut stderr = std::io::stderr().lock();
        // Nowhere left to report a failed stderr write.
        let _ = writeln!(stderr, "{}", diagnostic);
    }
}

/// Forwards diagnostics to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, diagnostic: &Diagnostic) {
        match diagnostic.kind {
            DiagnosticKind::Timeout => tracing::warn!(
                invocation = %diagnostic.invocation,
                kind = ?diagnostic.kind,
                "{}",
                diagnostic
            ),
            _ => tracing::error!(
                invocation = %diagnostic.invocation,
                kind = ?diagnostic.kind,
                "{}",
                diagnostic
            ),
        }
    }
}

/// Keeps every diagnostic in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<Diagnostic>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything reported so far.
    pub fn entries(&self) -> Vec<Diagnostic> {
        self.entries.lock().clone()
    }

    pub fn kinds(&self) -> Vec<DiagnosticKind> {
        self.entries.lock().iter().map(|d| d.kind).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl DiagnosticSink for MemorySink {
    fn report(&self, diagnostic: &Diagnostic) {
        self.entries.lock().push(diagnostic.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(kind: DiagnosticKind) -> Diagnostic {
        Diagnostic {
            kind,
            invocation: InvocationId::from(9),
            command: "nope".to_string(),
            detail: "No such file or directory (os error 2)".to_string(),
        }
    }

    #[test]
    fn test_display_matches_perror_style() {
        let d = sample(DiagnosticKind::ImageReplacementFailure);
        assert_eq!(
            d.to_string(),
            "exec() has failed: nope: No such file or directory (os error 2)"
        );
        assert!(sample(DiagnosticKind::CreationFailure)
            .to_string()
            .starts_with("fork failed: "));
    }

    #[test]
    fn test_memory_sink_collects() {
        let sink = MemorySink::new();
        assert!(sink.is_empty());

        sink.report(&sample(DiagnosticKind::AbnormalTermination));
        sink.report(&sample(DiagnosticKind::Timeout));

        assert_eq!(sink.len(), 2);
        assert_eq!(
            sink.kinds(),
            vec![DiagnosticKind::AbnormalTermination, DiagnosticKind::Timeout]
        );
        assert_eq!(sink.entries()[0].command, "nope");

        sink.clear();
        assert!(sink.is_empty());
    }
}
