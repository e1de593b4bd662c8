//! Core domain types used throughout forkexec.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Exit code a child uses when it could not replace its image with the target.
pub const EXEC_FAILURE_EXIT_CODE: i32 = 1;

/// Sentinel returned by the coarse shell-style adapter for anything that is
/// not a normal exit.
pub const SHELL_FAILURE_STATUS: i32 = -1;

static NEXT_INVOCATION: AtomicU64 = AtomicU64::new(1);

/// Invocation identifier - correlates one `execute` call across log lines,
/// diagnostics and state transitions.
///
/// # Example
/// ```
/// use forkexec_common::InvocationId;
///
/// let first = InvocationId::next();
/// let second = InvocationId::next();
/// assert_ne!(first, second);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InvocationId(u64);

impl InvocationId {
    /// Allocates a fresh, process-wide unique id.
    pub fn next() -> Self {
        Self(NEXT_INVOCATION.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw numeric value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for InvocationId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for InvocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "inv-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_ids_are_monotonic() {
        let a = InvocationId::next();
        let b = InvocationId::next();
        assert!(b > a);
    }

    #[test]
    fn test_invocation_id_display() {
        let id = InvocationId::from(42);
        assert_eq!(id.to_string(), "inv-42");
        assert_eq!(id.as_u64(), 42);
    }
}
