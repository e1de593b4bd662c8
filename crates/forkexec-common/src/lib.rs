//! # forkexec common
//!
//! Error types and identifiers shared by the forkexec crates.
//!
//! This crate holds the pieces every other crate builds upon: the launch and
//! process error enums and the small domain types used to correlate an
//! invocation across log lines and diagnostics.

pub mod errors;
pub mod types;

// Re-export commonly used items
pub use errors::{LaunchError, ProcessError, ProcessResult};
pub use types::{InvocationId, EXEC_FAILURE_EXIT_CODE, SHELL_FAILURE_STATUS};
