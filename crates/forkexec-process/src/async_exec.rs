//! Async adapter over the blocking executor.

use crate::execute::Executor;
use crate::outcome::ExitOutcome;
use forkexec_common::{ProcessError, ProcessResult};

impl Executor {
    /// Run [`Executor::execute`] on tokio's blocking pool.
    ///
    /// The wait still blocks a pool thread for the child's whole lifetime.
    pub async fn execute_async<S: AsRef<str>>(
        &self,
        command: &str,
        args: &[S],
    ) -> ProcessResult<ExitOutcome> {
        let executor = self.clone();
        let command = command.to_string();
        let label = command.clone();
        let args: Vec<String> = args.iter().map(|arg| arg.as_ref().to_string()).collect();

        tokio::task::spawn_blocking(move || executor.execute(&command, &args))
            .await
            .map_err(|e| ProcessError::task_panic(label, e.to_string()))
    }
}
