//! The handle returned by [`crate::dispatcher::Dispatcher::execute_async`]
//! and `resume_async` (§6).

use loom_core::ExecutionId;
use tokio_util::sync::CancellationToken;

use crate::dispatcher::DispatchResult;

/// A running (or finished) asynchronous execution. Dropping this without
/// calling [`ExecutionHandle::join`] does not cancel the execution — it
/// keeps running to completion on its own spawned task.
pub struct ExecutionHandle {
    execution_id: ExecutionId,
    cancel_token: CancellationToken,
    join: tokio::task::JoinHandle<DispatchResult>,
}

impl ExecutionHandle {
    pub(crate) fn new(
        execution_id: ExecutionId,
        cancel_token: CancellationToken,
        join: tokio::task::JoinHandle<DispatchResult>,
    ) -> Self {
        Self {
            execution_id,
            cancel_token,
            join,
        }
    }

    #[must_use]
    pub fn execution_id(&self) -> &ExecutionId {
        &self.execution_id
    }

    /// Set the cooperative cancel flag (§4.5, §5). In-flight node bodies
    /// keep running to completion; no new bodies are invoked afterward.
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    /// Wait for the execution to finish and collect its result.
    ///
    /// # Panics
    /// Panics if the underlying task panicked rather than completing, to
    /// surface a programmer error in an executor rather than hide it as a
    /// silently-failed execution.
    pub async fn join(self) -> DispatchResult {
        self.join.await.expect("dispatcher task panicked")
    }
}
