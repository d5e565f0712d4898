//! The `Executor` contract every node type implements (§4.4).

use async_trait::async_trait;
use loom_core::{LoomError, NodeType};
use loom_execution::{ExecutionContext, NodeResult};
use loom_graph::Node;

/// Where an executor's body is expected to run.
///
/// Script execution binds to a platform-thread assumption incompatible
/// with a cooperative-task runtime (§5, §9); everything else is safe to
/// run directly on the async runtime's task pool. [`crate::timeout::execute_with_timeout`]
/// uses this to route [`ExecutionMode::BlockingThread`] executors onto
/// `tokio::task::spawn_blocking` instead of polling them inline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    Async,
    BlockingThread,
}

/// A node type's execution logic. Implementations are registered once per
/// [`NodeType`] in an [`crate::factory::ExecutorFactory`] and invoked
/// through [`crate::timeout::execute_with_timeout`], never directly, so
/// the timeout and error-translation contract in §4.4 always applies.
#[async_trait]
pub trait Executor: Send + Sync {
    /// The node type this executor handles.
    fn supported_type(&self) -> NodeType;

    /// Where this executor's body should run (§5, §9). Defaults to
    /// [`ExecutionMode::Async`]; only the script sandbox overrides this.
    fn execution_mode(&self) -> ExecutionMode {
        ExecutionMode::Async
    }

    /// Run the node's body. `node.config` has already been resolved
    /// through the variable resolver by the caller (§4.4 step 1) — this
    /// sees literal values, no `{{...}}` templates.
    ///
    /// Returning `Err` is for unrecoverable setup failures (a malformed
    /// config key, say); everything retry-worthy should come back as a
    /// `NodeResult` with `status = FAILED` so the dispatcher's retry loop
    /// (§4.6) can inspect `error_message`.
    async fn execute(
        &self,
        node: &Node,
        context: &ExecutionContext,
    ) -> Result<NodeResult, LoomError>;
}
