//! The per-node execution loop (§4.5 "Per-node execution loop").

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use loom_execution::{ExecutionContext, NodeResult, NodeResultStatus};
use loom_executor::{execute_with_timeout, ExecutionMode, Executor, ExecutorFactory};
use loom_graph::Node;
use loom_retry::RetryPolicy;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Run one node to a terminal [`NodeResult`], retrying per `retry_policy`
/// until it succeeds, exhausts its retries, or the execution is cancelled.
///
/// Checks the cancellation flag before every attempt and makes the
/// inter-attempt sleep interruptible by it, per §4.5 and §5.
pub async fn run_node_with_retries(
    node: Node,
    context: Arc<ExecutionContext>,
    factory: Arc<ExecutorFactory>,
    retry_policy: RetryPolicy,
    cancel: CancellationToken,
) -> NodeResult {
    let node_retry_ceiling = (node.retry_count > 0).then_some(node.retry_count);
    let mut attempt = 0;

    loop {
        if cancel.is_cancelled() {
            let now = Utc::now();
            return NodeResult::failed(node.id.clone(), "Execution cancelled", now, now, attempt);
        }

        let executor = match factory.get(node.node_type) {
            Some(executor) => executor,
            None => {
                let now = Utc::now();
                return NodeResult::failed(
                    node.id.clone(),
                    format!("no executor registered for node type {}", node.node_type),
                    now,
                    now,
                    attempt,
                );
            }
        };

        let mut result = run_once(executor, &node, &context).await;
        result.retry_attempt = attempt;

        if result.status.is_success_like() || matches!(result.status, NodeResultStatus::Waiting) {
            return result;
        }

        let decision = retry_policy.should_retry(
            node_retry_ceiling,
            result.error_message.as_deref().unwrap_or_default(),
            attempt,
        );
        if !decision.retry {
            return result;
        }

        tokio::select! {
            () = tokio::time::sleep(Duration::from_millis(decision.delay_ms)) => {}
            () = cancel.cancelled() => {
                let now = Utc::now();
                return NodeResult::failed(node.id.clone(), "Execution cancelled", result.start_time, now, attempt);
            }
        }
        attempt += 1;
    }
}

/// Dispatch one invocation according to the executor's declared
/// [`ExecutionMode`]: `BlockingThread` executors (the script sandbox) run
/// on a dedicated OS thread via `spawn_blocking`, with the submitting task
/// awaiting completion (§5's "blocks the submitting worker on its
/// completion"); everything else polls inline on the shared pool.
async fn run_once(
    executor: Arc<dyn Executor>,
    node: &Node,
    context: &Arc<ExecutionContext>,
) -> NodeResult {
    match executor.execution_mode() {
        ExecutionMode::Async => execute_with_timeout(executor.as_ref(), node, context).await,
        ExecutionMode::BlockingThread => {
            let node_id = node.id.clone();
            let node = node.clone();
            let context = context.clone();
            let outcome = tokio::task::spawn_blocking(move || {
                tokio::runtime::Handle::current()
                    .block_on(execute_with_timeout(executor.as_ref(), &node, &context))
            })
            .await;
            match outcome {
                Ok(result) => result,
                Err(join_err) => {
                    let now = Utc::now();
                    warn!(node_id = %node_id, error = %join_err, "blocking executor task panicked");
                    NodeResult::failed(node_id, "blocking executor task panicked", now, now, 0)
                }
            }
        }
    }
}
