//! `executeWithTimeout` (§4.4): timeout resolution, worker dispatch, and
//! translation of every outcome into a terminal [`NodeResult`].

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use loom_execution::{ExecutionContext, NodeResult};
use loom_expression::resolve_value;
use loom_graph::{InDegreeMap, Node};
use serde_json::Value;
use tracing::warn;

use crate::executor::Executor;

/// Resolve `node.config` through the variable resolver, then run `execute`
/// under the node's effective timeout (§4.4 steps 1 and the timeout wrap).
///
/// Always returns a `NodeResult` — never propagates an error. A timeout
/// produces a synthetic `TIMEOUT` result; an `Err` from `execute` is
/// translated into a `FAILED` result with `error_message` and `cause` set.
///
/// This function polls `execute` inline; it does not itself move script-mode
/// work onto a dedicated OS thread. `executor.execution_mode()` is metadata
/// the dispatcher's worker pool (§5) reads to decide whether to invoke this
/// function on the shared pool or hand the node to its bounded
/// `spawn_blocking` pool instead — the distinction has to live at the pool
/// level, since only the pool owns thread placement.
pub async fn execute_with_timeout(
    executor: &(dyn Executor + '_),
    node: &Node,
    context: &ExecutionContext,
) -> NodeResult {
    let start = Utc::now();
    let timeout_ms = node.effective_timeout_ms();
    let resolved_node = resolve_node_config(node, context);

    let outcome = tokio::time::timeout(
        Duration::from_millis(timeout_ms),
        executor.execute(&resolved_node, context),
    )
    .await;

    let end = Utc::now();
    match outcome {
        Ok(Ok(result)) => result,
        Ok(Err(err)) => {
            warn!(node_id = %node.id, error = %err, "node execution failed");
            NodeResult::failed(node.id.clone(), err.to_string(), start, end, 0)
        }
        Err(_elapsed) => NodeResult::timeout(node.id.clone(), timeout_ms, start, end, 0),
    }
}

/// Resolve every `{{...}}` template in `node.config` against `context`,
/// returning a copy of `node` with the resolved config (§4.4 step 1).
fn resolve_node_config(node: &Node, context: &ExecutionContext) -> Node {
    let resolved: HashMap<String, Value> = node
        .config
        .iter()
        .map(|(key, value)| (key.clone(), resolve_value(value, context)))
        .collect();
    Node {
        config: resolved,
        ..node.clone()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use loom_core::{LoomError, NodeId, NodeType, TenantId, WorkflowId};
    use tokio::time::sleep;

    use super::*;

    fn node(timeout_ms: u64) -> Node {
        Node {
            id: NodeId::new("a").unwrap(),
            node_type: NodeType::Log,
            name: "a".to_string(),
            config: HashMap::from([("msg".to_string(), Value::from("{{input.userId}}"))]),
            retry_count: 0,
            timeout_ms,
            enabled: true,
        }
    }

    fn ctx() -> ExecutionContext {
        ExecutionContext::new(
            loom_core::ExecutionId::new("wf-abcd1234").unwrap(),
            WorkflowId::new("wf").unwrap(),
            TenantId::new("acme").unwrap(),
            HashMap::from([("userId".to_string(), Value::from("u-1"))]),
            HashMap::new(),
            InDegreeMap::restore_from_snapshot(&HashMap::new()),
            Utc::now(),
        )
    }

    struct Instant;
    #[async_trait]
    impl Executor for Instant {
        fn supported_type(&self) -> NodeType {
            NodeType::Log
        }
        async fn execute(
            &self,
            node: &Node,
            _context: &ExecutionContext,
        ) -> Result<NodeResult, LoomError> {
            let now = Utc::now();
            let mut output = HashMap::new();
            output.insert("msg".to_string(), node.config["msg"].clone());
            Ok(NodeResult::success(node.id.clone(), output, now, now, 0))
        }
    }

    struct Slow;
    #[async_trait]
    impl Executor for Slow {
        fn supported_type(&self) -> NodeType {
            NodeType::Log
        }
        async fn execute(
            &self,
            node: &Node,
            _context: &ExecutionContext,
        ) -> Result<NodeResult, LoomError> {
            sleep(Duration::from_millis(200)).await;
            let now = Utc::now();
            Ok(NodeResult::success(node.id.clone(), HashMap::new(), now, now, 0))
        }
    }

    struct Bomb;
    #[async_trait]
    impl Executor for Bomb {
        fn supported_type(&self) -> NodeType {
            NodeType::Log
        }
        async fn execute(
            &self,
            _node: &Node,
            _context: &ExecutionContext,
        ) -> Result<NodeResult, LoomError> {
            Err(LoomError::node_execution("boom"))
        }
    }

    #[tokio::test]
    async fn config_templates_are_resolved_before_execute_runs() {
        let result = execute_with_timeout(&Instant, &node(1_000), &ctx()).await;
        assert_eq!(result.output["msg"], Value::from("u-1"));
    }

    #[tokio::test]
    async fn slow_executor_produces_a_synthetic_timeout_result() {
        let result = execute_with_timeout(&Slow, &node(10), &ctx()).await;
        assert_eq!(result.status, loom_execution::NodeResultStatus::Timeout);
        assert!(result.error_message.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn executor_error_is_translated_to_a_failed_result() {
        let result = execute_with_timeout(&Bomb, &node(1_000), &ctx()).await;
        assert_eq!(result.status, loom_execution::NodeResultStatus::Failed);
        assert!(result.error_message.unwrap().contains("boom"));
    }
}
