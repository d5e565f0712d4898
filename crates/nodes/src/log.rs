//! The `LOG` node: writes its resolved message through `tracing` and
//! republishes it as output, for pipelines that want to assert on it.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use loom_core::{LoomError, NodeType};
use loom_execution::{ExecutionContext, NodeResult};
use loom_executor::Executor;
use loom_graph::{InDegreeMap, Node};
use tracing::{debug, error, info, warn};

pub struct LogExecutor;

#[async_trait]
impl Executor for LogExecutor {
    fn supported_type(&self) -> NodeType {
        NodeType::Log
    }

    async fn execute(&self, node: &Node, _context: &ExecutionContext) -> Result<NodeResult, LoomError> {
        let start = Utc::now();
        let message = node.config_str("message").unwrap_or("").to_string();
        let level = node.config_str("level").unwrap_or("info");

        match level {
            "debug" => debug!(node_id = %node.id, "{message}"),
            "warn" => warn!(node_id = %node.id, "{message}"),
            "error" => error!(node_id = %node.id, "{message}"),
            _ => info!(node_id = %node.id, "{message}"),
        }

        let mut output = HashMap::new();
        output.insert("message".to_string(), message.into());
        output.insert("level".to_string(), level.into());
        let end = Utc::now();
        Ok(NodeResult::success(node.id.clone(), output, start, end, 0))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap as Map;

    use loom_core::{ExecutionId, TenantId, WorkflowId};
    use serde_json::Value;

    use super::*;

    fn ctx() -> ExecutionContext {
        ExecutionContext::new(
            ExecutionId::new("wf-abcd1234").unwrap(),
            WorkflowId::new("wf").unwrap(),
            TenantId::new("acme").unwrap(),
            Map::new(),
            Map::new(),
            InDegreeMap::restore_from_snapshot(&HashMap::new()),
            Utc::now(),
        )
    }

    fn node(message: &str) -> Node {
        Node {
            id: loom_core::NodeId::new("log-1").unwrap(),
            node_type: NodeType::Log,
            name: "log".to_string(),
            config: Map::from([("message".to_string(), Value::from(message))]),
            retry_count: 0,
            timeout_ms: 30_000,
            enabled: true,
        }
    }

    #[tokio::test]
    async fn republishes_the_message_as_output() {
        let result = LogExecutor.execute(&node("hello"), &ctx()).await.unwrap();
        assert_eq!(result.output["message"], Value::from("hello"));
    }
}
