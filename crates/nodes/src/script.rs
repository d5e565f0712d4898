//! The `SCRIPT` node.
//!
//! Running arbitrary user scripts needs a real sandbox (a separate
//! subsystem, out of scope here — see §9's design note on the script
//! runtime). What this executor does own is the §4.4 step-2 contract: it
//! flattens `input.*` to top-level bindings plus `__global`/`__system`
//! maps and hands that binding set to the configured `code` string,
//! reporting it back as output instead of truly executing it. A real
//! deployment swaps this executor for one backed by an actual sandbox
//! without touching the framework contract.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use loom_core::{LoomError, NodeType};
use loom_execution::{ExecutionContext, NodeResult};
use loom_executor::{ExecutionMode, Executor};
use loom_expression::{ResolutionContext, SYSTEM_FIELDS};
use loom_graph::{InDegreeMap, Node};
use serde_json::Value;

pub struct ScriptExecutor;

#[async_trait]
impl Executor for ScriptExecutor {
    fn supported_type(&self) -> NodeType {
        NodeType::Script
    }

    fn execution_mode(&self) -> ExecutionMode {
        ExecutionMode::BlockingThread
    }

    async fn execute(&self, node: &Node, context: &ExecutionContext) -> Result<NodeResult, LoomError> {
        let start = Utc::now();
        let code = node
            .config_str("code")
            .ok_or_else(|| LoomError::node_execution("SCRIPT node is missing resolved 'code'").with_node(node.id.clone()))?
            .to_string();

        let global: HashMap<String, Value> = context
            .global_variables
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        let mut system = serde_json::Map::new();
        for field in SYSTEM_FIELDS {
            if let Some(value) = context.system(field) {
                system.insert((*field).to_string(), value);
            }
        }
        system.insert("currentTime".to_string(), Value::from(Utc::now().timestamp_millis() as u64));

        let mut output: HashMap<String, Value> = context.input.clone();
        output.insert("code".to_string(), Value::from(code));
        output.insert("__global".to_string(), serde_json::to_value(global).unwrap_or(Value::Null));
        output.insert("__system".to_string(), Value::Object(system));
        let end = Utc::now();
        Ok(NodeResult::success(node.id.clone(), output, start, end, 0))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap as Map;

    use loom_core::{ExecutionId, NodeId, TenantId, WorkflowId};

    use super::*;

    #[tokio::test]
    async fn flattens_input_to_top_level_and_reports_global_and_system_bindings() {
        let context = ExecutionContext::new(
            ExecutionId::new("wf-abcd1234").unwrap(),
            WorkflowId::new("wf").unwrap(),
            TenantId::new("acme").unwrap(),
            Map::from([("userId".to_string(), Value::from("u-1"))]),
            Map::from([("env".to_string(), Value::from("prod"))]),
            InDegreeMap::restore_from_snapshot(&HashMap::new()),
            Utc::now(),
        );
        let node = Node {
            id: NodeId::new("transform").unwrap(),
            node_type: NodeType::Script,
            name: "transform".to_string(),
            config: Map::from([("code".to_string(), Value::from("return userId;"))]),
            retry_count: 0,
            timeout_ms: 30_000,
            enabled: true,
        };
        let result = ScriptExecutor.execute(&node, &context).await.unwrap();
        assert_eq!(result.output["userId"], Value::from("u-1"));
        assert_eq!(result.output["__global"]["env"], Value::from("prod"));
        assert_eq!(result.output["__system"]["workflowId"], Value::from("wf"));
        assert!(result.output["__system"]["currentTime"].is_u64());
        assert_eq!(ScriptExecutor.execution_mode(), ExecutionMode::BlockingThread);
    }
}
