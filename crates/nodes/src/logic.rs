//! The `IF` and `MERGE` nodes (§4.4 steps 4 and 5).

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use loom_core::{LoomError, NodeId, NodeType};
use loom_execution::{ExecutionContext, NodeResult};
use loom_executor::Executor;
use loom_graph::{InDegreeMap, Node};
use serde_json::Value;

/// Evaluates `config.condition` (§4.8) and emits `{result, selected}`. The
/// dispatcher reads `result` to decide which conditional out-edges fire;
/// `selected` carries whichever of `trueValue`/`falseValue` applies, for
/// downstream nodes that want the branch's payload without re-evaluating
/// the condition themselves.
pub struct IfExecutor;

#[async_trait]
impl Executor for IfExecutor {
    fn supported_type(&self) -> NodeType {
        NodeType::If
    }

    async fn execute(&self, node: &Node, context: &ExecutionContext) -> Result<NodeResult, LoomError> {
        let start = Utc::now();
        let condition = node
            .config_str("condition")
            .ok_or_else(|| LoomError::node_execution("IF node is missing resolved 'condition'").with_node(node.id.clone()))?;

        let result = loom_expression::evaluate_condition(condition, context)
            .map_err(|e| LoomError::security(e.to_string()).with_node(node.id.clone()))?;

        let selected = if result {
            node.config_value("trueValue").cloned().unwrap_or(Value::Bool(true))
        } else {
            node.config_value("falseValue").cloned().unwrap_or(Value::Bool(false))
        };

        let mut output = HashMap::new();
        output.insert("result".to_string(), Value::from(result));
        output.insert("selected".to_string(), selected);
        let end = Utc::now();
        Ok(NodeResult::success(node.id.clone(), output, start, end, 0))
    }
}

/// Combines predecessor outputs per `config.strategy` (`all`, `array`, or
/// `subset`). The dispatcher populates `config.predecessorNodeIds` with the
/// node's live (non-skipped) in-edge sources before invoking — Merge has no
/// other way to learn the graph shape, since `Executor::execute` only sees
/// `(node, context)`.
pub struct MergeExecutor;

#[async_trait]
impl Executor for MergeExecutor {
    fn supported_type(&self) -> NodeType {
        NodeType::Merge
    }

    async fn execute(&self, node: &Node, context: &ExecutionContext) -> Result<NodeResult, LoomError> {
        let start = Utc::now();
        let strategy = node.config_str("strategy").unwrap_or("all");
        let predecessor_ids = predecessor_ids(node)?;

        let ids: Vec<NodeId> = match strategy {
            "subset" => {
                let names = node
                    .config_value("nodes")
                    .and_then(Value::as_array)
                    .ok_or_else(|| LoomError::node_execution("MERGE subset strategy requires 'nodes'").with_node(node.id.clone()))?;
                names
                    .iter()
                    .filter_map(Value::as_str)
                    .filter_map(|s| NodeId::new(s).ok())
                    .collect()
            }
            _ => predecessor_ids,
        };

        let mut output = HashMap::new();
        if strategy == "array" {
            let array: Vec<Value> = ids.iter().map(|id| node_output_value(context, id)).collect();
            output.insert("merged".to_string(), Value::Array(array));
        } else {
            let mut merged = serde_json::Map::new();
            for id in &ids {
                merged.insert(id.as_str().to_string(), node_output_value(context, id));
            }
            output.insert("merged".to_string(), Value::Object(merged));
        }
        let end = Utc::now();
        Ok(NodeResult::success(node.id.clone(), output, start, end, 0))
    }
}

fn predecessor_ids(node: &Node) -> Result<Vec<NodeId>, LoomError> {
    let raw = node.config_value("predecessorNodeIds").and_then(Value::as_array);
    let Some(raw) = raw else { return Ok(Vec::new()) };
    Ok(raw.iter().filter_map(Value::as_str).filter_map(|s| NodeId::new(s).ok()).collect())
}

fn node_output_value(context: &ExecutionContext, id: &NodeId) -> Value {
    context
        .node_results
        .get(id)
        .map(|result| serde_json::to_value(&result.value().output).unwrap_or(Value::Null))
        .unwrap_or(Value::Null)
}
