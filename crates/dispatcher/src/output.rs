//! Output assembly (§4.5 "Output assembly").
//!
//! If the graph's END node carries an `aggregateOutputs` config, each entry
//! names the nodes it draws from and a template map; otherwise the
//! dispatcher produces the default `{system, nodeResults}` shape.

use std::collections::HashMap;

use chrono::Utc;
use loom_core::NodeType;
use loom_execution::ExecutionContext;
use loom_expression::resolve_value;
use loom_graph::WorkflowDefinition;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct AggregateEntry {
    #[serde(rename = "fromNodes", default)]
    from_nodes: Vec<String>,
    #[serde(default)]
    transform: HashMap<String, Value>,
}

#[must_use]
pub fn assemble_output(definition: &WorkflowDefinition, context: &ExecutionContext) -> HashMap<String, Value> {
    let end_node = definition.nodes.iter().find(|n| n.node_type == NodeType::End);
    if let Some(spec) = end_node.and_then(|n| n.config_value("aggregateOutputs")) {
        if let Ok(entries) = serde_json::from_value::<Vec<AggregateEntry>>(spec.clone()) {
            return aggregate(&entries, context);
        }
    }
    default_output(context)
}

fn aggregate(entries: &[AggregateEntry], context: &ExecutionContext) -> HashMap<String, Value> {
    let mut out = HashMap::new();
    for entry in entries {
        let ready = entry
            .from_nodes
            .iter()
            .filter_map(|id| loom_core::NodeId::new(id.as_str()).ok())
            .all(|id| context.is_completed(&id));
        if !ready {
            continue;
        }
        for (key, template) in &entry.transform {
            if let Ok(resolved) = resolve_value(template, context) {
                out.insert(key.clone(), resolved);
            }
        }
    }
    out
}

fn default_output(context: &ExecutionContext) -> HashMap<String, Value> {
    let mut system = serde_json::Map::new();
    system.insert("executionId".to_string(), Value::from(context.execution_id.as_str()));
    system.insert("workflowId".to_string(), Value::from(context.workflow_id.as_str()));
    system.insert("tenantId".to_string(), Value::from(context.tenant_id.as_str()));
    let current_time_millis = Utc::now().timestamp_millis() as u64;
    system.insert("currentTime".to_string(), Value::from(current_time_millis));

    let node_results: serde_json::Map<String, Value> = context
        .results_snapshot()
        .into_iter()
        .map(|(id, result)| {
            let status = format!("{:?}", result.status).to_uppercase();
            let has_output = !result.output.is_empty();
            (id.as_str().to_string(), Value::from(format!("{status} (output: {has_output})")))
        })
        .collect();

    let mut out = HashMap::new();
    out.insert("system".to_string(), Value::Object(system));
    out.insert("nodeResults".to_string(), Value::Object(node_results));
    out
}
