//! Live, concurrently-mutable state for one running workflow execution
//! (§3 `ExecutionContext`).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use loom_core::{ExecutionId, NodeId, TenantId, WorkflowId};
use loom_expression::ResolutionContext;
use loom_graph::InDegreeMap;
use parking_lot::RwLock;
use serde_json::Value;

use crate::result::NodeResult;
use crate::status::ExecutionStatus;

/// All state a running execution needs, shared across the dispatcher's
/// worker tasks (§4.5). Every field that a node task can touch concurrently
/// is a `DashMap` or an atomic; the rest is set once at construction.
///
/// `in_degrees` reuses `loom_graph::InDegreeMap` rather than holding a
/// second copy of the counters — the scheduler's snapshot/restore and
/// decrement logic is exactly the bookkeeping §3's `inDegreeSnapshot`
/// describes, so the context just owns one.
pub struct ExecutionContext {
    pub execution_id: ExecutionId,
    pub workflow_id: WorkflowId,
    pub tenant_id: TenantId,
    pub input: HashMap<String, Value>,
    pub global_variables: DashMap<String, Value>,
    pub node_results: DashMap<NodeId, NodeResult>,
    pub completed_nodes: DashMap<NodeId, ()>,
    pub in_degrees: InDegreeMap,
    pub start_time: DateTime<Utc>,
    status: RwLock<ExecutionStatus>,
}

impl ExecutionContext {
    #[must_use]
    pub fn new(
        execution_id: ExecutionId,
        workflow_id: WorkflowId,
        tenant_id: TenantId,
        input: HashMap<String, Value>,
        global_variables: HashMap<String, Value>,
        in_degrees: InDegreeMap,
        start_time: DateTime<Utc>,
    ) -> Self {
        Self {
            execution_id,
            workflow_id,
            tenant_id,
            input,
            global_variables: global_variables.into_iter().collect(),
            node_results: DashMap::new(),
            completed_nodes: DashMap::new(),
            in_degrees,
            start_time,
            status: RwLock::new(ExecutionStatus::Pending),
        }
    }

    #[must_use]
    pub fn status(&self) -> ExecutionStatus {
        *self.status.read()
    }

    pub fn set_status(&self, status: ExecutionStatus) {
        *self.status.write() = status;
    }

    pub fn record_result(&self, result: NodeResult) {
        let node_id = result.node_id.clone();
        self.completed_nodes.insert(node_id.clone(), ());
        self.node_results.insert(node_id, result);
    }

    #[must_use]
    pub fn is_completed(&self, node_id: &NodeId) -> bool {
        self.completed_nodes.contains_key(node_id)
    }

    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.completed_nodes.len()
    }

    #[must_use]
    pub fn results_snapshot(&self) -> HashMap<NodeId, NodeResult> {
        self.node_results
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }
}

impl ResolutionContext for ExecutionContext {
    fn global(&self, key: &str) -> Option<Value> {
        self.global_variables.get(key).map(|v| v.clone())
    }

    fn input(&self, key: &str) -> Option<Value> {
        self.input.get(key).cloned()
    }

    fn system(&self, field: &str) -> Option<Value> {
        match field {
            "executionId" => Some(Value::from(self.execution_id.as_str())),
            "workflowId" => Some(Value::from(self.workflow_id.as_str())),
            "tenantId" => Some(Value::from(self.tenant_id.as_str())),
            "startTime" => Some(Value::from(self.start_time.timestamp_millis() as u64)),
            "status" => Some(Value::from(format!("{:?}", self.status()).to_uppercase())),
            _ => None,
        }
    }

    fn node_result(&self, node_id: &str) -> Option<Value> {
        let id = NodeId::new(node_id).ok()?;
        let result = self.node_results.get(&id)?;
        serde_json::to_value(result.value()).ok()
    }

    fn node_output(&self, node_id: &str) -> Option<Value> {
        let id = NodeId::new(node_id).ok()?;
        let result = self.node_results.get(&id)?;
        serde_json::to_value(&result.value().output).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ExecutionContext {
        ExecutionContext::new(
            ExecutionId::new("wf-abcd1234").unwrap(),
            WorkflowId::new("wf").unwrap(),
            TenantId::new("acme").unwrap(),
            HashMap::from([("userId".to_string(), Value::from("u-1"))]),
            HashMap::from([("region".to_string(), Value::from("us-east"))]),
            InDegreeMap::restore_from_snapshot(&HashMap::new()),
            Utc::now(),
        )
    }

    #[test]
    fn resolves_input_and_global_via_resolution_context() {
        let c = ctx();
        assert_eq!(c.input("userId"), Some(Value::from("u-1")));
        assert_eq!(c.global("region"), Some(Value::from("us-east")));
        assert_eq!(c.input("missing"), None);
    }

    #[test]
    fn system_fields_reflect_identifiers() {
        let c = ctx();
        assert_eq!(c.system("workflowId"), Some(Value::from("wf")));
        assert_eq!(c.system("tenantId"), Some(Value::from("acme")));
        assert!(c.system("currentTime").is_none());
    }

    #[test]
    fn recording_a_result_marks_node_completed() {
        let c = ctx();
        let node_id = NodeId::new("a").unwrap();
        let now = Utc::now();
        c.record_result(NodeResult::success(node_id.clone(), HashMap::new(), now, now, 0));
        assert!(c.is_completed(&node_id));
        assert_eq!(c.completed_count(), 1);
        assert!(c.node_result("a").is_some());
    }

    #[test]
    fn node_output_reads_back_through_resolution_context() {
        let c = ctx();
        let node_id = NodeId::new("a").unwrap();
        let now = Utc::now();
        let mut output = HashMap::new();
        output.insert("status".to_string(), Value::from(200));
        c.record_result(NodeResult::success(node_id, output, now, now, 0));
        let resolved = c.node_output("a").unwrap();
        assert_eq!(resolved["status"], Value::from(200));
    }
}
