//! Serializable projections of execution state (§3 `CheckpointData`,
//! `WorkflowExecutionRecord`, `NodeExecutionLogRecord`, `TriggerRegistry`).
//!
//! Everything in this module is a plain data record; the store crate owns
//! reading and writing them, this crate only owns their shape.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use loom_core::{ExecutionId, NodeId, TenantId, WorkflowId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::ExecutionContext;
use crate::result::NodeResult;
use crate::status::{ExecutionStatus, NodeLogStatus};

/// A serializable projection of an [`ExecutionContext`] at a moment in
/// time (§3). Immutable once constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointData {
    pub execution_id: ExecutionId,
    pub workflow_id: WorkflowId,
    pub status: ExecutionStatus,
    pub current_node_id: Option<NodeId>,
    pub node_results: HashMap<NodeId, NodeResult>,
    pub global_variables: HashMap<String, Value>,
    pub input: HashMap<String, Value>,
    pub in_degree_snapshot: HashMap<NodeId, u32>,
    pub completed_nodes: Vec<NodeId>,
    pub checkpoint_time: DateTime<Utc>,
}

impl CheckpointData {
    /// Capture a checkpoint from live execution state. The in-degree
    /// snapshot comes straight from `context.in_degrees` — the context
    /// owns the one `loom_graph::InDegreeMap` for the whole execution.
    #[must_use]
    pub fn capture(context: &ExecutionContext, current_node_id: Option<NodeId>) -> Self {
        Self {
            execution_id: context.execution_id.clone(),
            workflow_id: context.workflow_id.clone(),
            status: context.status(),
            current_node_id,
            node_results: context.results_snapshot(),
            global_variables: context
                .global_variables
                .iter()
                .map(|e| (e.key().clone(), e.value().clone()))
                .collect(),
            input: context.input.clone(),
            in_degree_snapshot: context.in_degrees.snapshot(),
            completed_nodes: context
                .completed_nodes
                .iter()
                .map(|e| e.key().clone())
                .collect(),
            checkpoint_time: Utc::now(),
        }
    }
}

/// The persisted, top-level record of a single workflow execution (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowExecutionRecord {
    pub execution_id: ExecutionId,
    pub workflow_id: WorkflowId,
    pub workflow_name: String,
    pub tenant_id: TenantId,
    /// The full workflow definition, serialized, so a recovered execution
    /// never depends on the definition store still holding this version.
    pub definition: Value,
    pub status: ExecutionStatus,
    pub error_message: Option<String>,
    pub input_data: HashMap<String, Value>,
    pub output_data: HashMap<String, Value>,
    pub global_variables: HashMap<String, Value>,
    pub context_data: Option<Value>,
    pub checkpoint_data: Option<CheckpointData>,
    pub total_nodes: u32,
    pub completed_nodes: u32,
    pub failed_nodes: u32,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
    pub retry_count: u32,
    pub max_retry_count: u32,
    pub is_resumed: bool,
    pub resumed_from_id: Option<ExecutionId>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl WorkflowExecutionRecord {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }

    /// §4.7: recoverable iff status is one of `FAILED, RUNNING, WAITING`
    /// and the record has not been soft-deleted.
    #[must_use]
    pub fn can_recover(&self) -> bool {
        self.is_active()
            && matches!(
                self.status,
                ExecutionStatus::Failed | ExecutionStatus::Running | ExecutionStatus::Waiting
            )
    }
}

/// One append-only row per (execution, node) (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeExecutionLogRecord {
    pub execution_id: ExecutionId,
    pub node_id: NodeId,
    pub node_name: String,
    pub node_type: loom_core::NodeType,
    pub status: NodeLogStatus,
    pub output_data: HashMap<String, Value>,
    pub error_message: Option<String>,
    pub retry_count: u32,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
    pub node_config: HashMap<String, Value>,
    pub input_snapshot: HashMap<String, Value>,
    /// Set when the node's output was large enough to be offloaded; see
    /// [`crate::result::NodeResult::blob_id`].
    pub large_result_pointer: Option<String>,
    pub node_in_degree: i64,
    pub predecessors_completed: u32,
}

/// Trigger kinds that can start a workflow execution from outside the
/// engine (§3, §6). `Webhook`/`Trigger` on [`loom_core::NodeType`] mark the
/// graph-level entry points this registry indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TriggerKind {
    Webhook,
    Cron,
    Manual,
    Event,
}

/// One row per entry-trigger node. The engine core only reads and
/// increments the fire counters; the external trigger surface (§6) owns
/// actually invoking the webhook/cron/event listener.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerRegistryEntry {
    pub workflow_id: WorkflowId,
    pub node_id: NodeId,
    pub kind: TriggerKind,
    pub config: HashMap<String, Value>,
    pub enabled: bool,
    pub fire_count: u64,
    pub last_fired_at: Option<DateTime<Utc>>,
}

impl TriggerRegistryEntry {
    pub fn record_fire(&mut self, at: DateTime<Utc>) {
        self.fire_count += 1;
        self.last_fired_at = Some(at);
    }
}
