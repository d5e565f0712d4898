//! The checkpoint store contract (§4.7). All operations are safe for
//! concurrent calls from multiple workers of the same execution (§5).

use std::collections::HashMap;

use async_trait::async_trait;
use loom_core::{ExecutionId, NodeId, NodeType};
use loom_execution::{CheckpointData, ExecutionStatus, NodeResult, WorkflowExecutionRecord};
use loom_graph::WorkflowDefinition;
use serde_json::Value;

use crate::error::StoreError;

/// What `recover` hands back to the dispatcher to resume an execution
/// (§4.5 "Resume").
#[derive(Debug, Clone)]
pub struct RecoveredExecution {
    pub definition: WorkflowDefinition,
    pub checkpoint: CheckpointData,
    pub in_degree_map: HashMap<NodeId, u32>,
    pub ready_nodes: Vec<NodeId>,
    pub completed_nodes: Vec<NodeId>,
}

#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Write the initial record; `status = RUNNING`, `startedAt = now`.
    async fn create_execution(
        &self,
        definition: &WorkflowDefinition,
        record: WorkflowExecutionRecord,
    ) -> Result<(), StoreError>;

    /// Upsert the node-log row to `RUNNING` for `(execution_id, node_id)`.
    #[allow(clippy::too_many_arguments)]
    async fn save_node_start(
        &self,
        execution_id: &ExecutionId,
        node_id: &NodeId,
        name: &str,
        node_type: NodeType,
        config: HashMap<String, Value>,
        input_snapshot: HashMap<String, Value>,
        node_in_degree: i64,
    ) -> Result<(), StoreError>;

    /// Upsert the node-log row to a terminal status with timings. Must be
    /// durable (flushed) before the caller dispatches this node's
    /// successors — the durability contract §4.7 depends on it.
    async fn save_node_complete(
        &self,
        execution_id: &ExecutionId,
        result: &NodeResult,
        in_degree_snapshot: &HashMap<NodeId, u32>,
        predecessors_completed: u32,
    ) -> Result<(), StoreError>;

    /// Atomically store a `CheckpointData` projection on the execution
    /// record. May lag `save_node_complete` by one successful node (§4.7).
    async fn save_checkpoint(
        &self,
        execution_id: &ExecutionId,
        checkpoint: CheckpointData,
    ) -> Result<(), StoreError>;

    async fn set_output_data(
        &self,
        execution_id: &ExecutionId,
        output: HashMap<String, Value>,
    ) -> Result<(), StoreError>;

    async fn update_execution_status(
        &self,
        execution_id: &ExecutionId,
        status: ExecutionStatus,
        error_message: Option<String>,
    ) -> Result<(), StoreError>;

    /// True iff the stored record's status is one of `FAILED, RUNNING,
    /// WAITING` and it has not been soft-deleted.
    async fn can_recover(&self, execution_id: &ExecutionId) -> Result<bool, StoreError>;

    /// Load the latest checkpoint and rebuild everything the dispatcher
    /// needs to resume under `new_execution_id`.
    async fn recover(
        &self,
        execution_id: &ExecutionId,
        new_execution_id: &ExecutionId,
    ) -> Result<RecoveredExecution, StoreError>;

    async fn get_execution(&self, execution_id: &ExecutionId) -> Result<WorkflowExecutionRecord, StoreError>;

    async fn list_executions(&self, tenant_id: &loom_core::TenantId) -> Result<Vec<WorkflowExecutionRecord>, StoreError>;
}
