//! An in-memory [`CheckpointStore`] (§4.7). Durable only for the lifetime
//! of the process; useful for tests and single-node deployments that
//! don't need a real backing store.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use loom_core::{ExecutionId, NodeId, NodeType, TenantId};
use loom_execution::{
    CheckpointData, ExecutionStatus, NodeExecutionLogRecord, NodeLogStatus, NodeResult,
    WorkflowExecutionRecord,
};
use loom_graph::{find_ready_nodes, DependencyGraph, InDegreeMap, WorkflowDefinition};
use serde_json::Value;
use tracing::debug;

use crate::error::StoreError;
use crate::traits::{CheckpointStore, RecoveredExecution};

/// `(execution, node)` composite key for the node-log table.
type NodeLogKey = (ExecutionId, NodeId);

#[derive(Debug, Default)]
pub struct InMemoryCheckpointStore {
    executions: DashMap<ExecutionId, WorkflowExecutionRecord>,
    node_logs: DashMap<NodeLogKey, NodeExecutionLogRecord>,
}

impl InMemoryCheckpointStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, execution_id: &ExecutionId) -> Result<WorkflowExecutionRecord, StoreError> {
        self.executions
            .get(execution_id)
            .map(|r| r.value().clone())
            .ok_or_else(|| StoreError::ExecutionNotFound(execution_id.clone()))
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn create_execution(
        &self,
        _definition: &WorkflowDefinition,
        record: WorkflowExecutionRecord,
    ) -> Result<(), StoreError> {
        self.executions.insert(record.execution_id.clone(), record);
        Ok(())
    }

    async fn save_node_start(
        &self,
        execution_id: &ExecutionId,
        node_id: &NodeId,
        name: &str,
        node_type: NodeType,
        config: HashMap<String, Value>,
        input_snapshot: HashMap<String, Value>,
        node_in_degree: i64,
    ) -> Result<(), StoreError> {
        let key = (execution_id.clone(), node_id.clone());
        let now = Utc::now();
        self.node_logs.insert(
            key,
            NodeExecutionLogRecord {
                execution_id: execution_id.clone(),
                node_id: node_id.clone(),
                node_name: name.to_string(),
                node_type,
                status: NodeLogStatus::Running,
                output_data: HashMap::new(),
                error_message: None,
                retry_count: 0,
                started_at: now,
                completed_at: None,
                duration_ms: None,
                node_config: config,
                input_snapshot,
                large_result_pointer: None,
                node_in_degree,
                predecessors_completed: 0,
            },
        );
        Ok(())
    }

    async fn save_node_complete(
        &self,
        execution_id: &ExecutionId,
        result: &NodeResult,
        in_degree_snapshot: &HashMap<NodeId, u32>,
        predecessors_completed: u32,
    ) -> Result<(), StoreError> {
        let key = (execution_id.clone(), result.node_id.clone());
        let node_in_degree = i64::from(
            in_degree_snapshot
                .get(&result.node_id)
                .copied()
                .unwrap_or(0),
        );

        self.node_logs
            .entry(key)
            .and_modify(|log| {
                log.status = NodeLogStatus::from(result.status);
                log.output_data = result.output.clone();
                log.error_message = result.error_message.clone();
                log.retry_count = result.retry_attempt;
                log.completed_at = Some(result.end_time);
                log.duration_ms = Some(result.duration_ms);
                log.large_result_pointer = result.blob_id.clone();
                log.node_in_degree = node_in_degree;
                log.predecessors_completed = predecessors_completed;
            })
            .or_insert_with(|| NodeExecutionLogRecord {
                execution_id: execution_id.clone(),
                node_id: result.node_id.clone(),
                node_name: result.node_id.as_str().to_string(),
                node_type: NodeType::Log,
                status: NodeLogStatus::from(result.status),
                output_data: result.output.clone(),
                error_message: result.error_message.clone(),
                retry_count: result.retry_attempt,
                started_at: result.start_time,
                completed_at: Some(result.end_time),
                duration_ms: Some(result.duration_ms),
                node_config: HashMap::new(),
                input_snapshot: HashMap::new(),
                large_result_pointer: result.blob_id.clone(),
                node_in_degree,
                predecessors_completed,
            });

        if let Some(mut entry) = self.executions.get_mut(execution_id) {
            match result.status {
                loom_execution::NodeResultStatus::Success => entry.completed_nodes += 1,
                loom_execution::NodeResultStatus::Failed
                | loom_execution::NodeResultStatus::Timeout => entry.failed_nodes += 1,
                loom_execution::NodeResultStatus::Waiting
                | loom_execution::NodeResultStatus::Cancelled => {}
            }
        }
        Ok(())
    }

    async fn save_checkpoint(
        &self,
        execution_id: &ExecutionId,
        checkpoint: CheckpointData,
    ) -> Result<(), StoreError> {
        let mut entry = self
            .executions
            .get_mut(execution_id)
            .ok_or_else(|| StoreError::ExecutionNotFound(execution_id.clone()))?;
        entry.checkpoint_data = Some(checkpoint);
        Ok(())
    }

    async fn set_output_data(
        &self,
        execution_id: &ExecutionId,
        output: HashMap<String, Value>,
    ) -> Result<(), StoreError> {
        let mut entry = self
            .executions
            .get_mut(execution_id)
            .ok_or_else(|| StoreError::ExecutionNotFound(execution_id.clone()))?;
        entry.output_data = output;
        Ok(())
    }

    async fn update_execution_status(
        &self,
        execution_id: &ExecutionId,
        status: ExecutionStatus,
        error_message: Option<String>,
    ) -> Result<(), StoreError> {
        let mut entry = self
            .executions
            .get_mut(execution_id)
            .ok_or_else(|| StoreError::ExecutionNotFound(execution_id.clone()))?;
        entry.status = status;
        entry.error_message = error_message;
        if status.is_terminal() {
            let now = Utc::now();
            entry.completed_at = Some(now);
            entry.duration_ms = Some((now - entry.started_at).num_milliseconds());
        }
        Ok(())
    }

    async fn can_recover(&self, execution_id: &ExecutionId) -> Result<bool, StoreError> {
        Ok(self.record(execution_id)?.can_recover())
    }

    async fn recover(
        &self,
        execution_id: &ExecutionId,
        new_execution_id: &ExecutionId,
    ) -> Result<RecoveredExecution, StoreError> {
        let record = self.record(execution_id)?;
        if !record.can_recover() {
            return Err(StoreError::NotRecoverable(execution_id.clone()));
        }
        let checkpoint = record
            .checkpoint_data
            .clone()
            .ok_or_else(|| StoreError::NoCheckpoint(execution_id.clone()))?;

        let definition: WorkflowDefinition = serde_json::from_value(record.definition.clone())
            .map_err(|_| StoreError::NoCheckpoint(execution_id.clone()))?;

        let graph = DependencyGraph::new(&definition.nodes, &definition.edges);
        let in_degrees = InDegreeMap::restore_from_snapshot(&checkpoint.in_degree_snapshot);
        let completed: HashSet<NodeId> = checkpoint.completed_nodes.iter().cloned().collect();
        let ready_nodes = find_ready_nodes(&graph, &in_degrees, &completed)
            .into_iter()
            .map(|n| n.id.clone())
            .collect();

        debug!(
            execution_id = %execution_id,
            new_execution_id = %new_execution_id,
            "recovered execution from checkpoint"
        );

        Ok(RecoveredExecution {
            definition,
            in_degree_map: checkpoint.in_degree_snapshot.clone(),
            completed_nodes: checkpoint.completed_nodes.clone(),
            checkpoint,
            ready_nodes,
        })
    }

    async fn get_execution(&self, execution_id: &ExecutionId) -> Result<WorkflowExecutionRecord, StoreError> {
        self.record(execution_id)
    }

    async fn list_executions(&self, tenant_id: &TenantId) -> Result<Vec<WorkflowExecutionRecord>, StoreError> {
        Ok(self
            .executions
            .iter()
            .filter(|e| &e.value().tenant_id == tenant_id)
            .map(|e| e.value().clone())
            .collect())
    }
}
