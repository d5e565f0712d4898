//! The terminal record of one node execution (§3 `NodeResult`).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use loom_core::NodeId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::status::NodeResultStatus;

/// Output payloads past this estimated size are offloaded to an object
/// store by the executor framework (out of scope, §6); the core only
/// ever carries the `blob_id` through.
pub const LARGE_RESULT_THRESHOLD_BYTES: usize = 2 * 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeResult {
    pub node_id: NodeId,
    pub status: NodeResultStatus,
    #[serde(default)]
    pub output: HashMap<String, Value>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub stack_trace: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_ms: i64,
    #[serde(default)]
    pub retry_attempt: u32,
    /// Set when `output` was offloaded because its estimated size exceeds
    /// [`LARGE_RESULT_THRESHOLD_BYTES`]. Passed through verbatim by the
    /// checkpoint writer (§9) — the core never resolves it itself.
    #[serde(default)]
    pub blob_id: Option<String>,
}

impl NodeResult {
    #[must_use]
    pub fn success(
        node_id: NodeId,
        output: HashMap<String, Value>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        retry_attempt: u32,
    ) -> Self {
        Self {
            node_id,
            status: NodeResultStatus::Success,
            output,
            error_message: None,
            stack_trace: None,
            start_time,
            end_time,
            duration_ms: (end_time - start_time).num_milliseconds(),
            retry_attempt,
            blob_id: None,
        }
    }

    #[must_use]
    pub fn failed(
        node_id: NodeId,
        error_message: impl Into<String>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        retry_attempt: u32,
    ) -> Self {
        Self {
            node_id,
            status: NodeResultStatus::Failed,
            output: HashMap::new(),
            error_message: Some(error_message.into()),
            stack_trace: None,
            start_time,
            end_time,
            duration_ms: (end_time - start_time).num_milliseconds(),
            retry_attempt,
            blob_id: None,
        }
    }

    #[must_use]
    pub fn timeout(
        node_id: NodeId,
        timeout_ms: u64,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        retry_attempt: u32,
    ) -> Self {
        Self {
            node_id,
            status: NodeResultStatus::Timeout,
            output: HashMap::new(),
            error_message: Some(format!("node execution timed out after {timeout_ms}ms")),
            stack_trace: None,
            start_time,
            end_time,
            duration_ms: (end_time - start_time).num_milliseconds(),
            retry_attempt,
            blob_id: None,
        }
    }

    #[must_use]
    pub fn cancelled(node_id: NodeId, start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Self {
        Self {
            node_id,
            status: NodeResultStatus::Cancelled,
            output: HashMap::new(),
            error_message: Some("Execution cancelled".to_string()),
            stack_trace: None,
            start_time,
            end_time,
            duration_ms: (end_time - start_time).num_milliseconds(),
            retry_attempt: 0,
            blob_id: None,
        }
    }

    #[must_use]
    pub fn waiting(node_id: NodeId, start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Self {
        Self {
            node_id,
            status: NodeResultStatus::Waiting,
            output: HashMap::new(),
            error_message: None,
            stack_trace: None,
            start_time,
            end_time,
            duration_ms: (end_time - start_time).num_milliseconds(),
            retry_attempt: 0,
            blob_id: None,
        }
    }

    /// Rough estimate of the serialized output size, used to decide
    /// whether to offload to a blob store (out of scope here; the executor
    /// framework makes the call, but the estimate itself lives with the
    /// data it describes).
    #[must_use]
    pub fn estimated_output_bytes(&self) -> usize {
        serde_json::to_vec(&self.output).map(|v| v.len()).unwrap_or(0)
    }

    #[must_use]
    pub fn is_large_result(&self) -> bool {
        self.blob_id.is_some() || self.estimated_output_bytes() > LARGE_RESULT_THRESHOLD_BYTES
    }
}
