//! Status vocabularies (§3). The execution, a node's terminal result, and
//! a node's persisted log row each have a distinct state set — conflating
//! them would let an execution-level `PENDING` leak into a `NodeResult`,
//! which should never observe a non-terminal status.

use serde::{Deserialize, Serialize};

/// Status of an [`crate::context::ExecutionContext`] as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Success,
    Failed,
    Waiting,
    Cancelled,
    Timeout,
}

impl ExecutionStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ExecutionStatus::Success
                | ExecutionStatus::Failed
                | ExecutionStatus::Cancelled
                | ExecutionStatus::Timeout
        )
    }
}

/// Terminal status of a single node execution (`NodeResult.status`, §3).
/// Deliberately has no `PENDING`/`RUNNING` variant: a `NodeResult` is only
/// ever constructed once a node has reached a terminal outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NodeResultStatus {
    Success,
    Failed,
    Waiting,
    Timeout,
    Cancelled,
}

impl NodeResultStatus {
    #[must_use]
    pub fn is_success_like(self) -> bool {
        matches!(self, NodeResultStatus::Success)
    }
}

/// Status of a persisted [`crate::checkpoint::NodeExecutionLogRecord`] row
/// (§3). Unlike `NodeResultStatus`, this tracks the row through its
/// non-terminal lifetime (`PENDING`, `RUNNING`) and adds `SKIPPED` for
/// nodes the scheduler never invoked (§4.3, §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NodeLogStatus {
    Pending,
    Running,
    Success,
    Failed,
    Skipped,
    Waiting,
}

impl From<NodeResultStatus> for NodeLogStatus {
    fn from(status: NodeResultStatus) -> Self {
        match status {
            NodeResultStatus::Success => NodeLogStatus::Success,
            NodeResultStatus::Failed => NodeLogStatus::Failed,
            NodeResultStatus::Waiting => NodeLogStatus::Waiting,
            NodeResultStatus::Timeout => NodeLogStatus::Failed,
            NodeResultStatus::Cancelled => NodeLogStatus::Failed,
        }
    }
}
