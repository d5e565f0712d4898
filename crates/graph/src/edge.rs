//! A directed edge between two nodes (§3 `Edge`).

use loom_core::NodeId;
use serde::{Deserialize, Serialize};

/// A directed edge. `condition`, when present, is a boolean template
/// (§4.8) evaluated against the post-source-success context; "no
/// condition" is treated as `true` (§4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    #[serde(rename = "sourceNodeId")]
    pub source_id: NodeId,
    #[serde(rename = "targetNodeId")]
    pub target_id: NodeId,
    #[serde(default)]
    pub condition: Option<String>,
}

impl Edge {
    #[must_use]
    pub fn new(source_id: NodeId, target_id: NodeId) -> Self {
        Self {
            source_id,
            target_id,
            condition: None,
        }
    }

    #[must_use]
    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    /// `true` if the edge connects a node to itself — always invalid (§4.1).
    #[must_use]
    pub fn is_self_loop(&self) -> bool {
        self.source_id == self.target_id
    }
}
