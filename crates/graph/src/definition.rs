//! The declarative workflow graph a client submits (§3 `WorkflowDefinition`).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use loom_core::{TenantId, WorkflowId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::edge::Edge;
use crate::node::Node;

/// A full, ordered workflow graph plus its global variables. Immutable
/// during execution; built once by the definition loader (out of scope —
/// see spec §1) and handed to the graph/scheduler/dispatcher layers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub id: WorkflowId,
    pub name: String,
    #[serde(rename = "tenantId")]
    pub tenant_id: TenantId,
    pub version: u32,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    #[serde(default, rename = "globalVariables")]
    pub global_variables: HashMap<String, Value>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl WorkflowDefinition {
    /// Convenience constructor for tests and small programmatic builds;
    /// production definitions normally arrive already deserialized from
    /// the (out-of-scope) DSL loader.
    #[must_use]
    pub fn new(
        id: WorkflowId,
        name: impl Into<String>,
        tenant_id: TenantId,
        nodes: Vec<Node>,
        edges: Vec<Edge>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: name.into(),
            tenant_id,
            version: 1,
            nodes,
            edges,
            global_variables: HashMap::new(),
            created_at: now,
            updated_at: now,
        }
    }
}
