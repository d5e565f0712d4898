//! A single node in a workflow graph (§3 `Node`).

use std::collections::HashMap;

use loom_core::{NodeId, NodeType};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default per-node timeout when neither `node.config.timeout` nor
/// `node.timeoutMs` is set (§4.4).
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// A node definition. Immutable once the workflow is loaded; the engine
/// never mutates a `Node` during execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub name: String,
    /// Mapping from string to arbitrary value. String values may contain
    /// `{{...}}` references resolved before the node executes (§4.2).
    #[serde(default)]
    pub config: HashMap<String, Value>,
    #[serde(default, rename = "retryCount")]
    pub retry_count: u32,
    #[serde(default = "default_timeout_ms", rename = "timeout")]
    pub timeout_ms: u64,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_enabled() -> bool {
    true
}

impl Node {
    /// Look up a config value by key.
    #[must_use]
    pub fn config_value(&self, key: &str) -> Option<&Value> {
        self.config.get(key)
    }

    /// Look up a config string value by key.
    #[must_use]
    pub fn config_str(&self, key: &str) -> Option<&str> {
        self.config.get(key).and_then(Value::as_str)
    }

    /// The effective timeout for one invocation: `node.config.timeout` takes
    /// priority over `node.timeoutMs`, which takes priority over the
    /// built-in default (§4.4).
    #[must_use]
    pub fn effective_timeout_ms(&self) -> u64 {
        self.config
            .get("timeout")
            .and_then(Value::as_u64)
            .unwrap_or(self.timeout_ms)
    }
}
