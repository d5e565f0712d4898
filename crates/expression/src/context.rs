//! The seam between the resolver and whatever owns execution state.
//!
//! `loom-expression` has no dependency on `loom-execution`: instead it
//! defines [`ResolutionContext`], which `ExecutionContext` implements on
//! the other side. This keeps the resolver a pure, dependency-light leaf
//! crate while still letting it read node outputs, globals, input and
//! system vars.

use serde_json::Value;

/// System fields addressable as `system.<field>` (§4.2).
pub const SYSTEM_FIELDS: &[&str] = &[
    "executionId",
    "workflowId",
    "tenantId",
    "currentTime",
    "startTime",
    "status",
];

/// Read-only view over execution state the resolver needs. Implementors
/// must be safe to call concurrently from multiple node executions — the
/// resolver itself never mutates anything it's given.
pub trait ResolutionContext {
    /// Look up a key in `globalVariables`.
    fn global(&self, key: &str) -> Option<Value>;

    /// Look up a key in the execution's `input`.
    fn input(&self, key: &str) -> Option<Value>;

    /// Look up one of [`SYSTEM_FIELDS`]. `currentTime` is intentionally
    /// NOT served from here — the resolver computes it itself at resolve
    /// time so two resolutions a millisecond apart can legitimately differ
    /// (the one documented exception to purity, §8).
    fn system(&self, field: &str) -> Option<Value>;

    /// The full `NodeResult` of `node_id`, serialized as a JSON value, for
    /// a bare `{{nodeId}}` reference. `None` if the node hasn't produced a
    /// result (unknown id, or not yet run).
    fn node_result(&self, node_id: &str) -> Option<Value>;

    /// The `output` map of `node_id`, for `{{nodeId.path}}` references.
    /// `None` if the node hasn't produced a result.
    fn node_output(&self, node_id: &str) -> Option<Value>;
}

/// A simple owned context, handy for tests and for callers that don't want
/// to implement [`ResolutionContext`] on their own execution state.
#[derive(Debug, Clone, Default)]
pub struct MapContext {
    pub globals: std::collections::HashMap<String, Value>,
    pub input: std::collections::HashMap<String, Value>,
    pub system: std::collections::HashMap<String, Value>,
    pub node_outputs: std::collections::HashMap<String, Value>,
    pub node_results: std::collections::HashMap<String, Value>,
}

impl ResolutionContext for MapContext {
    fn global(&self, key: &str) -> Option<Value> {
        self.globals.get(key).cloned()
    }

    fn input(&self, key: &str) -> Option<Value> {
        self.input.get(key).cloned()
    }

    fn system(&self, field: &str) -> Option<Value> {
        self.system.get(field).cloned()
    }

    fn node_result(&self, node_id: &str) -> Option<Value> {
        self.node_results.get(node_id).cloned()
    }

    fn node_output(&self, node_id: &str) -> Option<Value> {
        self.node_outputs.get(node_id).cloned()
    }
}
