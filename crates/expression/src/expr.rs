//! The expression grammar inside `{{...}}` (§4.2).

use serde_json::Value;

use crate::context::ResolutionContext;
use crate::path;

/// A parsed `{{...}}` reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprRef {
    /// `global.<key>`
    Global(String),
    /// `input.<key>` (or `.input.<key>`, leading-dot accepted)
    Input(String),
    /// `system.<field>`
    System(String),
    /// `<nodeId>` — the entire `NodeResult`.
    Node(String),
    /// `<nodeId>.<path>` — `path` applied to the node's `output` map.
    NodeOutputPath(String, String),
}

/// Parse the trimmed text between `{{` and `}}`.
#[must_use]
pub fn parse(raw: &str) -> ExprRef {
    let expr = raw.trim();
    // `.input.<key>` is DSL-compatibility sugar for `input.<key>`.
    let expr = expr.strip_prefix('.').unwrap_or(expr);

    if let Some(rest) = expr.strip_prefix("global.") {
        return ExprRef::Global(rest.to_string());
    }
    if let Some(rest) = expr.strip_prefix("input.") {
        return ExprRef::Input(rest.to_string());
    }
    if let Some(rest) = expr.strip_prefix("system.") {
        return ExprRef::System(rest.to_string());
    }

    match expr.split_once('.') {
        Some((node_id, rest)) => ExprRef::NodeOutputPath(node_id.to_string(), rest.to_string()),
        None => ExprRef::Node(expr.to_string()),
    }
}

/// Resolve an already-parsed reference against a context. Pure apart from
/// `system.currentTime`, which is computed fresh on every call (§8).
#[must_use]
pub fn resolve(expr: &ExprRef, ctx: &dyn ResolutionContext) -> Value {
    match expr {
        ExprRef::Global(key) => ctx.global(key).unwrap_or(Value::Null),
        ExprRef::Input(key) => ctx.input(key).unwrap_or(Value::Null),
        ExprRef::System(field) => resolve_system(field, ctx),
        ExprRef::Node(node_id) => ctx.node_result(node_id).unwrap_or_else(|| {
            tracing::warn!(node_id, "variable reference to unknown node resolved to null");
            Value::Null
        }),
        ExprRef::NodeOutputPath(node_id, rest) => match ctx.node_output(node_id) {
            Some(output) => path::lookup(&output, rest),
            None => {
                tracing::warn!(node_id, "variable reference to unknown node resolved to null");
                Value::Null
            }
        },
    }
}

fn resolve_system(field: &str, ctx: &dyn ResolutionContext) -> Value {
    if field == "currentTime" {
        let millis = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        return Value::from(millis);
    }
    ctx.system(field).unwrap_or(Value::Null)
}

/// Convenience: parse then resolve in one step.
#[must_use]
pub fn parse_and_resolve(raw: &str, ctx: &dyn ResolutionContext) -> Value {
    resolve(&parse(raw), ctx)
}
