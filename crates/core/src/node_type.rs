//! The fixed vocabulary of node types a workflow definition may reference.
//!
//! The core engine does not implement any of these bodies itself (see
//! `loom-nodes` and the `Executor` contract in `loom-executor`); it only
//! needs the type tag to route a node to its registered executor and to
//! run type-specific config validation during graph validation.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The type of a node within a workflow graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NodeType {
    Http,
    Log,
    Script,
    If,
    Merge,
    Webhook,
    Wait,
    Start,
    End,
    Trigger,
}

impl NodeType {
    /// All node type variants, in a stable order.
    pub const ALL: [NodeType; 10] = [
        NodeType::Http,
        NodeType::Log,
        NodeType::Script,
        NodeType::If,
        NodeType::Merge,
        NodeType::Webhook,
        NodeType::Wait,
        NodeType::Start,
        NodeType::End,
        NodeType::Trigger,
    ];

    /// Whether this node type is a workflow entry point (§3, `TriggerRegistry`).
    #[must_use]
    pub fn is_entry_trigger(self) -> bool {
        matches!(self, NodeType::Webhook | NodeType::Trigger)
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeType::Http => "HTTP",
            NodeType::Log => "LOG",
            NodeType::Script => "SCRIPT",
            NodeType::If => "IF",
            NodeType::Merge => "MERGE",
            NodeType::Webhook => "WEBHOOK",
            NodeType::Wait => "WAIT",
            NodeType::Start => "START",
            NodeType::End => "END",
            NodeType::Trigger => "TRIGGER",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_uppercase_tag() {
        let json = serde_json::to_string(&NodeType::Http).unwrap();
        assert_eq!(json, "\"HTTP\"");
    }

    #[test]
    fn entry_triggers_are_webhook_and_trigger_only() {
        assert!(NodeType::Webhook.is_entry_trigger());
        assert!(NodeType::Trigger.is_entry_trigger());
        assert!(!NodeType::Log.is_entry_trigger());
    }
}
