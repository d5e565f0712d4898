//! Workflow definition validation (§4.1).
//!
//! [`validate`] fails with the *first* offending reason, checked in the
//! order the spec lays out: missing/blank id or name, empty node list,
//! duplicate id, type-specific config, edge endpoint integrity, self-loop,
//! cycle, isolated node.

use std::collections::HashSet;

use loom_core::{NodeId, NodeType};
use thiserror::Error;

use crate::dag::check_structure;
use crate::definition::WorkflowDefinition;

/// The first offending reason a definition fails validation for.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("node has a missing or blank id")]
    MissingNodeId,

    #[error("node '{node_id}' has a missing or blank name")]
    MissingNodeName { node_id: NodeId },

    #[error("workflow has no nodes")]
    EmptyNodeList,

    #[error("duplicate node id '{node_id}'")]
    DuplicateNodeId { node_id: NodeId },

    #[error("node '{node_id}' of type {node_type} is missing required config key '{key}'")]
    MissingTypeConfig {
        node_id: NodeId,
        node_type: NodeType,
        key: &'static str,
    },

    #[error("edge references unknown node '{node_id}'")]
    UnknownEdgeEndpoint { node_id: NodeId },

    #[error("edge from '{node_id}' to itself is not allowed")]
    SelfLoop { node_id: NodeId },

    #[error("cycle detected involving nodes: {}", render_node_list(.nodes))]
    CycleDetected { nodes: Vec<NodeId> },

    #[error("node '{node_id}' has neither incoming nor outgoing edges")]
    IsolatedNode { node_id: NodeId },
}

fn render_node_list(nodes: &[NodeId]) -> String {
    nodes
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Validate a workflow definition, returning the first violated invariant.
pub fn validate(definition: &WorkflowDefinition) -> Result<(), ValidationError> {
    if definition.nodes.is_empty() {
        return Err(ValidationError::EmptyNodeList);
    }

    let mut seen: HashSet<&NodeId> = HashSet::new();
    for node in &definition.nodes {
        if node.id.as_str().trim().is_empty() {
            return Err(ValidationError::MissingNodeId);
        }
        if node.name.trim().is_empty() {
            return Err(ValidationError::MissingNodeName {
                node_id: node.id.clone(),
            });
        }
        if !seen.insert(&node.id) {
            return Err(ValidationError::DuplicateNodeId {
                node_id: node.id.clone(),
            });
        }
        validate_type_config(node)?;
    }

    check_structure(&definition.nodes, &definition.edges)
}

fn validate_type_config(node: &crate::node::Node) -> Result<(), ValidationError> {
    let required: &'static str = match node.node_type {
        NodeType::Http => "url",
        NodeType::Script => "code",
        NodeType::If => "condition",
        _ => return Ok(()),
    };
    if node.config_value(required).is_none() {
        return Err(ValidationError::MissingTypeConfig {
            node_id: node.id.clone(),
            node_type: node.node_type,
            key: required,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use loom_core::{TenantId, WorkflowId};
    use serde_json::json;

    use super::*;
    use crate::edge::Edge;
    use crate::node::{Node, DEFAULT_TIMEOUT_MS};

    fn node(id: &str, node_type: NodeType) -> Node {
        Node {
            id: NodeId::new(id).unwrap(),
            node_type,
            name: id.to_string(),
            config: HashMap::new(),
            retry_count: 0,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            enabled: true,
        }
    }

    fn definition(nodes: Vec<Node>, edges: Vec<Edge>) -> WorkflowDefinition {
        WorkflowDefinition::new(
            WorkflowId::new("wf").unwrap(),
            "wf",
            TenantId::new("tenant").unwrap(),
            nodes,
            edges,
        )
    }

    #[test]
    fn empty_node_list_is_rejected() {
        let def = definition(vec![], vec![]);
        assert_eq!(validate(&def), Err(ValidationError::EmptyNodeList));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let def = definition(vec![node("a", NodeType::Log), node("a", NodeType::Log)], vec![]);
        assert!(matches!(
            validate(&def),
            Err(ValidationError::DuplicateNodeId { .. })
        ));
    }

    #[test]
    fn http_node_requires_url() {
        let def = definition(vec![node("a", NodeType::Http)], vec![]);
        assert!(matches!(
            validate(&def),
            Err(ValidationError::MissingTypeConfig { key: "url", .. })
        ));
    }

    #[test]
    fn http_node_with_url_passes_type_check() {
        let mut a = node("a", NodeType::Http);
        a.config.insert("url".into(), json!("https://example.com"));
        let def = definition(vec![a], vec![]);
        assert!(validate(&def).is_ok());
    }

    #[test]
    fn self_loop_is_rejected() {
        let a = node("a", NodeType::Log);
        let b = node("b", NodeType::Log);
        let edges = vec![Edge::new(a.id.clone(), a.id.clone())];
        let def = definition(vec![a, b], edges);
        assert!(matches!(validate(&def), Err(ValidationError::SelfLoop { .. })));
    }

    #[test]
    fn cycle_is_rejected() {
        let a = node("a", NodeType::Log);
        let b = node("b", NodeType::Log);
        let edges = vec![
            Edge::new(a.id.clone(), b.id.clone()),
            Edge::new(b.id.clone(), a.id.clone()),
        ];
        let def = definition(vec![a, b], edges);
        assert!(matches!(
            validate(&def),
            Err(ValidationError::CycleDetected { .. })
        ));
    }

    #[test]
    fn isolated_node_is_rejected_unless_single_node() {
        let a = node("a", NodeType::Log);
        let b = node("b", NodeType::Log);
        let c = node("c", NodeType::Log);
        let edges = vec![Edge::new(a.id.clone(), b.id.clone())];
        let def = definition(vec![a, b, c], edges);
        assert!(matches!(
            validate(&def),
            Err(ValidationError::IsolatedNode { .. })
        ));
    }

    #[test]
    fn single_node_workflow_is_allowed_with_no_edges() {
        let def = definition(vec![node("a", NodeType::Log)], vec![]);
        assert!(validate(&def).is_ok());
    }

    #[test]
    fn linear_pipeline_validates() {
        let a = node("a", NodeType::Log);
        let b = node("b", NodeType::Log);
        let c = node("c", NodeType::Log);
        let edges = vec![
            Edge::new(a.id.clone(), b.id.clone()),
            Edge::new(b.id.clone(), c.id.clone()),
        ];
        let def = definition(vec![a, b, c], edges);
        assert!(validate(&def).is_ok());
    }
}
