//! # Loom Graph
//!
//! Workflow definition types, the in-memory DAG model, structural
//! validation, and the in-degree scheduler that drives topological
//! dispatch (§4.1, §4.3).

pub mod dag;
pub mod definition;
pub mod edge;
pub mod node;
pub mod scheduler;
pub mod validate;

pub use dag::DependencyGraph;
pub use definition::WorkflowDefinition;
pub use edge::Edge;
pub use node::{Node, DEFAULT_TIMEOUT_MS};
pub use scheduler::{
    calculate_in_degrees, calculate_levels, find_ready_nodes, node_completed, topological_sort,
    CompletionOutcome, InDegreeMap,
};
pub use validate::{validate, ValidationError};
