//! # Loom Core
//!
//! Core identifiers, the node-type vocabulary, and the structured error
//! taxonomy shared by every layer of the Loom workflow engine.

pub mod error;
pub mod id;
pub mod node_type;

pub use error::{ErrorKind, LoomError, Result};
pub use id::{ExecutionId, KeyParseError, NodeId, TenantId, WorkflowId};
pub use node_type::NodeType;
