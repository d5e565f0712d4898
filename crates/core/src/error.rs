//! The structured error taxonomy shared by every layer of the engine (§7).
//!
//! Rather than a deep inheritance hierarchy, the engine raises one error
//! type, [`LoomError`], discriminated by [`ErrorKind`]. Each layer attaches
//! the context it has at hand (`node_id`, `workflow_id`) and wraps the
//! lower-level cause instead of discarding it.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::id::{NodeId, WorkflowId};

/// The taxonomy discriminant (§7). Each kind documents whether the
/// dispatcher retries it, logs and continues, or propagates it verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Definition fails an invariant in §3/§4.1. Returned to the caller of
    /// `execute`; never retried.
    Validation,
    /// Definition source malformed (outside the core's concern, but a node
    /// loader may still surface it through this taxonomy).
    Parse,
    /// Generic runtime failure inside the dispatcher's own orchestration.
    Execution,
    /// Executor returned FAILED or threw. Fed into the retry policy.
    NodeExecution,
    /// Per-node executor timeout; a distinguishable `NodeExecution`.
    Timeout,
    /// A condition expression failed the allow-list filter (§4.8).
    Security,
    /// The checkpoint/recovery store failed.
    Checkpoint,
    /// The cooperative cancel flag fired.
    Cancellation,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Parse => "parse",
            ErrorKind::Execution => "execution",
            ErrorKind::NodeExecution => "node_execution",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Security => "security",
            ErrorKind::Checkpoint => "checkpoint",
            ErrorKind::Cancellation => "cancellation",
        };
        f.write_str(s)
    }
}

/// The engine's single structured error type.
#[derive(Debug, Error, Clone)]
#[error("{kind}: {message}")]
pub struct LoomError {
    pub kind: ErrorKind,
    pub message: String,
    pub node_id: Option<NodeId>,
    pub workflow_id: Option<WorkflowId>,
    /// Source error rendered to a string; kept `Clone` so the error can sit
    /// in a checkpointed `NodeResult` without fighting `dyn Error` bounds.
    pub cause: Option<String>,
}

impl LoomError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            node_id: None,
            workflow_id: None,
            cause: None,
        }
    }

    #[must_use]
    pub fn with_node(mut self, node_id: NodeId) -> Self {
        self.node_id = Some(node_id);
        self
    }

    #[must_use]
    pub fn with_workflow(mut self, workflow_id: WorkflowId) -> Self {
        self.workflow_id = Some(workflow_id);
        self
    }

    #[must_use]
    pub fn with_cause(mut self, cause: impl fmt::Display) -> Self {
        self.cause = Some(cause.to_string());
        self
    }

    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    #[must_use]
    pub fn execution(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Execution, message)
    }

    #[must_use]
    pub fn node_execution(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NodeExecution, message)
    }

    #[must_use]
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    #[must_use]
    pub fn security(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Security, message)
    }

    #[must_use]
    pub fn checkpoint(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Checkpoint, message)
    }

    #[must_use]
    pub fn cancellation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cancellation, message)
    }

    /// Whether the error's `message` mentions one of the given non-retryable
    /// kind names (§4.6's "simple name" containment check).
    #[must_use]
    pub fn mentions_any(message: &str, kinds: &[String]) -> bool {
        kinds.iter().any(|k| message.contains(k.as_str()))
    }
}

pub type Result<T> = std::result::Result<T, LoomError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_methods_accumulate_context() {
        let err = LoomError::node_execution("boom")
            .with_node(NodeId::new("a").unwrap())
            .with_cause("root cause");
        assert_eq!(err.kind, ErrorKind::NodeExecution);
        assert_eq!(err.cause.as_deref(), Some("root cause"));
        assert!(err.node_id.is_some());
    }

    #[test]
    fn display_includes_kind_and_message() {
        let err = LoomError::validation("duplicate node id 'a'");
        assert_eq!(err.to_string(), "validation: duplicate node id 'a'");
    }

    #[test]
    fn mentions_any_matches_simple_kind_names() {
        let kinds = vec!["IllegalArgumentException".to_string()];
        assert!(LoomError::mentions_any(
            "caused by IllegalArgumentException: bad input",
            &kinds
        ));
        assert!(!LoomError::mentions_any("unrelated failure", &kinds));
    }
}
