//! Type registry mapping [`NodeType`] to its [`Executor`] (§4.4).

use std::sync::Arc;

use dashmap::DashMap;
use loom_core::{ErrorKind, LoomError, NodeType};

use crate::executor::Executor;

/// Built once at startup and shared read-only across every execution
/// afterwards. Registration itself is not on the hot path and uses a plain
/// `DashMap` rather than anything more exotic.
#[derive(Default)]
pub struct ExecutorFactory {
    executors: DashMap<NodeType, Arc<dyn Executor>>,
}

impl ExecutorFactory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an executor for its `supported_type()`. Rejects a second
    /// registration for a type that already has one (§4.4).
    pub fn register(&self, executor: Arc<dyn Executor>) -> Result<(), LoomError> {
        let node_type = executor.supported_type();
        if self.executors.contains_key(&node_type) {
            return Err(LoomError::validation(format!(
                "an executor is already registered for node type {node_type}"
            )));
        }
        self.executors.insert(node_type, executor);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, node_type: NodeType) -> Option<Arc<dyn Executor>> {
        self.executors.get(&node_type).map(|entry| Arc::clone(entry.value()))
    }

    pub fn require(&self, node_type: NodeType) -> Result<Arc<dyn Executor>, LoomError> {
        self.get(node_type).ok_or_else(|| {
            LoomError::new(
                ErrorKind::Validation,
                format!("no executor registered for node type {node_type}"),
            )
        })
    }

    #[must_use]
    pub fn registered_types(&self) -> Vec<NodeType> {
        self.executors.iter().map(|entry| *entry.key()).collect()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use loom_execution::{ExecutionContext, NodeResult};
    use loom_graph::Node;

    use super::*;
    use crate::executor::ExecutionMode;

    struct StubExecutor(NodeType);

    #[async_trait]
    impl Executor for StubExecutor {
        fn supported_type(&self) -> NodeType {
            self.0
        }

        async fn execute(
            &self,
            _node: &Node,
            _context: &ExecutionContext,
        ) -> Result<NodeResult, LoomError> {
            unreachable!("not exercised in these tests")
        }
    }

    #[test]
    fn duplicate_registration_for_the_same_type_is_rejected() {
        let factory = ExecutorFactory::new();
        factory.register(Arc::new(StubExecutor(NodeType::Log))).unwrap();
        let err = factory.register(Arc::new(StubExecutor(NodeType::Log))).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[test]
    fn distinct_types_register_independently() {
        let factory = ExecutorFactory::new();
        factory.register(Arc::new(StubExecutor(NodeType::Log))).unwrap();
        factory.register(Arc::new(StubExecutor(NodeType::Http))).unwrap();
        assert_eq!(factory.registered_types().len(), 2);
    }

    #[test]
    fn require_surfaces_an_error_for_an_unregistered_type() {
        let factory = ExecutorFactory::new();
        assert!(factory.require(NodeType::Wait).is_err());
    }

    #[test]
    fn default_execution_mode_is_async() {
        assert_eq!(StubExecutor(NodeType::Log).execution_mode(), ExecutionMode::Async);
    }
}
