//! # Loom Nodes
//!
//! Built-in [`loom_executor::Executor`] implementations for every
//! [`loom_core::NodeType`]. The core dispatcher embeds none of this logic
//! (§6) — it only knows the `Executor` contract; this crate is the default
//! plugin set a deployment registers at startup.

pub mod control;
pub mod http;
pub mod log;
pub mod logic;
pub mod script;

use std::sync::Arc;

use loom_core::LoomError;
use loom_executor::ExecutorFactory;

/// Register every built-in executor. Fails only if called twice on the
/// same factory (duplicate-registration is rejected at the factory level).
pub fn register_builtins(factory: &ExecutorFactory) -> Result<(), LoomError> {
    factory.register(Arc::new(log::LogExecutor))?;
    factory.register(Arc::new(http::HttpExecutor::default()))?;
    factory.register(Arc::new(script::ScriptExecutor))?;
    factory.register(Arc::new(logic::IfExecutor))?;
    factory.register(Arc::new(logic::MergeExecutor))?;
    factory.register(Arc::new(control::StartExecutor))?;
    factory.register(Arc::new(control::EndExecutor))?;
    factory.register(Arc::new(control::WaitExecutor))?;
    factory.register(Arc::new(control::EntryTriggerExecutor::webhook()))?;
    factory.register(Arc::new(control::EntryTriggerExecutor::trigger()))?;
    Ok(())
}
