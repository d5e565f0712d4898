//! Structural node types that don't do external work: `START`, `END`,
//! `WAIT`, `WEBHOOK`, `TRIGGER` (§4.4 step 3; §6 entry points).

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use loom_core::{LoomError, NodeType};
use loom_execution::{ExecutionContext, NodeResult};
use loom_executor::Executor;
use loom_graph::{InDegreeMap, Node};
use rand::Rng;
use serde_json::Value;

/// Marks the graph's entry; republishes `context.input` unchanged so
/// downstream nodes can reference it either via `input.*` or via `start.*`.
pub struct StartExecutor;

#[async_trait]
impl Executor for StartExecutor {
    fn supported_type(&self) -> NodeType {
        NodeType::Start
    }

    async fn execute(&self, node: &Node, context: &ExecutionContext) -> Result<NodeResult, LoomError> {
        let start = Utc::now();
        let end = Utc::now();
        Ok(NodeResult::success(node.id.clone(), context.input.clone(), start, end, 0))
    }
}

/// Marks the graph's exit. Output assembly (`aggregateOutputs`, §4.5) is
/// the dispatcher's job, reading this node's `config` directly — the
/// executor itself contributes nothing beyond a terminal marker.
pub struct EndExecutor;

#[async_trait]
impl Executor for EndExecutor {
    fn supported_type(&self) -> NodeType {
        NodeType::End
    }

    async fn execute(&self, node: &Node, _context: &ExecutionContext) -> Result<NodeResult, LoomError> {
        let start = Utc::now();
        let end = Utc::now();
        Ok(NodeResult::success(node.id.clone(), HashMap::new(), start, end, 0))
    }
}

/// Suspends the execution with a callback ticket. Returns `WAITING`
/// immediately — the dispatcher must not treat this as a completed node
/// (§4.4 step 3); resumption happens out of band (e.g. a matching webhook
/// call or a timer) that the surrounding trigger surface drives.
pub struct WaitExecutor;

#[async_trait]
impl Executor for WaitExecutor {
    fn supported_type(&self) -> NodeType {
        NodeType::Wait
    }

    async fn execute(&self, node: &Node, _context: &ExecutionContext) -> Result<NodeResult, LoomError> {
        let start = Utc::now();
        let ticket = generate_ticket();
        let end = Utc::now();
        let mut result = NodeResult::waiting(node.id.clone(), start, end);
        result.output.insert("callbackTicket".to_string(), Value::from(ticket));
        Ok(result)
    }
}

fn generate_ticket() -> String {
    const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();
    (0..16).map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char).collect()
}

/// Entry-trigger node types (`WEBHOOK`, `TRIGGER`) are already "fired" by
/// the time the dispatcher reaches them in the graph — the external
/// trigger surface (§6) is what actually invoked `dispatcher.execute`.
/// Inside the graph they behave like `Start`: a pass-through that
/// republishes `context.input`.
pub struct EntryTriggerExecutor {
    node_type: NodeType,
}

impl EntryTriggerExecutor {
    #[must_use]
    pub fn webhook() -> Self {
        Self { node_type: NodeType::Webhook }
    }

    #[must_use]
    pub fn trigger() -> Self {
        Self { node_type: NodeType::Trigger }
    }
}

#[async_trait]
impl Executor for EntryTriggerExecutor {
    fn supported_type(&self) -> NodeType {
        self.node_type
    }

    async fn execute(&self, node: &Node, context: &ExecutionContext) -> Result<NodeResult, LoomError> {
        let start = Utc::now();
        let end = Utc::now();
        Ok(NodeResult::success(node.id.clone(), context.input.clone(), start, end, 0))
    }
}
