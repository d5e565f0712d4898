//! # Loom Execution
//!
//! Live execution state, terminal node results, and the serializable
//! projections the checkpoint store persists (§3). Bridges `loom-graph`'s
//! static definitions and `loom-expression`'s resolver with the durable
//! world `loom-store` owns.

pub mod checkpoint;
pub mod context;
pub mod result;
pub mod status;

pub use checkpoint::{
    CheckpointData, NodeExecutionLogRecord, TriggerKind, TriggerRegistryEntry,
    WorkflowExecutionRecord,
};
pub use context::ExecutionContext;
pub use result::{NodeResult, LARGE_RESULT_THRESHOLD_BYTES};
pub use status::{ExecutionStatus, NodeLogStatus, NodeResultStatus};
