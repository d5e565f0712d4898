//! # Loom Dispatcher
//!
//! The concurrent DAG dispatcher (§4.5): ties `loom-graph`'s scheduler,
//! `loom-executor`'s per-node contract, `loom-retry`'s back-off policy,
//! and `loom-store`'s checkpoint contract together into the engine's
//! worker loop, resume path, and output assembly.

pub mod dispatcher;
pub mod handle;
pub mod output;
pub mod task;

pub use dispatcher::{DispatchResult, Dispatcher};
pub use handle::ExecutionHandle;
pub use output::assemble_output;
pub use task::run_node_with_retries;
