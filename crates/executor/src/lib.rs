//! # Loom Executor
//!
//! The node executor framework (§4.4): the `Executor` contract, the
//! type-registry `ExecutorFactory`, and `executeWithTimeout`'s config
//! resolution, timeout, and error-translation wrapper. Built-in node
//! implementations live in `loom-nodes`; this crate only owns the contract.

pub mod executor;
pub mod factory;
pub mod timeout;

pub use executor::{ExecutionMode, Executor};
pub use factory::ExecutorFactory;
pub use timeout::execute_with_timeout;
