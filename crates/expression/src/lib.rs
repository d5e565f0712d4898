//! # Loom Expression
//!
//! `{{expr}}` template expansion over node outputs, global variables,
//! execution input, and system variables (§4.2). Pure and side-effect
//! free apart from `system.currentTime`; safe to call concurrently from
//! multiple node executions.

pub mod condition;
pub mod context;
pub mod error;
pub mod expr;
pub mod path;
pub mod resolver;
pub mod template;

pub use condition::{check_security as check_condition_security, evaluate as evaluate_condition};
pub use context::{MapContext, ResolutionContext, SYSTEM_FIELDS};
pub use error::ExpressionError;
pub use expr::ExprRef;
pub use resolver::{resolve_string, resolve_to_string, resolve_value};
