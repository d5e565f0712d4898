//! # Loom Store
//!
//! The checkpoint/recovery contract (§4.7) and an in-memory implementation
//! of it. Durable backends (Postgres, etc.) implement [`CheckpointStore`]
//! the same way this crate's [`memory::InMemoryCheckpointStore`] does.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::StoreError;
pub use memory::InMemoryCheckpointStore;
pub use traits::{CheckpointStore, RecoveredExecution};
