//! Checkpoint store errors (§4.7, §7 `ErrorKind::Checkpoint`).

use loom_core::ExecutionId;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("no execution record found for '{0}'")]
    ExecutionNotFound(ExecutionId),

    #[error("execution '{0}' cannot be recovered: status does not permit it")]
    NotRecoverable(ExecutionId),

    #[error("execution '{0}' has no checkpoint to recover from")]
    NoCheckpoint(ExecutionId),
}

impl From<StoreError> for loom_core::LoomError {
    fn from(err: StoreError) -> Self {
        loom_core::LoomError::checkpoint(err.to_string())
    }
}
