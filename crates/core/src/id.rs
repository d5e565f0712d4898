//! Strongly-typed identifiers used throughout the engine.
//!
//! Node, workflow and execution identifiers are opaque strings rather than
//! random UUIDs: node ids come from the workflow author (`"start"`, `"a"`,
//! `"merge-1"`, ...), and execution ids are derived deterministically from
//! the workflow id (see [`ExecutionId::generate`]). Each is a distinct
//! [`domain_key`](https://crates.io/crates/domain-key) key type, so a
//! `NodeId` can never be passed where a `WorkflowId` is expected even
//! though both are thin wrappers over `String`.

use domain_key::{define_domain, key_type};
use rand::Rng;

pub use domain_key::KeyParseError;

define_domain!(TenantDomain, "tenant");
key_type!(TenantId, TenantDomain);

define_domain!(WorkflowDomain, "workflow");
key_type!(WorkflowId, WorkflowDomain);

define_domain!(NodeDomain, "node");
key_type!(NodeId, NodeDomain);

define_domain!(ExecutionDomain, "execution");
key_type!(ExecutionId, ExecutionDomain);

impl ExecutionId {
    /// Generate a fresh execution id of the form `"<workflowId>-<random-8>"`.
    #[must_use]
    pub fn generate(workflow_id: &WorkflowId) -> Self {
        Self::new(format!("{workflow_id}-{}", random_suffix(8)))
            .expect("workflow id plus random suffix is always non-empty")
    }

    /// Derive a resume id of the form `"<original>-resumed-<random-8>"`.
    #[must_use]
    pub fn resumed_from(original: &ExecutionId) -> Self {
        Self::new(format!("{original}-resumed-{}", random_suffix(8)))
            .expect("original id plus suffix is always non-empty")
    }
}

fn random_suffix(len: usize) -> String {
    const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execution_ids_embed_the_workflow_id() {
        let wf = WorkflowId::new("billing-pipeline").unwrap();
        let exec = ExecutionId::generate(&wf);
        assert!(exec.as_str().starts_with("billing-pipeline-"));
    }

    #[test]
    fn resumed_ids_are_distinct_and_traceable() {
        let wf = WorkflowId::new("billing-pipeline").unwrap();
        let original = ExecutionId::generate(&wf);
        let resumed = ExecutionId::resumed_from(&original);
        assert_ne!(original, resumed);
        assert!(resumed.as_str().contains("-resumed-"));
        assert!(resumed.as_str().starts_with(original.as_str()));
    }

    #[test]
    fn node_ids_round_trip_through_string() {
        let id = NodeId::new("fetch-user").unwrap();
        assert_eq!(id.as_str(), "fetch-user");
    }

    #[test]
    fn rejects_empty_ids() {
        assert!(NodeId::new("").is_err());
    }
}
