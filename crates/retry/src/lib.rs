//! # Loom Retry
//!
//! Retry decision and back-off computation (§4.6). Deliberately a leaf
//! crate with no knowledge of nodes, execution contexts, or checkpoints:
//! it consumes only the generic facts it needs (attempt number, a node's
//! own retry ceiling if any, the failure's error message) so it stays
//! pure and independently testable. The only non-determinism is the
//! random jitter in [`BackoffKind::ExponentialWithJitter`].

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Back-off shape (§4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BackoffKind {
    Fixed,
    Linear,
    Exponential,
    ExponentialWithJitter,
}

/// The default non-retryable error kind names (§4.6): arguments, state,
/// and interruption are considered programmer/operator errors, not
/// transient failures worth retrying.
pub fn default_non_retryable_kinds() -> Vec<String> {
    vec![
        "IllegalArgumentException".to_string(),
        "IllegalStateException".to_string(),
        "InterruptedException".to_string(),
    ]
}

/// A retry policy configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub kind: BackoffKind,
    pub base_interval_ms: u64,
    pub max_interval_ms: u64,
    pub max_retries: u32,
    /// Fraction of the computed exponential delay to jitter by, e.g. `0.2`
    /// for ±20%. Only meaningful for [`BackoffKind::ExponentialWithJitter`].
    pub jitter_factor: f64,
    /// Simple class names whose presence in an error message disqualifies
    /// a retry outright (§4.6).
    pub non_retryable_kinds: Vec<String>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            kind: BackoffKind::Exponential,
            base_interval_ms: 1_000,
            max_interval_ms: 60_000,
            max_retries: 3,
            jitter_factor: 0.2,
            non_retryable_kinds: default_non_retryable_kinds(),
        }
    }
}

/// The outcome of [`RetryPolicy::should_retry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryDecision {
    pub retry: bool,
    pub delay_ms: u64,
}

impl RetryDecision {
    const NO: Self = Self {
        retry: false,
        delay_ms: 0,
    };
}

impl RetryPolicy {
    /// Decide whether attempt number `attempt` (0-indexed, the attempt
    /// that just failed) should be followed by another try, and after how
    /// long.
    ///
    /// `node_retry_count` is the node's own `retryCount`, if the node sets
    /// one tighter than the policy's `max_retries` (§4.6). `error_message`
    /// is matched against `non_retryable_kinds` by simple substring
    /// containment, mirroring a "simple class name" check.
    #[must_use]
    pub fn should_retry(
        &self,
        node_retry_count: Option<u32>,
        error_message: &str,
        attempt: u32,
    ) -> RetryDecision {
        if attempt >= self.max_retries {
            return RetryDecision::NO;
        }
        if let Some(node_max) = node_retry_count {
            if attempt >= node_max {
                return RetryDecision::NO;
            }
        }
        if self
            .non_retryable_kinds
            .iter()
            .any(|kind| error_message.contains(kind.as_str()))
        {
            return RetryDecision::NO;
        }

        RetryDecision {
            retry: true,
            delay_ms: self.compute_delay(attempt),
        }
    }

    /// Compute the back-off delay for a given (0-indexed) attempt, capped
    /// at `max_interval_ms`.
    #[must_use]
    pub fn compute_delay(&self, attempt: u32) -> u64 {
        let raw = match self.kind {
            BackoffKind::Fixed => self.base_interval_ms,
            BackoffKind::Linear => self.base_interval_ms.saturating_mul(u64::from(attempt) + 1),
            BackoffKind::Exponential => {
                self.base_interval_ms.saturating_mul(1u64 << attempt.min(62))
            }
            BackoffKind::ExponentialWithJitter => {
                let exp = self.base_interval_ms.saturating_mul(1u64 << attempt.min(62));
                jittered(exp, self.jitter_factor)
            }
        };
        raw.min(self.max_interval_ms)
    }
}

fn jittered(base: u64, jitter_factor: f64) -> u64 {
    let spread = (base as f64 * jitter_factor).max(0.0) as i64;
    if spread == 0 {
        return base;
    }
    let mut rng = rand::thread_rng();
    let delta = rng.gen_range(-spread..=spread);
    (base as i64 + delta).max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(kind: BackoffKind) -> RetryPolicy {
        RetryPolicy {
            kind,
            base_interval_ms: 100,
            max_interval_ms: 10_000,
            max_retries: 5,
            jitter_factor: 0.5,
            non_retryable_kinds: default_non_retryable_kinds(),
        }
    }

    #[test]
    fn fixed_delay_never_changes() {
        let p = policy(BackoffKind::Fixed);
        assert_eq!(p.compute_delay(0), 100);
        assert_eq!(p.compute_delay(5), 100);
    }

    #[test]
    fn linear_delay_grows_by_base_each_attempt() {
        let p = policy(BackoffKind::Linear);
        assert_eq!(p.compute_delay(0), 100);
        assert_eq!(p.compute_delay(1), 200);
        assert_eq!(p.compute_delay(2), 300);
    }

    #[test]
    fn exponential_delay_is_non_decreasing_and_capped() {
        let p = policy(BackoffKind::Exponential);
        let mut prev = 0;
        for attempt in 0..10 {
            let delay = p.compute_delay(attempt);
            assert!(delay >= prev);
            assert!(delay <= p.max_interval_ms);
            prev = delay;
        }
    }

    #[test]
    fn jittered_exponential_stays_within_cap() {
        let p = policy(BackoffKind::ExponentialWithJitter);
        for attempt in 0..10 {
            let delay = p.compute_delay(attempt);
            assert!(delay <= p.max_interval_ms);
        }
    }

    #[test]
    fn stops_at_policy_max_retries() {
        let p = policy(BackoffKind::Fixed);
        let decision = p.should_retry(None, "boom", 5);
        assert!(!decision.retry);
    }

    #[test]
    fn stops_at_tighter_node_retry_count() {
        let p = policy(BackoffKind::Fixed);
        let decision = p.should_retry(Some(1), "boom", 1);
        assert!(!decision.retry);
        assert!(p.should_retry(Some(1), "boom", 0).retry);
    }

    #[test]
    fn non_retryable_error_message_stops_immediately() {
        let p = policy(BackoffKind::Fixed);
        let decision = p.should_retry(None, "caused by IllegalStateException: bad state", 0);
        assert!(!decision.retry);
    }

    #[test]
    fn retry_exhaustion_matches_scenario_s5() {
        // retryCount = 2: attempts 0 and 1 retry, attempt 2 does not.
        let p = policy(BackoffKind::Fixed);
        assert!(p.should_retry(Some(2), "transient", 0).retry);
        assert!(p.should_retry(Some(2), "transient", 1).retry);
        assert!(!p.should_retry(Some(2), "transient", 2).retry);
    }
}
