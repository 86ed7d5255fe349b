//! Failure classification, backoff policy, and result repair for operation
//! calls.
//!
//! An operation failure is classified once, at the moment it surfaces, into
//! [`FailureKind::Transient`] or [`FailureKind::Fatal`]. Transient failures
//! are retried with exponential backoff up to a bounded number of attempts;
//! fatal failures and exhausted retries fall through to [`repair`], which
//! always produces a usable stand-in value so a workflow run never dies on a
//! flaky dependency.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::warn;

/// How a failure should be treated by the retry controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Worth retrying: timeouts, rate limits, and the like.
    Transient,
    /// Retrying cannot help: bad arguments, permission failures, logic bugs.
    Fatal,
}

/// Classifies a failure message by keyword match, case-insensitively.
///
/// Messages mentioning timeouts, rate limiting, or explicitly transient
/// conditions are [`FailureKind::Transient`]; everything else is
/// [`FailureKind::Fatal`].
#[must_use]
pub fn classify(reason: &str) -> FailureKind {
    let lowered = reason.to_lowercase();
    if lowered.contains("timeout") || lowered.contains("rate") || lowered.contains("transient") {
        FailureKind::Transient
    } else {
        FailureKind::Fatal
    }
}

/// The most recent classified failure of the pending operation, kept in
/// state so later steps can report what went wrong.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl OperationFailure {
    #[must_use]
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Bounds and pacing for retrying transient failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries permitted after the initial call (so `max_attempts = 3` means
    /// at most four calls in total).
    pub max_attempts: u32,
    /// Delay before the first retry; doubles with each subsequent one.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

/// Outcome of consulting the policy after a failed call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryDecision {
    /// Sleep for `delay`, then call again.
    Retry { delay: Duration },
    /// Stop calling and repair the result instead.
    GiveUp,
}

/// Decides whether to retry given the failure kind and the number of failed
/// calls so far (`attempts` counts the call that just failed).
///
/// Fatal failures never retry. Transient failures retry while
/// `attempts <= max_attempts`, with delay `base_delay * 2^(attempts - 1)`.
#[must_use]
pub fn decide(kind: FailureKind, attempts: u32, policy: &RetryPolicy) -> RetryDecision {
    match kind {
        FailureKind::Fatal => RetryDecision::GiveUp,
        FailureKind::Transient if attempts <= policy.max_attempts => {
            let exponent = attempts.saturating_sub(1).min(31);
            RetryDecision::Retry {
                delay: policy.base_delay * 2u32.pow(exponent),
            }
        }
        FailureKind::Transient => RetryDecision::GiveUp,
    }
}

/// Produces a stand-in result when retries are exhausted or the failure is
/// fatal.
///
/// A previous successful result, when available, is reused with a `stale`
/// marker so downstream consumers know its age. With nothing to fall back on,
/// an explicit `unavailable` placeholder is returned instead. Either way the
/// caller gets a value, never an error.
#[must_use]
pub fn repair(last_good: Option<&Value>, reason: &str) -> Value {
    match last_good {
        Some(previous) => {
            warn!(reason, "operation failed, serving stale result");
            let mut repaired = previous.clone();
            if let Some(map) = repaired.as_object_mut() {
                map.insert("stale".into(), Value::Bool(true));
                repaired
            } else {
                json!({ "value": repaired, "stale": true })
            }
        }
        None => {
            warn!(reason, "operation failed with no prior result to fall back on");
            json!({ "status": "unavailable", "reason": reason })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_keywords() {
        assert_eq!(classify("Connection timeout occurred"), FailureKind::Transient);
        assert_eq!(classify("RATE limit exceeded"), FailureKind::Transient);
        assert_eq!(classify("transient network blip"), FailureKind::Transient);
        assert_eq!(classify("permission denied"), FailureKind::Fatal);
        assert_eq!(classify(""), FailureKind::Fatal);
    }

    #[test]
    fn test_decide_backoff_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(
            decide(FailureKind::Transient, 1, &policy),
            RetryDecision::Retry {
                delay: Duration::from_millis(500)
            }
        );
        assert_eq!(
            decide(FailureKind::Transient, 2, &policy),
            RetryDecision::Retry {
                delay: Duration::from_millis(1000)
            }
        );
        assert_eq!(
            decide(FailureKind::Transient, 3, &policy),
            RetryDecision::Retry {
                delay: Duration::from_millis(2000)
            }
        );
        assert_eq!(decide(FailureKind::Transient, 4, &policy), RetryDecision::GiveUp);
    }

    #[test]
    fn test_decide_fatal_never_retries() {
        let policy = RetryPolicy::default();
        assert_eq!(decide(FailureKind::Fatal, 1, &policy), RetryDecision::GiveUp);
    }

    #[test]
    fn test_repair_marks_stale() {
        let last_good = json!({"rows": [1, 2, 3]});
        let repaired = repair(Some(&last_good), "timeout");
        assert_eq!(repaired["stale"], Value::Bool(true));
        assert_eq!(repaired["rows"], json!([1, 2, 3]));
    }

    #[test]
    fn test_repair_wraps_non_object() {
        let last_good = json!(42);
        let repaired = repair(Some(&last_good), "timeout");
        assert_eq!(repaired["value"], json!(42));
        assert_eq!(repaired["stale"], Value::Bool(true));
    }

    #[test]
    fn test_repair_without_last_good() {
        let repaired = repair(None, "schema mismatch");
        assert_eq!(repaired["status"], json!("unavailable"));
        assert_eq!(repaired["reason"], json!("schema mismatch"));
    }
}
