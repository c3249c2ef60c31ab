//! Bounded polling.

use crate::Result;
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// How many times to probe and how long to wait between probes.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct PollPolicy {
    pub attempts: u32,
    pub interval_ms: u64,
}

impl PollPolicy {
    pub const fn new(attempts: u32, interval_ms: u64) -> Self {
        Self {
            attempts,
            interval_ms,
        }
    }

    /// Probe every `interval_ms` until `timeout_ms` has elapsed, at least once.
    pub fn within(timeout_ms: u64, interval_ms: u64) -> Self {
        let attempts = if interval_ms == 0 {
            1
        } else {
            (timeout_ms / interval_ms).max(1)
        };
        Self::new(u32::try_from(attempts).unwrap_or(u32::MAX), interval_ms)
    }

    /// Worst-case wall time spent sleeping.
    pub fn budget(&self) -> Duration {
        Duration::from_millis(self.interval_ms * u64::from(self.attempts.saturating_sub(1)))
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::new(20, 300)
    }
}

/// Outcome of [`wait_until`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Poll<T> {
    /// The probe produced a value on attempt `attempts`.
    Ready { value: T, attempts: u32 },
    /// The budget ran out after `attempts` probes.
    TimedOut { attempts: u32 },
}

impl<T> Poll<T> {
    pub fn is_ready(&self) -> bool {
        matches!(self, Poll::Ready { .. })
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Poll::Ready { value, .. } => Some(value),
            Poll::TimedOut { .. } => None,
        }
    }
}

/// Call `probe` until it yields `Some`, at most `policy.attempts` times.
///
/// The probe receives the 1-based attempt number. A probe error is logged and
/// counts as a spent attempt. There is no sleep after the last attempt.
pub async fn wait_until<T, F, Fut>(policy: PollPolicy, mut probe: F) -> Poll<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    for attempt in 1..=policy.attempts {
        match probe(attempt).await {
            Ok(Some(value)) => {
                return Poll::Ready {
                    value,
                    attempts: attempt,
                }
            }
            Ok(None) => {}
            Err(e) => warn!(attempt, "poll probe failed: {}", e),
        }
        if attempt < policy.attempts && policy.interval_ms > 0 {
            tokio::time::sleep(Duration::from_millis(policy.interval_ms)).await;
        }
    }
    Poll::TimedOut {
        attempts: policy.attempts,
    }
}
