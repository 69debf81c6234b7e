// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Retry bookkeeping for one orchestrated call.
//!
//! Pure state: no timers or I/O. The orchestrator asks what to do after each
//! failure and performs the delay itself.

use std::time::Duration;

pub const MAX_RETRIES: u32 = 10;
pub const RETRY_DELAY: Duration = Duration::from_secs(5);
pub const POLL_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_RETRIES,
            delay: RETRY_DELAY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    Retry { next_attempt: u32, delay: Duration },
    Exhausted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryState {
    attempt: u32,
    last_error: Option<String>,
}

impl Default for RetryState {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryState {
    pub fn new() -> Self {
        Self {
            attempt: 1,
            last_error: None,
        }
    }

    /// 1-based number of the attempt in progress.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Record a failed attempt and decide whether another one follows.
    pub fn record_failure(&mut self, message: impl Into<String>, policy: &RetryPolicy) -> RetryDecision {
        self.last_error = Some(message.into());
        if self.attempt >= policy.max_attempts {
            return RetryDecision::Exhausted;
        }
        self.attempt += 1;
        RetryDecision::Retry {
            next_attempt: self.attempt,
            delay: policy.delay,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retries_until_budget_spent() {
        let policy = RetryPolicy::default();
        let mut state = RetryState::new();

        for expected in 2..=MAX_RETRIES {
            assert_eq!(
                state.record_failure("boom", &policy),
                RetryDecision::Retry {
                    next_attempt: expected,
                    delay: RETRY_DELAY
                }
            );
        }
        assert_eq!(state.attempt(), MAX_RETRIES);
        assert_eq!(state.record_failure("last", &policy), RetryDecision::Exhausted);
        assert_eq!(state.last_error(), Some("last"));
        assert_eq!(state.attempt(), MAX_RETRIES);
    }

    #[test]
    fn test_single_attempt_policy() {
        let policy = RetryPolicy {
            max_attempts: 1,
            delay: Duration::ZERO,
        };
        let mut state = RetryState::new();
        assert_eq!(state.record_failure("x", &policy), RetryDecision::Exhausted);
    }
}
