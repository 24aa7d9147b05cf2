//! Reconnect policy: decides whether and when a new connection cycle may
//! start after an abnormal close.

use std::time::Duration;

use crate::types::constants::{
    MAX_RECONNECT_ATTEMPTS, RECONNECT_BASE_DELAY_MS, RECONNECT_MAX_DELAY_MS,
};
use crate::types::{ChatError, Result};

/// Where the policy currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyState {
    /// No retry needed or scheduled
    Idle,
    /// A retry has been handed out and is pending
    Scheduled,
    /// Attempt budget spent; only a manual restart recovers
    Exhausted,
}

/// Exponential backoff with an attempt cap.
///
/// Delay for attempt `k` is `min(base * 2^(k-1), cap)`. The consecutive
/// attempt counter resets to zero on any successful open.
pub struct ReconnectPolicy {
    attempts: u32,
    max_attempts: u32,
    base: Duration,
    cap: Duration,
    state: PolicyState,
}

impl ReconnectPolicy {
    pub fn new(base: Duration, cap: Duration, max_attempts: u32) -> Self {
        Self {
            attempts: 0,
            max_attempts,
            base,
            cap,
            state: PolicyState::Idle,
        }
    }

    /// Hands out the delay before the next attempt, or
    /// [`ChatError::MaxRetriesExceeded`] once the budget is spent.
    pub fn next_delay(&mut self) -> Result<Duration> {
        if self.state == PolicyState::Exhausted || self.attempts >= self.max_attempts {
            self.state = PolicyState::Exhausted;
            return Err(ChatError::MaxRetriesExceeded {
                attempts: self.max_attempts,
            });
        }
        self.attempts += 1;
        self.state = PolicyState::Scheduled;

        let shift = (self.attempts - 1).min(31);
        let delay = self
            .base
            .checked_mul(1u32 << shift)
            .unwrap_or(self.cap)
            .min(self.cap);
        Ok(delay)
    }

    /// Resets the consecutive-failure counter after a successful open.
    pub fn record_success(&mut self) {
        self.attempts = 0;
        self.state = PolicyState::Idle;
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn state(&self) -> PolicyState {
        self.state
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(
            Duration::from_millis(RECONNECT_BASE_DELAY_MS),
            Duration::from_millis(RECONNECT_MAX_DELAY_MS),
            MAX_RECONNECT_ATTEMPTS,
        )
    }
}
