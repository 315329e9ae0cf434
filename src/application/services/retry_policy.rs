use crate::domain::value_objects::RetryState;
use crate::shared::config::SyncConfig;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Exponential backoff with an optional dead-letter ceiling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    base_backoff: Duration,
    max_backoff: Duration,
    max_attempts: Option<u32>,
}

impl RetryPolicy {
    pub fn new(base_backoff: Duration, max_backoff: Duration, max_attempts: Option<u32>) -> Self {
        Self {
            base_backoff,
            max_backoff: max_backoff.max(base_backoff),
            max_attempts,
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(
            config.base_backoff(),
            config.max_backoff(),
            config.max_attempts,
        )
    }

    /// Every failed entry is eligible again on the very next drain and is
    /// never dead-lettered.
    pub fn immediate() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO, None)
    }

    pub fn max_attempts(&self) -> Option<u32> {
        self.max_attempts
    }

    /// Delay before the next attempt once `retries` failures have been recorded.
    pub fn backoff_for(&self, retries: u32) -> Duration {
        if retries == 0 || self.base_backoff.is_zero() {
            return Duration::ZERO;
        }
        let exponent = (retries - 1).min(31);
        let factor = 1u32 << exponent;
        self.base_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }

    pub fn next_state(&self, retries: u32, error: &str, now: DateTime<Utc>) -> RetryState {
        if let Some(max) = self.max_attempts
            && retries >= max
        {
            return RetryState::DeadLettered {
                reason: format!("gave up after {retries} attempts: {error}"),
            };
        }
        let delay = chrono::Duration::from_std(self.backoff_for(retries))
            .unwrap_or_else(|_| chrono::Duration::days(365));
        RetryState::Retrying {
            next_attempt_at: now.checked_add_signed(delay).unwrap_or(now),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&SyncConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy::new(Duration::from_secs(2), Duration::from_secs(10), None);
        assert_eq!(policy.backoff_for(0), Duration::ZERO);
        assert_eq!(policy.backoff_for(1), Duration::from_secs(2));
        assert_eq!(policy.backoff_for(2), Duration::from_secs(4));
        assert_eq!(policy.backoff_for(3), Duration::from_secs(8));
        assert_eq!(policy.backoff_for(4), Duration::from_secs(10));
        assert_eq!(policy.backoff_for(64), Duration::from_secs(10));
    }

    #[test]
    fn dead_letters_at_the_ceiling() {
        let policy = RetryPolicy::new(Duration::from_secs(1), Duration::from_secs(1), Some(3));
        let now = Utc::now();
        assert!(matches!(
            policy.next_state(2, "boom", now),
            RetryState::Retrying { .. }
        ));
        match policy.next_state(3, "boom", now) {
            RetryState::DeadLettered { reason } => assert!(reason.contains("boom")),
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[test]
    fn unbounded_policy_never_dead_letters() {
        let policy = RetryPolicy::immediate();
        let now = Utc::now();
        let state = policy.next_state(1_000, "still failing", now);
        assert_eq!(state, RetryState::Retrying { next_attempt_at: now });
        assert!(state.is_ready(now));
    }
}
