use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Where a queued entry stands in its retry lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RetryState {
    /// Never attempted, or requeued by hand.
    #[default]
    Pending,
    /// Failed at least once; not eligible before `next_attempt_at`.
    Retrying { next_attempt_at: DateTime<Utc> },
    /// Retry budget exhausted. Skipped by every drain until requeued.
    DeadLettered { reason: String },
}

impl RetryState {
    pub fn is_ready(&self, now: DateTime<Utc>) -> bool {
        match self {
            RetryState::Pending => true,
            RetryState::Retrying { next_attempt_at } => *next_attempt_at <= now,
            RetryState::DeadLettered { .. } => false,
        }
    }

    pub fn is_dead_lettered(&self) -> bool {
        matches!(self, RetryState::DeadLettered { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            RetryState::Pending => "pending",
            RetryState::Retrying { .. } => "retrying",
            RetryState::DeadLettered { .. } => "dead_lettered",
        }
    }

    /// Splits the state into its `(retry_state, next_attempt_at, dead_letter_reason)`
    /// column values.
    pub fn to_columns(&self) -> (&'static str, Option<i64>, Option<String>) {
        match self {
            RetryState::Pending => (self.label(), None, None),
            RetryState::Retrying { next_attempt_at } => {
                (self.label(), Some(next_attempt_at.timestamp_millis()), None)
            }
            RetryState::DeadLettered { reason } => (self.label(), None, Some(reason.clone())),
        }
    }

    pub fn from_columns(
        label: &str,
        next_attempt_at: Option<i64>,
        dead_letter_reason: Option<String>,
    ) -> Result<Self, String> {
        match label {
            "pending" => Ok(RetryState::Pending),
            "retrying" => {
                let millis = next_attempt_at
                    .ok_or_else(|| "retrying entry without next_attempt_at".to_string())?;
                let next_attempt_at = Utc
                    .timestamp_millis_opt(millis)
                    .single()
                    .ok_or_else(|| format!("invalid next_attempt_at: {millis}"))?;
                Ok(RetryState::Retrying { next_attempt_at })
            }
            "dead_lettered" => Ok(RetryState::DeadLettered {
                reason: dead_letter_reason.unwrap_or_default(),
            }),
            other => Err(format!("unknown retry state: {other}")),
        }
    }
}
