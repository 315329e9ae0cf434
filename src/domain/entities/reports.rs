use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of one completed drain pass over the pending-operation queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrainReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub succeeded: usize,
    pub failed: usize,
    /// Not yet due for retry, or dead-lettered.
    pub skipped: usize,
    /// The pass stopped early because the drain lease was taken over.
    #[serde(default)]
    pub interrupted: bool,
    /// Queue length after the pass.
    pub remaining: u64,
}

impl DrainReport {
    pub fn attempted(&self) -> usize {
        self.succeeded + self.failed
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

/// Outcome of one background replay of the raw-action queue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayReport {
    pub replayed: usize,
    pub failed: usize,
    pub skipped: usize,
}
