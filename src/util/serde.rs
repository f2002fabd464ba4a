//! Shared serializable primitives used across the broker.

use serde::{Deserialize, Serialize};

/// Unique task identifier.
pub type TaskId = uuid::Uuid;

/// Scheduling priority. `Critical` outranks everything else.
///
/// The derived ordering compares importance (`Critical > Low`); queues use
/// [`Priority::rank`], where a lower rank is served first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Background work.
    Low,
    /// Default priority.
    #[default]
    Normal,
    /// Served before normal work.
    High,
    /// Served before everything else.
    Critical,
}

impl Priority {
    /// Queue rank; `0` is dispatched first.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Critical => 0,
            Self::High => 1,
            Self::Normal => 2,
            Self::Low => 3,
        }
    }

    /// Lowercase label used in logs and stats.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Normal => "normal",
            Self::Low => "low",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
