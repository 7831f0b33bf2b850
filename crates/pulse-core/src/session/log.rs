use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What was actually performed for one set of one exercise, or a skip.
///
/// Logs are append-only. The only field touched after creation is
/// `health_synced`, set by whoever exports logs to a health store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseLog {
    pub exercise_name: String,
    pub duration_secs: u64,
    pub completed_at: DateTime<Utc>,
    pub skipped: bool,
    #[serde(default)]
    pub health_synced: bool,
}

impl ExerciseLog {
    pub fn completed(name: impl Into<String>, duration_secs: u64, at: DateTime<Utc>) -> Self {
        Self {
            exercise_name: name.into(),
            duration_secs,
            completed_at: at,
            skipped: false,
            health_synced: false,
        }
    }

    pub fn skipped(name: impl Into<String>, duration_secs: u64, at: DateTime<Utc>) -> Self {
        Self {
            skipped: true,
            ..Self::completed(name, duration_secs, at)
        }
    }

    pub fn mark_health_synced(&mut self) {
        self.health_synced = true;
    }
}

/// Active seconds across logs, skips excluded.
pub fn active_seconds(logs: &[ExerciseLog]) -> u64 {
    logs.iter()
        .filter(|log| !log.skipped)
        .map(|log| log.duration_secs)
        .sum()
}
