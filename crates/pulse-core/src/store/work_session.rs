use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::session::{active_seconds, ExerciseLog};

/// One work interval and the exercise session that closed it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkSession {
    pub id: Uuid,
    pub routine_name: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub interval_minutes: u32,
    pub was_completed: bool,
    pub logs: Vec<ExerciseLog>,
}

impl WorkSession {
    pub fn new(
        routine_name: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        interval_minutes: u32,
        was_completed: bool,
        logs: Vec<ExerciseLog>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            routine_name: routine_name.into(),
            start,
            end,
            interval_minutes,
            was_completed,
            logs,
        }
    }

    /// Seconds actually exercised, skips excluded.
    pub fn total_exercise_seconds(&self) -> u64 {
        active_seconds(&self.logs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skipped_logs_do_not_count() {
        let now = Utc::now();
        let session = WorkSession::new(
            "Desk",
            now,
            now,
            30,
            true,
            vec![
                ExerciseLog::completed("Neck", 20, now),
                ExerciseLog::skipped("Eyes", 7, now),
            ],
        );
        assert_eq!(session.total_exercise_seconds(), 20);
        assert_ne!(session.id, WorkSession::new("Desk", now, now, 30, true, Vec::new()).id);
    }
}
