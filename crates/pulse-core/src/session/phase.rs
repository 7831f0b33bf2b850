use serde::{Deserialize, Serialize};

/// Where an exercise session currently is. Exactly one phase is current.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum SessionPhase {
    Idle,
    /// Short countdown before an exercise starts.
    Preparing,
    /// Manual-start mode: halted until the user starts the next exercise.
    WaitingToStart,
    Exercising { set: u32 },
    RestBetweenSets { completed_set: u32 },
    RestAfterExercise,
    Completed,
}

impl SessionPhase {
    /// Phases whose countdown is driven by `tick()` and stopped by `pause()`.
    pub fn is_work_or_rest(self) -> bool {
        matches!(
            self,
            SessionPhase::Exercising { .. }
                | SessionPhase::RestBetweenSets { .. }
                | SessionPhase::RestAfterExercise
        )
    }

    /// A session exists and has not finished.
    pub fn is_active(self) -> bool {
        !matches!(self, SessionPhase::Idle | SessionPhase::Completed)
    }

    /// Phases in which the user may still postpone the whole session.
    pub fn allows_postpone(self) -> bool {
        matches!(self, SessionPhase::Preparing | SessionPhase::WaitingToStart)
    }
}
