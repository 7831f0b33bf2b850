use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::{ExerciseLog, SessionSnapshot};
use crate::timer::TimerSetSnapshot;

/// Every state change in the system produces an Event.
/// The host routes them between the engines; the CLI prints them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TimersStarted {
        routine_ids: Vec<String>,
        at: DateTime<Utc>,
    },
    TimersPaused {
        paused: usize,
        at: DateTime<Utc>,
    },
    TimersResumed {
        resumed: usize,
        at: DateTime<Utc>,
    },
    TimersReset {
        at: DateTime<Utc>,
    },
    /// A routine's countdown reached zero (or was skipped): exercise time.
    RoutineFired {
        routine_id: String,
        routine_name: String,
        at: DateTime<Utc>,
    },
    /// The fired routine was pushed back by a custom delay.
    RoutineSnoozed {
        routine_id: String,
        seconds: u64,
        at: DateTime<Utc>,
    },
    RoutineRestarted {
        routine_id: String,
        interval_secs: u64,
        resumed_others: bool,
        at: DateTime<Utc>,
    },
    /// Suspension time applied to all running countdowns in one step.
    ElapsedReconciled {
        elapsed_secs: u64,
        at: DateTime<Utc>,
    },
    SessionStarted {
        exercise_count: usize,
        at: DateTime<Utc>,
    },
    PhaseEntered {
        exercise_index: usize,
        exercise_name: String,
        phase: crate::session::SessionPhase,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    SessionCompleted {
        logs: Vec<ExerciseLog>,
        at: DateTime<Utc>,
    },
    /// The session was abandoned. `logs` holds what had been performed
    /// before the cancellation; nothing is appended for the exercise in
    /// progress.
    SessionCancelled {
        logs: Vec<ExerciseLog>,
        at: DateTime<Utc>,
    },
    PostponeRequested {
        minutes: u32,
        at: DateTime<Utc>,
    },
    TimerSnapshot(TimerSetSnapshot),
    SessionSnapshot(SessionSnapshot),
}

impl Event {
    /// Short machine name, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::TimersStarted { .. } => "timers_started",
            Event::TimersPaused { .. } => "timers_paused",
            Event::TimersResumed { .. } => "timers_resumed",
            Event::TimersReset { .. } => "timers_reset",
            Event::RoutineFired { .. } => "routine_fired",
            Event::RoutineSnoozed { .. } => "routine_snoozed",
            Event::RoutineRestarted { .. } => "routine_restarted",
            Event::ElapsedReconciled { .. } => "elapsed_reconciled",
            Event::SessionStarted { .. } => "session_started",
            Event::PhaseEntered { .. } => "phase_entered",
            Event::SessionCompleted { .. } => "session_completed",
            Event::SessionCancelled { .. } => "session_cancelled",
            Event::PostponeRequested { .. } => "postpone_requested",
            Event::TimerSnapshot(_) => "timer_snapshot",
            Event::SessionSnapshot(_) => "session_snapshot",
        }
    }
}
