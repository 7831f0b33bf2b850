use serde::{Deserialize, Serialize};

use crate::format::format_clock;

/// Per-routine countdown state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutineTimerState {
    Running,
    Paused,
    /// Countdown reached zero: it is exercise time for this routine.
    Fired,
}

/// Aggregate state of a whole [`super::RoutineTimerSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerSetState {
    Idle,
    Running,
    Paused,
    Fired,
}

/// One countdown per active routine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutineTimer {
    pub id: String,
    pub routine_name: String,
    /// Seconds left, never above `total_secs`.
    pub remaining_secs: u64,
    /// Configured interval length, always > 0.
    pub total_secs: u64,
    pub state: RoutineTimerState,
}

impl RoutineTimer {
    pub(crate) fn new(id: String, routine_name: String, interval_secs: u64) -> Self {
        let total = interval_secs.max(1);
        Self {
            id,
            routine_name,
            remaining_secs: total,
            total_secs: total,
            state: RoutineTimerState::Running,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state == RoutineTimerState::Running
    }

    pub fn is_paused(&self) -> bool {
        self.state == RoutineTimerState::Paused
    }

    pub fn is_fired(&self) -> bool {
        self.state == RoutineTimerState::Fired
    }

    /// 0.0 .. 1.0 progress through the current cycle.
    pub fn progress(&self) -> f64 {
        if self.total_secs == 0 {
            return 0.0;
        }
        1.0 - (self.remaining_secs as f64 / self.total_secs as f64)
    }

    /// `m:ss` rendering of the remaining time.
    pub fn display_string(&self) -> String {
        format_clock(self.remaining_secs)
    }

    /// Tick on which this timer would fire if left running: a timer resumed
    /// at zero fires on the very next tick.
    pub(crate) fn ticks_until_fire(&self) -> u64 {
        self.remaining_secs.max(1)
    }

    pub(crate) fn rearm(&mut self, interval_secs: u64) {
        let total = interval_secs.max(1);
        self.total_secs = total;
        self.remaining_secs = total;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_timer_is_full_and_running() {
        let timer = RoutineTimer::new("a".into(), "A".into(), 600);
        assert_eq!(timer.remaining_secs, 600);
        assert_eq!(timer.total_secs, 600);
        assert!(timer.is_running());
        assert_eq!(timer.progress(), 0.0);
        assert_eq!(timer.display_string(), "10:00");
    }

    #[test]
    fn zero_interval_is_raised_to_one_second() {
        let timer = RoutineTimer::new("a".into(), "A".into(), 0);
        assert_eq!(timer.total_secs, 1);
    }

    #[test]
    fn progress_tracks_remaining() {
        let mut timer = RoutineTimer::new("a".into(), "A".into(), 100);
        timer.remaining_secs = 25;
        assert!((timer.progress() - 0.75).abs() < f64::EPSILON);
    }
}
