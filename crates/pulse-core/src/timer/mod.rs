mod routine_timer;
mod timer_set;

pub use routine_timer::{RoutineTimer, RoutineTimerState, TimerSetState};
pub use timer_set::{RoutineInterval, RoutineTimerSet, TimerSetSnapshot};
