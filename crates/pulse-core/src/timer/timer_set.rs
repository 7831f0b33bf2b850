//! Multi-routine countdown scheduler.
//!
//! Every active routine owns an independent countdown. The set is a
//! tick-driven state machine with no internal thread: the host calls
//! [`RoutineTimerSet::tick`] once per second while [`RoutineTimerSet::is_armed`]
//! is true, and [`RoutineTimerSet::reconcile_elapsed`] after a suspension.
//!
//! ## Exclusivity
//!
//! Only one routine can be in exercise time. When a countdown fires, every
//! other running countdown is paused in the same step, and stays paused until
//! the fired routine is released with [`RoutineTimerSet::snooze`] or
//! [`RoutineTimerSet::restart_and_resume_others`].
//!
//! ```text
//! Running --tick/skip--> Fired --snooze/restart--> Running
//!    |  ^
//! pause  resume
//!    v  |
//!  Paused
//! ```
//!
//! Iteration order is registration order, which is also the tie-break when
//! several countdowns reach zero on the same tick.

use std::sync::Arc;

use chrono::Utc;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::routine_timer::{RoutineTimer, RoutineTimerState, TimerSetState};
use crate::clock::{Clock, SystemClock};
use crate::events::Event;

/// Input to [`RoutineTimerSet::start_all`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutineInterval {
    pub id: String,
    pub name: String,
    pub interval_secs: u64,
}

impl RoutineInterval {
    pub fn new(id: impl Into<String>, interval_secs: u64) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            interval_secs,
        }
    }

    pub fn named(id: impl Into<String>, name: impl Into<String>, interval_secs: u64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            interval_secs,
        }
    }
}

/// Serializable view of the whole set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerSetSnapshot {
    pub state: TimerSetState,
    pub fired_routine_id: Option<String>,
    pub nearest_routine_id: Option<String>,
    pub remaining_secs: u64,
    pub display: String,
    pub timers: Vec<RoutineTimer>,
    pub at: chrono::DateTime<Utc>,
}

/// Owns one [`RoutineTimer`] per active routine.
#[derive(Debug, Clone)]
pub struct RoutineTimerSet {
    timers: IndexMap<String, RoutineTimer>,
    fired_routine_id: Option<String>,
    clock: Arc<dyn Clock>,
}

impl Default for RoutineTimerSet {
    fn default() -> Self {
        Self::new()
    }
}

impl RoutineTimerSet {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Use `clock` for event timestamps.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            timers: IndexMap::new(),
            fired_routine_id: None,
            clock,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Fired if any timer fired, else Running if any runs, else Paused if
    /// any is paused, else Idle.
    pub fn state(&self) -> TimerSetState {
        if self.timers.values().any(RoutineTimer::is_fired) {
            TimerSetState::Fired
        } else if self.timers.values().any(RoutineTimer::is_running) {
            TimerSetState::Running
        } else if self.timers.values().any(RoutineTimer::is_paused) {
            TimerSetState::Paused
        } else {
            TimerSetState::Idle
        }
    }

    /// Running timer with the least time left; the earliest registered wins
    /// ties.
    pub fn nearest_timer(&self) -> Option<&RoutineTimer> {
        self.timers
            .values()
            .filter(|t| t.is_running())
            .min_by_key(|t| t.remaining_secs)
    }

    pub fn get(&self, id: &str) -> Option<&RoutineTimer> {
        self.timers.get(id)
    }

    /// Timers in registration order.
    pub fn timers(&self) -> impl Iterator<Item = &RoutineTimer> {
        self.timers.values()
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// The routine currently in exercise time.
    pub fn fired_routine_id(&self) -> Option<&str> {
        self.fired_routine_id.as_deref()
    }

    pub fn progress(&self, id: &str) -> Option<f64> {
        self.timers.get(id).map(RoutineTimer::progress)
    }

    /// Whether the host must keep delivering ticks.
    pub fn is_armed(&self) -> bool {
        self.timers.values().any(RoutineTimer::is_running)
    }

    /// `m:ss` of the nearest countdown, `0:00` when nothing runs.
    pub fn display_string(&self) -> String {
        self.nearest_timer()
            .map(RoutineTimer::display_string)
            .unwrap_or_else(|| crate::format::format_clock(0))
    }

    pub fn snapshot(&self) -> TimerSetSnapshot {
        let nearest = self.nearest_timer();
        TimerSetSnapshot {
            state: self.state(),
            fired_routine_id: self.fired_routine_id.clone(),
            nearest_routine_id: nearest.map(|t| t.id.clone()),
            remaining_secs: nearest.map(|t| t.remaining_secs).unwrap_or(0),
            display: self.display_string(),
            timers: self.timers.values().cloned().collect(),
            at: self.clock.now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Replace the whole collection with fresh running countdowns.
    ///
    /// An empty input is ignored. Duplicate identifiers keep the first
    /// registration.
    pub fn start_all<I>(&mut self, routines: I) -> Option<Event>
    where
        I: IntoIterator<Item = RoutineInterval>,
    {
        let mut timers = IndexMap::new();
        for routine in routines {
            if timers.contains_key(&routine.id) {
                tracing::warn!(routine = %routine.id, "duplicate routine id ignored");
                continue;
            }
            let timer = RoutineTimer::new(routine.id.clone(), routine.name, routine.interval_secs);
            timers.insert(routine.id, timer);
        }
        if timers.is_empty() {
            return None;
        }

        self.timers = timers;
        self.fired_routine_id = None;
        let routine_ids: Vec<String> = self.timers.keys().cloned().collect();
        tracing::info!(count = routine_ids.len(), "routine timers started");
        Some(Event::TimersStarted {
            routine_ids,
            at: self.clock.now(),
        })
    }

    /// Advance every running countdown by one second.
    ///
    /// Returns `Some(Event::RoutineFired)` when a countdown reaches zero.
    pub fn tick(&mut self) -> Option<Event> {
        let mut first_hit: Option<String> = None;
        for timer in self.timers.values_mut().filter(|t| t.is_running()) {
            timer.remaining_secs = timer.remaining_secs.saturating_sub(1);
            if timer.remaining_secs == 0 && first_hit.is_none() {
                first_hit = Some(timer.id.clone());
            }
        }
        let id = first_hit?;
        self.fire(&id)
    }

    /// Apply `elapsed_secs` of suspension in one step.
    ///
    /// Produces the same end state as `elapsed_secs` calls to [`Self::tick`]:
    /// time stops for everybody on the tick where the first countdown fires,
    /// because firing pauses the others. Negative input (clock moved
    /// backwards) counts as zero; very large input is applied once.
    pub fn reconcile_elapsed(&mut self, elapsed_secs: i64) -> Option<Event> {
        let elapsed = u64::try_from(elapsed_secs).unwrap_or(0);
        if elapsed == 0 {
            return None;
        }
        let fire_tick = self
            .timers
            .values()
            .filter(|t| t.is_running())
            .map(RoutineTimer::ticks_until_fire)
            .min()?;
        let step = elapsed.min(fire_tick);

        for timer in self.timers.values_mut().filter(|t| t.is_running()) {
            timer.remaining_secs = timer.remaining_secs.saturating_sub(step);
        }
        tracing::debug!(elapsed, applied = step, "reconciled suspended time");

        if elapsed < fire_tick {
            return None;
        }
        let id = self
            .timers
            .values()
            .find(|t| t.is_running() && t.remaining_secs == 0)
            .map(|t| t.id.clone())?;
        self.fire(&id)
    }

    pub fn pause(&mut self) -> Option<Event> {
        let mut paused = 0;
        for timer in self.timers.values_mut().filter(|t| t.is_running()) {
            timer.state = RoutineTimerState::Paused;
            paused += 1;
        }
        if paused == 0 {
            return None;
        }
        tracing::info!(paused, "routine timers paused");
        Some(Event::TimersPaused {
            paused,
            at: self.clock.now(),
        })
    }

    /// Resume every paused countdown.
    ///
    /// Ignored while a routine is fired: only [`Self::snooze`] and the
    /// restart commands release the exclusivity lock.
    pub fn resume(&mut self) -> Option<Event> {
        if self.fired_routine_id.is_some() {
            return None;
        }
        let resumed = self.resume_paused();
        if resumed == 0 {
            return None;
        }
        tracing::info!(resumed, "routine timers resumed");
        Some(Event::TimersResumed {
            resumed,
            at: self.clock.now(),
        })
    }

    /// Fire the running countdown closest to zero right away.
    pub fn skip(&mut self) -> Option<Event> {
        let id = self.nearest_timer()?.id.clone();
        tracing::info!(routine = %id, "routine timer skipped ahead");
        self.fire(&id)
    }

    /// Fire one specific running countdown right away.
    pub fn trigger(&mut self, id: &str) -> Option<Event> {
        if !self.timers.get(id)?.is_running() {
            return None;
        }
        tracing::info!(routine = %id, "routine timer triggered");
        self.fire(id)
    }

    /// Push the fired routine back by `seconds` and release the others.
    pub fn snooze(&mut self, seconds: u64) -> Option<Event> {
        let id = self.fired_routine_id.clone()?;
        let timer = self.timers.get_mut(&id)?;
        timer.rearm(seconds);
        timer.state = RoutineTimerState::Running;
        let seconds = timer.total_secs;
        self.fired_routine_id = None;
        self.resume_paused();

        tracing::info!(routine = %id, seconds, "routine snoozed");
        Some(Event::RoutineSnoozed {
            routine_id: id,
            seconds,
            at: self.clock.now(),
        })
    }

    /// Start a new cycle for one routine, with its existing interval or
    /// `new_interval_secs`.
    ///
    /// Other timers are left alone. While a different routine is fired the
    /// restarted countdown waits paused, so that at most one routine is ever
    /// in exercise time.
    pub fn restart_routine(&mut self, id: &str, new_interval_secs: Option<u64>) -> Option<Event> {
        let blocked = self
            .fired_routine_id
            .as_deref()
            .is_some_and(|fired| fired != id);
        let timer = self.timers.get_mut(id)?;
        let interval = new_interval_secs.unwrap_or(timer.total_secs);
        timer.rearm(interval);
        timer.state = if blocked {
            RoutineTimerState::Paused
        } else {
            RoutineTimerState::Running
        };
        let interval_secs = timer.total_secs;
        if self.fired_routine_id.as_deref() == Some(id) {
            self.fired_routine_id = None;
        }

        tracing::info!(routine = %id, interval_secs, blocked, "routine restarted");
        Some(Event::RoutineRestarted {
            routine_id: id.to_string(),
            interval_secs,
            resumed_others: false,
            at: self.clock.now(),
        })
    }

    /// Restart one routine and release every sibling paused by the
    /// exclusivity rule. This is the transition after an exercise session
    /// finishes or is cancelled.
    pub fn restart_and_resume_others(
        &mut self,
        id: &str,
        new_interval_secs: Option<u64>,
    ) -> Option<Event> {
        let timer = self.timers.get_mut(id)?;
        let interval = new_interval_secs.unwrap_or(timer.total_secs);
        timer.rearm(interval);
        timer.state = RoutineTimerState::Running;
        let interval_secs = timer.total_secs;
        self.fired_routine_id = None;
        let resumed = self.resume_paused();

        tracing::info!(routine = %id, interval_secs, resumed, "routine restarted, siblings resumed");
        Some(Event::RoutineRestarted {
            routine_id: id.to_string(),
            interval_secs,
            resumed_others: true,
            at: self.clock.now(),
        })
    }

    /// Restart every countdown from its full interval.
    pub fn restart_all(&mut self) -> Option<Event> {
        if self.timers.is_empty() {
            return None;
        }
        for timer in self.timers.values_mut() {
            timer.remaining_secs = timer.total_secs;
            timer.state = RoutineTimerState::Running;
        }
        self.fired_routine_id = None;
        Some(Event::TimersStarted {
            routine_ids: self.timers.keys().cloned().collect(),
            at: self.clock.now(),
        })
    }

    /// Drop every countdown.
    pub fn reset(&mut self) -> Option<Event> {
        self.timers.clear();
        self.fired_routine_id = None;
        Some(Event::TimersReset {
            at: self.clock.now(),
        })
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Put `id` into exercise time and pause everything else that runs.
    fn fire(&mut self, id: &str) -> Option<Event> {
        let timer = self.timers.get_mut(id)?;
        timer.remaining_secs = 0;
        timer.state = RoutineTimerState::Fired;
        let routine_name = timer.routine_name.clone();

        for other in self.timers.values_mut().filter(|t| t.is_running()) {
            other.state = RoutineTimerState::Paused;
        }
        self.fired_routine_id = Some(id.to_string());

        tracing::info!(routine = %id, "routine timer fired");
        Some(Event::RoutineFired {
            routine_id: id.to_string(),
            routine_name,
            at: self.clock.now(),
        })
    }

    fn resume_paused(&mut self) -> usize {
        let mut resumed = 0;
        for timer in self.timers.values_mut().filter(|t| t.is_paused()) {
            timer.state = RoutineTimerState::Running;
            resumed += 1;
        }
        resumed
    }
}
