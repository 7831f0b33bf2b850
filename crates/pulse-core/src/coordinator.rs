//! Host-side glue between the routine timers and the exercise session.
//!
//! The two engines never call each other. The coordinator feeds each
//! engine's outbound events to the other:
//!
//! - `RoutineFired` starts a session over a fresh copy of that routine.
//! - `SessionCompleted` records a work session, then restarts the routine
//!   and releases its siblings.
//! - `SessionCancelled` restarts the routine and releases its siblings.
//! - `PostponeRequested` snoozes the fired routine.
//!
//! Only one engine is ticked per heartbeat: the session while one is
//! active, the timers otherwise.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;

use crate::clock::{Clock, SuspendTracker};
use crate::config::Config;
use crate::cue::{Cue, CueSink, GuidanceFilter};
use crate::error::Result;
use crate::events::Event;
use crate::session::{ExerciseSessionEngine, SessionPhase};
use crate::store::{RoutineStore, WorkSession};
use crate::timer::{RoutineInterval, RoutineTimerSet};

/// What `screen_inactive` paused, so that `screen_active` resumes only that.
#[derive(Debug, Clone, Copy, Default)]
struct ScreenPause {
    timers: bool,
    session: bool,
    preparing: bool,
}

pub struct Coordinator {
    config: Config,
    timers: RoutineTimerSet,
    session: ExerciseSessionEngine,
    store: Arc<dyn RoutineStore>,
    cues: Arc<dyn CueSink>,
    clock: Arc<dyn Clock>,
    suspend: SuspendTracker,
    screen: Option<ScreenPause>,
    /// Routine whose session is running.
    session_routine: Option<String>,
    /// When each routine's current work interval began.
    cycle_started: IndexMap<String, DateTime<Utc>>,
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("timers", &self.timers)
            .field("session", &self.session)
            .field("session_routine", &self.session_routine)
            .field("suspended", &self.suspend.is_suspended())
            .finish()
    }
}

impl Coordinator {
    /// `cues` is wrapped in the `[audio]` preferences of `config`.
    pub fn new(
        config: Config,
        store: Arc<dyn RoutineStore>,
        cues: Arc<dyn CueSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let cues: Arc<dyn CueSink> = Arc::new(GuidanceFilter::new(
            cues,
            config.audio.sound_enabled,
            config.audio.voice_guidance_enabled,
        ));
        let session =
            ExerciseSessionEngine::with_ports(config.session_config(), cues.clone(), clock.clone());
        Self {
            timers: RoutineTimerSet::with_clock(clock.clone()),
            session,
            store,
            cues,
            clock,
            config,
            suspend: SuspendTracker::new(),
            screen: None,
            session_routine: None,
            cycle_started: IndexMap::new(),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn timers(&self) -> &RoutineTimerSet {
        &self.timers
    }

    pub fn session(&self) -> &ExerciseSessionEngine {
        &self.session
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn RoutineStore> {
        &self.store
    }

    /// Routine whose exercise session is in progress.
    pub fn session_routine(&self) -> Option<&str> {
        self.session_routine.as_deref()
    }

    /// Whether the heartbeat has anything to drive.
    pub fn needs_heartbeat(&self) -> bool {
        self.timers.is_armed() || self.session.is_active()
    }

    /// Snapshots of both engines.
    pub fn status(&self) -> Vec<Event> {
        vec![
            Event::TimerSnapshot(self.timers.snapshot()),
            Event::SessionSnapshot(self.session.snapshot()),
        ]
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Arm one countdown per active routine. Ignored while a session is
    /// running; the session's end restarts the timers.
    ///
    /// # Errors
    ///
    /// Returns an error if the routine store cannot be read.
    pub fn start(&mut self) -> Result<Vec<Event>> {
        if self.session.is_active() {
            tracing::debug!("session in progress; start ignored");
            return Ok(Vec::new());
        }
        let routines = self.store.active_routines()?;
        let intervals: Vec<RoutineInterval> = routines
            .iter()
            .map(|r| {
                let minutes = self.config.clamp_interval(r.interval_minutes);
                RoutineInterval::new(r.name.clone(), u64::from(minutes) * 60)
            })
            .collect();

        let Some(event) = self.timers.start_all(intervals) else {
            tracing::warn!("no active routine with exercises; nothing to schedule");
            return Ok(Vec::new());
        };
        let now = self.clock.now();
        self.cycle_started.clear();
        for routine in routines {
            self.cycle_started.entry(routine.name).or_insert(now);
        }
        Ok(vec![event])
    }

    /// One heartbeat.
    pub fn tick(&mut self) -> Vec<Event> {
        let events: Vec<Event> = if self.session.is_active() {
            self.session.tick()
        } else {
            self.timers.tick().into_iter().collect()
        };
        self.route(events)
    }

    /// The host is about to be suspended.
    pub fn enter_background(&mut self) -> bool {
        let now = self.clock.now();
        let recorded = self.suspend.enter_background(now, self.timers.is_armed());
        if recorded {
            tracing::debug!("suspension recorded");
        }
        recorded
    }

    /// The host is back: apply the suspended time to the countdowns.
    pub fn enter_foreground(&mut self) -> Vec<Event> {
        let now = self.clock.now();
        let Some(elapsed) = self.suspend.enter_foreground(now) else {
            return Vec::new();
        };
        let mut events = vec![Event::ElapsedReconciled {
            elapsed_secs: elapsed,
            at: now,
        }];
        let fired = self
            .timers
            .reconcile_elapsed(i64::try_from(elapsed).unwrap_or(i64::MAX));
        events.extend(self.route(fired.into_iter().collect()));
        events
    }

    /// The screen went to sleep: pause whatever is counting.
    pub fn screen_inactive(&mut self) -> Vec<Event> {
        if self.screen.is_some() {
            return Vec::new();
        }
        let mut pause = ScreenPause::default();
        let mut events = Vec::new();
        if let Some(event) = self.timers.pause() {
            pause.timers = true;
            events.push(event);
        }
        pause.session = self.session.pause();
        pause.preparing = self.session.pause_preparing();
        tracing::info!(timers = pause.timers, session = pause.session || pause.preparing, "screen inactive");
        self.screen = Some(pause);
        events
    }

    /// The screen is back: resume only what `screen_inactive` paused.
    pub fn screen_active(&mut self) -> Vec<Event> {
        let Some(pause) = self.screen.take() else {
            return Vec::new();
        };
        let mut events = Vec::new();
        if pause.timers {
            events.extend(self.timers.resume());
        }
        if pause.session {
            self.session.resume();
        }
        if pause.preparing {
            self.session.resume_preparing();
        }
        tracing::info!("screen active");
        events
    }

    // ── Timer forwarders ─────────────────────────────────────────────

    pub fn pause_timers(&mut self) -> Vec<Event> {
        self.timers.pause().into_iter().collect()
    }

    /// Ignored while a session is running.
    pub fn resume_timers(&mut self) -> Vec<Event> {
        if self.session.is_active() {
            return Vec::new();
        }
        self.timers.resume().into_iter().collect()
    }

    /// Fire the nearest routine now. Ignored while a session is running.
    pub fn skip_timer(&mut self) -> Vec<Event> {
        if self.session.is_active() {
            return Vec::new();
        }
        let fired = self.timers.skip().into_iter().collect();
        self.route(fired)
    }

    /// Fire `id` now instead of waiting for its countdown. Ignored while a
    /// session is running.
    pub fn trigger_routine(&mut self, id: &str) -> Vec<Event> {
        if self.session.is_active() {
            return Vec::new();
        }
        let fired = self.timers.trigger(id).into_iter().collect();
        self.route(fired)
    }

    /// Push the fired routine back by `seconds`. A session still in its
    /// preparation is dropped; once exercise has begun this is ignored.
    pub fn snooze(&mut self, seconds: u64) -> Vec<Event> {
        match self.session.phase() {
            phase if phase.allows_postpone() => {
                self.cues.emit(Cue::Stop);
                self.session.reset();
                self.session_routine = None;
            }
            phase if phase.is_active() => return Vec::new(),
            _ => {}
        }
        self.timers.snooze(seconds).into_iter().collect()
    }

    /// Snooze by the configured default.
    pub fn snooze_default(&mut self) -> Vec<Event> {
        self.snooze(self.config.snooze_seconds())
    }

    /// Ignored while a session is running.
    pub fn restart_routine(&mut self, id: &str) -> Vec<Event> {
        if self.session.is_active() {
            return Vec::new();
        }
        let interval = self.interval_secs(id);
        let event = self.timers.restart_routine(id, interval);
        if event.is_some() {
            self.cycle_started.insert(id.to_string(), self.clock.now());
        }
        event.into_iter().collect()
    }

    // ── Session forwarders ───────────────────────────────────────────

    pub fn start_now(&mut self) -> Vec<Event> {
        let events = self.session.start_now();
        self.route(events)
    }

    pub fn start_current_exercise(&mut self) -> Vec<Event> {
        let events = self.session.start_current_exercise();
        self.route(events)
    }

    pub fn pause_preparing(&mut self) -> bool {
        self.session.pause_preparing()
    }

    pub fn resume_preparing(&mut self) -> bool {
        self.session.resume_preparing()
    }

    pub fn pause_session(&mut self) -> bool {
        self.session.pause()
    }

    pub fn resume_session(&mut self) -> bool {
        self.session.resume()
    }

    pub fn skip_exercise(&mut self) -> Vec<Event> {
        let events = self.session.skip_current_exercise();
        self.route(events)
    }

    pub fn cancel_session(&mut self) -> Vec<Event> {
        let events = self.session.cancel_session();
        self.route(events)
    }

    pub fn postpone(&mut self, minutes: u32) -> Vec<Event> {
        let events = self.session.request_postpone(minutes);
        self.route(events)
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Current interval of `id` from the store, clamped, in seconds.
    fn interval_secs(&self, id: &str) -> Option<u64> {
        match self.store.routine(id) {
            Ok(routine) => Some(u64::from(self.config.clamp_interval(routine.interval_minutes)) * 60),
            Err(e) => {
                tracing::warn!(routine = %id, error = %e, "keeping previous interval");
                None
            }
        }
    }

    fn restart_after_session(&mut self, id: &str) -> Option<Event> {
        let interval = self.interval_secs(id);
        let event = self.timers.restart_and_resume_others(id, interval);
        self.cycle_started.insert(id.to_string(), self.clock.now());
        event
    }

    /// Pass events on to the other engine until nothing new comes out.
    /// Returns everything that happened, in order.
    fn route(&mut self, events: Vec<Event>) -> Vec<Event> {
        let mut queue: VecDeque<Event> = events.into();
        let mut out = Vec::new();
        while let Some(event) = queue.pop_front() {
            let follow_up = match &event {
                Event::RoutineFired { routine_id, .. } => self.on_routine_fired(routine_id),
                Event::SessionCompleted { logs, .. } => {
                    let logs = logs.clone();
                    self.on_session_completed(logs)
                }
                Event::SessionCancelled { .. } => self.on_session_ended(),
                Event::PostponeRequested { minutes, .. } => {
                    self.session_routine = None;
                    self.timers
                        .snooze(u64::from(*minutes) * 60)
                        .into_iter()
                        .collect()
                }
                _ => Vec::new(),
            };
            out.push(event);
            queue.extend(follow_up);
        }
        out
    }

    fn on_routine_fired(&mut self, id: &str) -> Vec<Event> {
        if self.session.is_active() {
            tracing::warn!(routine = %id, session = ?self.session_routine, "fired during a session; ignored");
            return Vec::new();
        }
        self.cues.emit(Cue::WorkIntervalComplete);
        self.cues.emit(Cue::AlertBeep);

        let exercises = match self.store.routine(id) {
            Ok(routine) => routine.exercises,
            Err(e) => {
                tracing::warn!(routine = %id, error = %e, "fired routine is gone");
                Vec::new()
            }
        };
        if exercises.is_empty() {
            tracing::info!(routine = %id, "no exercises; restarting right away");
            return self.restart_after_session(id).into_iter().collect();
        }

        self.session_routine = Some(id.to_string());
        self.session.start_session(exercises)
    }

    fn on_session_completed(&mut self, logs: Vec<crate::session::ExerciseLog>) -> Vec<Event> {
        let Some(id) = self.session_routine.clone() else {
            return Vec::new();
        };
        let now = self.clock.now();
        let start = self.cycle_started.get(&id).copied().unwrap_or(now);
        let interval_minutes = self
            .store
            .routine(&id)
            .map(|r| r.interval_minutes)
            .unwrap_or(self.config.timers.default_interval_minutes);
        let interval_minutes = self.config.clamp_interval(interval_minutes);
        let record = WorkSession::new(id.clone(), start, now, interval_minutes, true, logs);
        if let Err(e) = self.store.record_session(record) {
            tracing::warn!(routine = %id, error = %e, "work session not recorded");
        }
        self.on_session_ended()
    }

    fn on_session_ended(&mut self) -> Vec<Event> {
        let Some(id) = self.session_routine.take() else {
            return Vec::new();
        };
        if self.session.phase() != SessionPhase::Completed {
            tracing::debug!(routine = %id, "session ended early");
        }
        self.restart_after_session(&id).into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::cue::RecordingCueSink;
    use crate::session::ExerciseStep;
    use crate::store::{MemoryRoutineStore, Routine};

    fn coordinator(routines: Vec<Routine>) -> (Coordinator, Arc<MemoryRoutineStore>, RecordingCueSink) {
        let store = Arc::new(MemoryRoutineStore::new(routines));
        let cues = RecordingCueSink::new();
        let mut config = Config::default();
        config.session.preparation_seconds = 0;
        let coordinator = Coordinator::new(
            config,
            store.clone(),
            Arc::new(cues.clone()),
            Arc::new(ManualClock::default()),
        );
        (coordinator, store, cues)
    }

    fn desk() -> Routine {
        Routine::new("Desk", 1, vec![ExerciseStep::timed("Neck", 3)])
    }

    #[test]
    fn fired_routine_starts_a_session() {
        let (mut c, _, cues) = coordinator(vec![desk()]);
        c.start().unwrap();
        let events: Vec<Event> = (0..60).flat_map(|_| c.tick()).collect();
        assert!(events.iter().any(|e| matches!(e, Event::RoutineFired { .. })));
        assert!(events.iter().any(|e| matches!(e, Event::SessionStarted { .. })));
        assert_eq!(c.session_routine(), Some("Desk"));
        assert!(cues.cues().contains(&Cue::WorkIntervalComplete));
    }

    #[test]
    fn completed_session_is_recorded_and_routine_restarted() {
        let (mut c, store, _) = coordinator(vec![desk()]);
        c.start().unwrap();
        c.skip_timer();
        let events: Vec<Event> = (0..3).flat_map(|_| c.tick()).collect();
        assert!(events.iter().any(|e| matches!(e, Event::SessionCompleted { .. })));
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::RoutineRestarted { resumed_others: true, .. })));
        assert_eq!(store.sessions().unwrap().len(), 1);
        assert_eq!(c.timers().get("Desk").unwrap().remaining_secs, 60);
        assert!(c.session_routine().is_none());
    }

    #[test]
    fn postpone_snoozes_the_fired_routine() {
        let (mut c, _, _) = coordinator(vec![desk()]);
        c.config.session.preparation_seconds = 5;
        c.session = ExerciseSessionEngine::with_ports(
            c.config.session_config(),
            c.cues.clone(),
            c.clock.clone(),
        );
        c.start().unwrap();
        c.skip_timer();
        assert_eq!(c.session().phase(), SessionPhase::Preparing);
        let events = c.postpone(2);
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::RoutineSnoozed { seconds: 120, .. })));
        assert_eq!(c.session().phase(), SessionPhase::Idle);
        assert!(c.timers().fired_routine_id().is_none());
    }

    #[test]
    fn routine_without_exercises_restarts_immediately() {
        let (mut c, store, _) = coordinator(vec![desk()]);
        c.start().unwrap();
        let mut emptied = desk();
        emptied.exercises.clear();
        store.upsert(emptied).unwrap();
        let events = c.skip_timer();
        assert!(events.iter().any(|e| matches!(e, Event::RoutineRestarted { .. })));
        assert!(!c.session().is_active());
        assert!(c.timers().is_armed());
    }

    #[test]
    fn screen_pause_resumes_only_what_it_paused() {
        let (mut c, _, _) = coordinator(vec![desk()]);
        c.start().unwrap();
        c.screen_inactive();
        assert!(!c.timers().is_armed());
        c.tick();
        assert_eq!(c.timers().get("Desk").unwrap().remaining_secs, 60);
        c.screen_active();
        assert!(c.timers().is_armed());

        c.pause_timers();
        c.screen_inactive();
        assert!(c.screen_active().is_empty());
        assert!(!c.timers().is_armed());
    }

    #[test]
    fn timer_commands_cannot_fire_a_second_routine_mid_session() {
        let walk = Routine::new("Walk", 3, vec![ExerciseStep::timed("Stride", 20)]);
        let (mut c, store, _) = coordinator(vec![desk(), walk]);
        c.start().unwrap();
        (0..60).for_each(|_| {
            c.tick();
        });
        assert_eq!(c.session_routine(), Some("Desk"));

        assert!(c.restart_routine("Desk").is_empty());
        assert!(c.resume_timers().is_empty());
        assert!(c.trigger_routine("Walk").is_empty());
        assert!(c.skip_timer().is_empty());
        assert!(c.start().unwrap().is_empty());
        assert_eq!(c.session_routine(), Some("Desk"));
        assert!(!c.timers().get("Walk").unwrap().is_running());

        let events: Vec<Event> = (0..3).flat_map(|_| c.tick()).collect();
        assert!(events.iter().any(|e| matches!(e, Event::SessionCompleted { .. })));
        let sessions = store.sessions().unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].routine_name, "Desk");
        assert_eq!(sessions[0].logs[0].exercise_name, "Neck");
        assert!(c.timers().get("Walk").unwrap().is_running());
    }

    #[test]
    fn recorded_interval_is_clamped_when_routine_is_gone() {
        let (mut c, store, _) = coordinator(vec![desk()]);
        c.config.timers.default_interval_minutes = 500;
        c.start().unwrap();
        c.skip_timer();
        store.remove("Desk").unwrap();
        (0..3).for_each(|_| {
            c.tick();
        });
        let sessions = store.sessions().unwrap();
        assert_eq!(sessions[0].interval_minutes, c.config.timers.max_interval_minutes);
    }

    #[test]
    fn background_time_is_reconciled() {
        let clock = ManualClock::default();
        let store = Arc::new(MemoryRoutineStore::new(vec![desk()]));
        let mut c = Coordinator::new(
            Config::default(),
            store,
            Arc::new(RecordingCueSink::new()),
            Arc::new(clock.clone()),
        );
        c.start().unwrap();
        assert!(c.enter_background());
        clock.advance(45);
        let events = c.enter_foreground();
        assert!(matches!(
            events.first(),
            Some(Event::ElapsedReconciled { elapsed_secs: 45, .. })
        ));
        assert_eq!(c.timers().get("Desk").unwrap().remaining_secs, 15);
    }
}
