//! Exercise session engine.
//!
//! Walks a snapshot of a routine's exercises through a per-exercise phase
//! machine and accumulates the log of what was performed. Like the routine
//! timers, it has no internal thread: the host calls `tick()` once per
//! second while a session is active.
//!
//! ## Phases
//!
//! ```text
//! Idle -> Preparing -> Exercising{1} -> RestBetweenSets{1} -> Exercising{2} ...
//!                                   \-> RestAfterExercise -> Preparing | WaitingToStart | Completed
//! ```
//!
//! A phase configured with zero seconds is passed through in the same step
//! that entered it; it never gets a tick of its own.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::exercise::ExerciseStep;
use super::log::{active_seconds, ExerciseLog};
use super::phase::SessionPhase;
use crate::clock::{Clock, SystemClock};
use crate::cue::{Cue, CueSink, CueTarget, NullCueSink};
use crate::events::Event;

/// Countdown pips are announced at these remaining-second marks.
const PIP_MARK: u64 = 10;
const PIP_FINAL_SECONDS: u64 = 5;

fn default_preparation_secs() -> u64 {
    5
}
fn default_true() -> bool {
    true
}
fn default_postpone_options() -> Vec<u32> {
    vec![1, 2, 5]
}

/// Session behaviour chosen by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Countdown before each exercise.
    #[serde(default = "default_preparation_secs")]
    pub preparation_secs: u64,
    /// When false, the engine waits for `start_current_exercise()` between
    /// exercises.
    #[serde(default = "default_true")]
    pub auto_advance: bool,
    /// Delays `request_postpone` accepts, in minutes.
    #[serde(default = "default_postpone_options")]
    pub postpone_options_minutes: Vec<u32>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            preparation_secs: default_preparation_secs(),
            auto_advance: true,
            postpone_options_minutes: default_postpone_options(),
        }
    }
}

/// Serializable view of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub paused: bool,
    pub exercise_index: usize,
    pub exercise_name: Option<String>,
    pub set: u32,
    pub total_sets: u32,
    pub remaining_secs: u64,
    pub phase_duration_secs: u64,
    pub phase_progress: f64,
    pub total_exercises: usize,
    pub logged: usize,
    pub at: DateTime<Utc>,
}

pub struct ExerciseSessionEngine {
    config: SessionConfig,
    /// Frozen at session start; edits to the routine do not reach a running
    /// session.
    exercises: Vec<ExerciseStep>,
    index: usize,
    /// 1-based, back to 1 for every exercise.
    set: u32,
    phase: SessionPhase,
    remaining_secs: u64,
    paused: bool,
    logs: Vec<ExerciseLog>,
    cues: Arc<dyn CueSink>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for ExerciseSessionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExerciseSessionEngine")
            .field("phase", &self.phase)
            .field("index", &self.index)
            .field("set", &self.set)
            .field("remaining_secs", &self.remaining_secs)
            .field("paused", &self.paused)
            .field("logs", &self.logs.len())
            .finish()
    }
}

impl Default for ExerciseSessionEngine {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl ExerciseSessionEngine {
    /// Engine without audio and on the wall clock.
    pub fn new(config: SessionConfig) -> Self {
        Self::with_ports(config, Arc::new(NullCueSink), Arc::new(SystemClock))
    }

    pub fn with_ports(config: SessionConfig, cues: Arc<dyn CueSink>, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            exercises: Vec::new(),
            index: 0,
            set: 1,
            phase: SessionPhase::Idle,
            remaining_secs: 0,
            paused: false,
            logs: Vec::new(),
            cues,
            clock,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn is_active(&self) -> bool {
        self.phase.is_active()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn current_exercise(&self) -> Option<&ExerciseStep> {
        self.exercises.get(self.index)
    }

    pub fn current_exercise_index(&self) -> usize {
        self.index
    }

    pub fn current_set(&self) -> u32 {
        self.set
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn total_exercises(&self) -> usize {
        self.exercises.len()
    }

    pub fn logs(&self) -> &[ExerciseLog] {
        &self.logs
    }

    /// Configured length of the current phase.
    pub fn phase_duration_secs(&self) -> u64 {
        self.duration_of(self.phase)
    }

    /// 0.0 .. 1.0 progress within the current phase.
    pub fn phase_progress(&self) -> f64 {
        let total = self.phase_duration_secs();
        if total == 0 {
            return 0.0;
        }
        1.0 - (self.remaining_secs as f64 / total as f64)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let exercise = self.current_exercise();
        SessionSnapshot {
            phase: self.phase,
            paused: self.paused,
            exercise_index: self.index,
            exercise_name: exercise.map(|e| e.name.clone()),
            set: self.set,
            total_sets: exercise.map(ExerciseStep::effective_sets).unwrap_or(0),
            remaining_secs: self.remaining_secs,
            phase_duration_secs: self.phase_duration_secs(),
            phase_progress: self.phase_progress(),
            total_exercises: self.exercises.len(),
            logged: self.logs.len(),
            at: self.clock.now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin a session over a snapshot of `exercises`.
    ///
    /// Ignored for an empty list or while another session is active. A
    /// completed session is discarded.
    pub fn start_session(&mut self, exercises: Vec<ExerciseStep>) -> Vec<Event> {
        if exercises.is_empty() || self.phase.is_active() {
            return Vec::new();
        }
        self.exercises = exercises;
        self.index = 0;
        self.set = 1;
        self.logs.clear();
        self.paused = false;

        tracing::info!(exercises = self.exercises.len(), "exercise session started");
        let mut events = vec![Event::SessionStarted {
            exercise_count: self.exercises.len(),
            at: self.clock.now(),
        }];
        self.enter(SessionPhase::Preparing, &mut events);
        events
    }

    /// Advance the current countdown by one second.
    pub fn tick(&mut self) -> Vec<Event> {
        let counting = self.phase == SessionPhase::Preparing || self.phase.is_work_or_rest();
        if !counting || self.paused || self.remaining_secs == 0 {
            return Vec::new();
        }

        self.remaining_secs -= 1;
        let remaining = self.remaining_secs;
        if remaining == PIP_MARK || (1..=PIP_FINAL_SECONDS).contains(&remaining) {
            self.cues.emit(Cue::Countdown { seconds: remaining });
        }

        let mut events = Vec::new();
        if remaining == 0 {
            self.cues.emit(Cue::TransitionBeep);
            if let Some(next) = self.finish_phase() {
                self.enter(next, &mut events);
            }
        }
        events
    }

    /// Skip the preparation countdown (or the manual-start wait).
    pub fn start_now(&mut self) -> Vec<Event> {
        if !self.phase.allows_postpone() {
            return Vec::new();
        }
        self.begin_current_exercise()
    }

    /// Start the next exercise in manual-start mode.
    pub fn start_current_exercise(&mut self) -> Vec<Event> {
        if self.phase != SessionPhase::WaitingToStart {
            return Vec::new();
        }
        self.begin_current_exercise()
    }

    pub fn pause_preparing(&mut self) -> bool {
        if self.phase != SessionPhase::Preparing || self.paused {
            return false;
        }
        self.paused = true;
        true
    }

    pub fn resume_preparing(&mut self) -> bool {
        if self.phase != SessionPhase::Preparing || !self.paused {
            return false;
        }
        self.paused = false;
        true
    }

    /// Freeze a work or rest countdown.
    pub fn pause(&mut self) -> bool {
        if !self.phase.is_work_or_rest() || self.paused {
            return false;
        }
        self.paused = true;
        tracing::debug!(phase = ?self.phase, "session paused");
        true
    }

    pub fn resume(&mut self) -> bool {
        if !self.phase.is_work_or_rest() || !self.paused {
            return false;
        }
        self.paused = false;
        tracing::debug!(phase = ?self.phase, "session resumed");
        true
    }

    /// Log the current exercise as skipped and move to the next one without
    /// any rest.
    ///
    /// The skipped entry records the work seconds already done in the
    /// current set, which is zero outside of `Exercising`.
    pub fn skip_current_exercise(&mut self) -> Vec<Event> {
        if !self.phase.is_active() {
            return Vec::new();
        }
        let Some(exercise) = self.current_exercise() else {
            return Vec::new();
        };
        let performed = match self.phase {
            SessionPhase::Exercising { .. } => exercise
                .effective_duration_secs()
                .saturating_sub(self.remaining_secs),
            _ => 0,
        };
        let log = ExerciseLog::skipped(exercise.name.clone(), performed, self.clock.now());
        tracing::info!(exercise = %log.exercise_name, performed, "exercise skipped");
        self.logs.push(log);

        self.cues.emit(Cue::TransitionBeep);
        self.set = 1;
        let next = self.next_exercise_phase();
        let mut events = Vec::new();
        self.enter(next, &mut events);
        events
    }

    /// Abandon the session from any non-idle phase, `Completed` included.
    ///
    /// Nothing is logged for the exercise in progress. The returned
    /// `SessionCancelled` carries the logs as they were before the call.
    pub fn cancel_session(&mut self) -> Vec<Event> {
        if self.phase == SessionPhase::Idle {
            return Vec::new();
        }
        let logs = std::mem::take(&mut self.logs);
        self.cues.emit(Cue::Stop);
        self.reset();
        tracing::info!(logged = logs.len(), "exercise session cancelled");
        vec![Event::SessionCancelled {
            logs,
            at: self.clock.now(),
        }]
    }

    /// Whether `minutes` is one of the configured postpone delays. An empty
    /// list accepts any positive delay.
    pub fn is_postpone_option(&self, minutes: u32) -> bool {
        minutes > 0
            && (self.config.postpone_options_minutes.is_empty()
                || self.config.postpone_options_minutes.contains(&minutes))
    }

    /// Put the whole session off by `minutes` instead of starting it.
    /// Delays outside the configured options are ignored.
    pub fn request_postpone(&mut self, minutes: u32) -> Vec<Event> {
        if !self.phase.allows_postpone() || !self.is_postpone_option(minutes) {
            tracing::debug!(minutes, phase = ?self.phase, "postpone ignored");
            return Vec::new();
        }
        self.cues.emit(Cue::Stop);
        self.reset();
        tracing::info!(minutes, "exercise session postponed");
        vec![Event::PostponeRequested {
            minutes,
            at: self.clock.now(),
        }]
    }

    /// Back to `Idle` without any signal.
    pub fn reset(&mut self) {
        self.exercises.clear();
        self.logs.clear();
        self.index = 0;
        self.set = 1;
        self.phase = SessionPhase::Idle;
        self.remaining_secs = 0;
        self.paused = false;
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn begin_current_exercise(&mut self) -> Vec<Event> {
        self.cues.emit(Cue::TransitionBeep);
        let mut events = Vec::new();
        self.enter(SessionPhase::Exercising { set: self.set }, &mut events);
        events
    }

    fn duration_of(&self, phase: SessionPhase) -> u64 {
        let Some(exercise) = self.current_exercise() else {
            return 0;
        };
        match phase {
            SessionPhase::Preparing => self.config.preparation_secs,
            SessionPhase::Exercising { .. } => exercise.effective_duration_secs(),
            SessionPhase::RestBetweenSets { .. } => exercise.rest_secs,
            SessionPhase::RestAfterExercise => exercise.rest_after_secs,
            SessionPhase::Idle | SessionPhase::WaitingToStart | SessionPhase::Completed => 0,
        }
    }

    /// Make `phase` current. Zero-length phases are completed on the spot,
    /// so the loop runs until a phase that actually waits is reached.
    fn enter(&mut self, phase: SessionPhase, events: &mut Vec<Event>) {
        let mut next = Some(phase);
        while let Some(phase) = next.take() {
            self.phase = phase;
            self.paused = false;
            self.remaining_secs = self.duration_of(phase);

            match phase {
                SessionPhase::Idle => {}
                SessionPhase::Completed => self.finish_session(events),
                SessionPhase::WaitingToStart => self.push_phase_entered(events),
                _ if self.remaining_secs == 0 => next = self.finish_phase(),
                _ => {
                    self.announce(phase);
                    self.push_phase_entered(events);
                }
            }
        }
    }

    /// Book-keeping when the current phase's countdown is over; returns the
    /// phase that follows.
    fn finish_phase(&mut self) -> Option<SessionPhase> {
        let exercise = self.current_exercise()?;
        match self.phase {
            SessionPhase::Preparing => Some(SessionPhase::Exercising { set: self.set }),
            SessionPhase::Exercising { set } => {
                let total_sets = exercise.effective_sets();
                let log = ExerciseLog::completed(
                    exercise.name.clone(),
                    exercise.effective_duration_secs(),
                    self.clock.now(),
                );
                tracing::debug!(exercise = %log.exercise_name, set, "set completed");
                self.logs.push(log);

                if set < total_sets {
                    Some(SessionPhase::RestBetweenSets { completed_set: set })
                } else {
                    self.cues.emit(Cue::ExerciseComplete);
                    self.set = 1;
                    Some(SessionPhase::RestAfterExercise)
                }
            }
            SessionPhase::RestBetweenSets { completed_set } => {
                self.set = completed_set + 1;
                Some(SessionPhase::Exercising { set: self.set })
            }
            SessionPhase::RestAfterExercise => Some(self.next_exercise_phase()),
            SessionPhase::Idle | SessionPhase::WaitingToStart | SessionPhase::Completed => None,
        }
    }

    fn next_exercise_phase(&mut self) -> SessionPhase {
        self.index += 1;
        self.set = 1;
        if self.index >= self.exercises.len() {
            SessionPhase::Completed
        } else if self.config.auto_advance {
            SessionPhase::Preparing
        } else {
            SessionPhase::WaitingToStart
        }
    }

    fn announce(&self, phase: SessionPhase) {
        let Some(exercise) = self.current_exercise() else {
            return;
        };
        let cue = match phase {
            SessionPhase::Preparing => Cue::Preparing {
                next_exercise: exercise.name.clone(),
                seconds: self.remaining_secs,
            },
            SessionPhase::Exercising { set } => Cue::ExerciseStart {
                name: exercise.name.clone(),
                set,
                total_sets: exercise.effective_sets(),
                target: if exercise.is_rep_based() {
                    CueTarget::Reps {
                        count: exercise.reps,
                    }
                } else {
                    CueTarget::Duration {
                        seconds: self.remaining_secs,
                    }
                },
            },
            SessionPhase::RestBetweenSets { .. } | SessionPhase::RestAfterExercise => Cue::Rest {
                seconds: self.remaining_secs,
            },
            _ => return,
        };
        self.cues.emit(cue);
    }

    fn push_phase_entered(&self, events: &mut Vec<Event>) {
        let name = self
            .current_exercise()
            .map(|e| e.name.clone())
            .unwrap_or_default();
        tracing::debug!(phase = ?self.phase, exercise = %name, secs = self.remaining_secs, "phase entered");
        events.push(Event::PhaseEntered {
            exercise_index: self.index,
            exercise_name: name,
            phase: self.phase,
            duration_secs: self.remaining_secs,
            at: self.clock.now(),
        });
    }

    fn finish_session(&mut self, events: &mut Vec<Event>) {
        let exercises = self.logs.iter().filter(|log| !log.skipped).count();
        let minutes = (active_seconds(&self.logs) / 60).max(1);
        self.cues.emit(Cue::SessionComplete { exercises, minutes });

        tracing::info!(exercises, minutes, "exercise session completed");
        events.push(Event::SessionCompleted {
            logs: self.logs.clone(),
            at: self.clock.now(),
        });
    }
}
