//! # Pulse Core Library
//!
//! This library provides the core logic of Pulse, a movement-break reminder.
//! Several routines count down in parallel; when one reaches zero the user is
//! walked through that routine's exercises, and the countdowns pick up again
//! afterwards.
//!
//! ## Architecture
//!
//! - **Routine timers**: [`RoutineTimerSet`], a tick-driven state machine with
//!   one countdown per routine and a single-fired-routine rule
//! - **Exercise sessions**: [`ExerciseSessionEngine`], a per-second phase
//!   machine over an ordered exercise list
//! - **Coordinator**: [`Coordinator`] routes the events of one engine into the
//!   other and handles suspension and screen sleep
//! - **Ports**: [`CueSink`] for audio guidance, [`RoutineStore`] for routine
//!   definitions, [`Clock`] for time
//!
//! Neither engine reads the clock to measure time or spawns tasks; the host
//! drives both with `tick()`.

pub mod clock;
pub mod config;
pub mod coordinator;
pub mod cue;
pub mod error;
pub mod events;
pub mod format;
pub mod session;
pub mod store;
pub mod timer;

pub use clock::{Clock, Heartbeat, ManualClock, SuspendTracker, SystemClock};
pub use config::Config;
pub use coordinator::Coordinator;
pub use cue::{
    Cue, CueSink, CueTarget, GuidanceFilter, NullCueSink, RecordingCueSink, TracingCueSink, Voice,
};
pub use error::{ConfigError, CoreError, StoreError, ValidationError};
pub use events::Event;
pub use session::{
    ExerciseLog, ExerciseSessionEngine, ExerciseStep, SessionConfig, SessionPhase, SessionSnapshot,
};
pub use store::{MemoryRoutineStore, Routine, RoutineStore, WorkSession};
pub use timer::{
    RoutineInterval, RoutineTimer, RoutineTimerSet, RoutineTimerState, TimerSetSnapshot,
    TimerSetState,
};
