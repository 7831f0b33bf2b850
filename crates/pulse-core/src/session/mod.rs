//! Guided exercise sessions.

mod engine;
mod exercise;
mod log;
mod phase;

pub use engine::{ExerciseSessionEngine, SessionConfig, SessionSnapshot};
pub use exercise::ExerciseStep;
pub use log::{active_seconds, ExerciseLog};
pub use phase::SessionPhase;
