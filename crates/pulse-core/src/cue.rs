//! Audio/voice guidance port.
//!
//! Engines describe what should be heard as [`Cue`] values and hand them to
//! an injected [`CueSink`]. Delivery is fire-and-forget: a sink cannot fail
//! back into the engine, and a sink that drops everything is valid.

use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::format::spoken_duration;

/// What a set of work is measured in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CueTarget {
    Duration { seconds: u64 },
    Reps { count: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cue", rename_all = "snake_case")]
pub enum Cue {
    /// A routine countdown fired.
    WorkIntervalComplete,
    Preparing {
        next_exercise: String,
        seconds: u64,
    },
    ExerciseStart {
        name: String,
        set: u32,
        total_sets: u32,
        target: CueTarget,
    },
    Rest {
        seconds: u64,
    },
    /// Pip in the last seconds of a phase.
    Countdown {
        seconds: u64,
    },
    TransitionBeep,
    AlertBeep,
    ExerciseComplete,
    SessionComplete {
        exercises: usize,
        minutes: u64,
    },
    /// Cut off whatever is being spoken.
    Stop,
}

impl Cue {
    /// Tones, as opposed to speech.
    pub fn is_sound(&self) -> bool {
        matches!(self, Cue::TransitionBeep | Cue::AlertBeep)
    }

    /// The sentence voice guidance speaks for this cue.
    pub fn spoken_text(&self) -> Option<String> {
        let text = match self {
            Cue::WorkIntervalComplete => "Time to move! Let's do some exercises.".to_string(),
            Cue::Preparing { next_exercise, .. } => format!("Get ready. Next: {next_exercise}."),
            Cue::ExerciseStart {
                name,
                set,
                total_sets,
                target,
            } => {
                let target = match target {
                    CueTarget::Duration { seconds } => spoken_duration(*seconds),
                    CueTarget::Reps { count } => format!("{count} reps"),
                };
                if *total_sets > 1 {
                    format!("{name}. Set {set} of {total_sets}. {target}. Go!")
                } else {
                    format!("{name}. {target}. Go!")
                }
            }
            Cue::Rest { seconds } => format!("Rest. {}.", spoken_duration(*seconds)),
            Cue::Countdown { seconds } => seconds.to_string(),
            Cue::ExerciseComplete => "Done! Well done.".to_string(),
            Cue::SessionComplete { exercises, minutes } => format!(
                "Session complete! {exercises} exercises in {minutes} minutes. Great job!"
            ),
            Cue::TransitionBeep | Cue::AlertBeep | Cue::Stop => return None,
        };
        Some(text)
    }
}

/// Consumer of cues. Implementations must not block the caller for long.
pub trait CueSink: Send + Sync {
    fn emit(&self, cue: Cue);
}

impl<T: CueSink + ?Sized> CueSink for Arc<T> {
    fn emit(&self, cue: Cue) {
        (**self).emit(cue);
    }
}

/// Drops every cue.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullCueSink;

impl CueSink for NullCueSink {
    fn emit(&self, _cue: Cue) {}
}

/// Keeps every cue in memory. Clones share the buffer.
#[derive(Debug, Clone, Default)]
pub struct RecordingCueSink {
    cues: Arc<Mutex<Vec<Cue>>>,
}

impl RecordingCueSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cues(&self) -> Vec<Cue> {
        self.cues
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Return and clear the buffer.
    pub fn take(&self) -> Vec<Cue> {
        std::mem::take(&mut *self.cues.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl CueSink for RecordingCueSink {
    fn emit(&self, cue: Cue) {
        self.cues
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(cue);
    }
}

/// How spoken cues are delivered.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Voice {
    pub rate: f32,
    pub volume: f32,
}

impl Default for Voice {
    fn default() -> Self {
        Self {
            rate: 0.5,
            volume: 1.0,
        }
    }
}

/// Writes cues to the log instead of a speaker.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingCueSink {
    voice: Voice,
}

impl TracingCueSink {
    pub fn new(voice: Voice) -> Self {
        Self { voice }
    }

    pub fn voice(&self) -> Voice {
        self.voice
    }
}

impl CueSink for TracingCueSink {
    fn emit(&self, cue: Cue) {
        match cue.spoken_text() {
            Some(text) => tracing::info!(
                target: "pulse::cue",
                rate = self.voice.rate,
                volume = self.voice.volume,
                "{text}"
            ),
            None => tracing::debug!(target: "pulse::cue", ?cue),
        }
    }
}

/// Applies the user's sound/voice preferences in front of another sink.
pub struct GuidanceFilter {
    inner: Arc<dyn CueSink>,
    sound_enabled: bool,
    voice_enabled: bool,
}

impl GuidanceFilter {
    pub fn new(inner: Arc<dyn CueSink>, sound_enabled: bool, voice_enabled: bool) -> Self {
        Self {
            inner,
            sound_enabled,
            voice_enabled,
        }
    }
}

impl CueSink for GuidanceFilter {
    fn emit(&self, cue: Cue) {
        let allowed = match cue {
            Cue::Stop => true,
            ref c if c.is_sound() => self.sound_enabled,
            _ => self.voice_enabled,
        };
        if allowed {
            self.inner.emit(cue);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exercise_start_text_mentions_sets_only_when_several() {
        let single = Cue::ExerciseStart {
            name: "Plank".into(),
            set: 1,
            total_sets: 1,
            target: CueTarget::Duration { seconds: 30 },
        };
        assert_eq!(single.spoken_text().unwrap(), "Plank. 30 seconds. Go!");

        let multi = Cue::ExerciseStart {
            name: "Squats".into(),
            set: 2,
            total_sets: 3,
            target: CueTarget::Reps { count: 12 },
        };
        assert_eq!(multi.spoken_text().unwrap(), "Squats. Set 2 of 3. 12 reps. Go!");
    }

    #[test]
    fn beeps_have_no_text() {
        assert!(Cue::TransitionBeep.spoken_text().is_none());
        assert!(Cue::TransitionBeep.is_sound());
    }

    #[test]
    fn filter_drops_disabled_channels() {
        let recorder = RecordingCueSink::new();
        let filter = GuidanceFilter::new(Arc::new(recorder.clone()), false, true);
        filter.emit(Cue::TransitionBeep);
        filter.emit(Cue::Rest { seconds: 10 });
        filter.emit(Cue::Stop);
        assert_eq!(recorder.cues(), vec![Cue::Rest { seconds: 10 }, Cue::Stop]);

        let recorder = RecordingCueSink::new();
        let filter = GuidanceFilter::new(Arc::new(recorder.clone()), true, false);
        filter.emit(Cue::TransitionBeep);
        filter.emit(Cue::Countdown { seconds: 3 });
        assert_eq!(recorder.take(), vec![Cue::TransitionBeep]);
        assert!(recorder.cues().is_empty());
    }
}
