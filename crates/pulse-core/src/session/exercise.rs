use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

fn default_sets() -> u32 {
    1
}
fn default_rest_secs() -> u64 {
    15
}
fn default_secs_per_rep() -> u64 {
    3
}
fn default_icon() -> String {
    "figure.walk".into()
}

/// One exercise of a routine, as the session engine sees it.
///
/// An exercise is either timed (`duration_secs`) or rep-based
/// (`reps > 0`, paced at `secs_per_rep`). Icon and description are carried
/// for the host and ignored by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseStep {
    pub name: String,
    #[serde(default)]
    pub duration_secs: u64,
    /// Rep count; 0 means the exercise is timed.
    #[serde(default)]
    pub reps: u32,
    #[serde(default = "default_secs_per_rep")]
    pub secs_per_rep: u64,
    #[serde(default = "default_sets")]
    pub sets: u32,
    /// Rest between two sets of this exercise.
    #[serde(default = "default_rest_secs")]
    pub rest_secs: u64,
    /// Rest once the last set is done.
    #[serde(default)]
    pub rest_after_secs: u64,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_icon")]
    pub icon: String,
}

impl ExerciseStep {
    /// A timed, single-set exercise.
    pub fn timed(name: impl Into<String>, duration_secs: u64) -> Self {
        Self {
            name: name.into(),
            duration_secs,
            reps: 0,
            secs_per_rep: default_secs_per_rep(),
            sets: default_sets(),
            rest_secs: default_rest_secs(),
            rest_after_secs: 0,
            description: String::new(),
            icon: default_icon(),
        }
    }

    /// A rep-based, single-set exercise.
    pub fn reps(name: impl Into<String>, reps: u32, secs_per_rep: u64) -> Self {
        Self {
            reps,
            secs_per_rep,
            ..Self::timed(name, 0)
        }
    }

    pub fn with_sets(mut self, sets: u32) -> Self {
        self.sets = sets;
        self
    }

    pub fn with_rest(mut self, rest_secs: u64) -> Self {
        self.rest_secs = rest_secs;
        self
    }

    pub fn with_rest_after(mut self, rest_after_secs: u64) -> Self {
        self.rest_after_secs = rest_after_secs;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = icon.into();
        self
    }

    pub fn is_rep_based(&self) -> bool {
        self.reps > 0
    }

    /// Work time of one set. For rep-based exercises this is
    /// `reps × secs_per_rep`; the stored duration is ignored.
    pub fn effective_duration_secs(&self) -> u64 {
        if self.is_rep_based() {
            u64::from(self.reps).saturating_mul(self.secs_per_rep)
        } else {
            self.duration_secs
        }
    }

    /// Set count, with anything below 1 treated as 1.
    pub fn effective_sets(&self) -> u32 {
        self.sets.max(1)
    }

    /// Work, inter-set rest and post-exercise rest combined.
    pub fn total_duration_secs(&self) -> u64 {
        let sets = u64::from(self.effective_sets());
        self.effective_duration_secs()
            .saturating_mul(sets)
            .saturating_add(self.rest_secs.saturating_mul(sets - 1))
            .saturating_add(self.rest_after_secs)
    }

    /// Check the definition the way routine files are checked on import.
    ///
    /// # Errors
    ///
    /// Returns an error for a blank name, a timed exercise without duration,
    /// a rep-based exercise without a pace, or zero sets.
    pub fn validate(&self, routine: &str, index: usize) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyExerciseName {
                routine: routine.to_string(),
                index: index + 1,
            });
        }
        if !self.is_rep_based() && self.duration_secs < 1 {
            return Err(ValidationError::ZeroDuration {
                routine: routine.to_string(),
                exercise: self.name.clone(),
            });
        }
        if self.is_rep_based() && self.secs_per_rep < 1 {
            return Err(ValidationError::ZeroRepPace {
                routine: routine.to_string(),
                exercise: self.name.clone(),
            });
        }
        if self.sets < 1 {
            return Err(ValidationError::ZeroSets {
                routine: routine.to_string(),
                exercise: self.name.clone(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rep_based_duration_ignores_stored_duration() {
        let mut squat = ExerciseStep::reps("Squats", 12, 3);
        squat.duration_secs = 999;
        assert!(squat.is_rep_based());
        assert_eq!(squat.effective_duration_secs(), 36);
    }

    #[test]
    fn zero_sets_count_as_one() {
        let plank = ExerciseStep::timed("Plank", 30).with_sets(0);
        assert_eq!(plank.effective_sets(), 1);
    }

    #[test]
    fn total_duration_includes_rests() {
        let step = ExerciseStep::timed("Plank", 30)
            .with_sets(3)
            .with_rest(10)
            .with_rest_after(20);
        assert_eq!(step.total_duration_secs(), 30 * 3 + 10 * 2 + 20);
    }

    #[test]
    fn validate_rejects_bad_definitions() {
        assert!(ExerciseStep::timed("Walk", 60).validate("r", 0).is_ok());
        assert!(ExerciseStep::reps("Squats", 10, 3).validate("r", 0).is_ok());
        assert_eq!(
            ExerciseStep::timed("  ", 60).validate("r", 1),
            Err(ValidationError::EmptyExerciseName {
                routine: "r".into(),
                index: 2
            })
        );
        assert!(matches!(
            ExerciseStep::timed("Walk", 0).validate("r", 0),
            Err(ValidationError::ZeroDuration { .. })
        ));
        assert!(matches!(
            ExerciseStep::timed("Walk", 10).with_sets(0).validate("r", 0),
            Err(ValidationError::ZeroSets { .. })
        ));
        assert!(matches!(
            ExerciseStep::reps("Squats", 10, 0).validate("r", 0),
            Err(ValidationError::ZeroRepPace { .. })
        ));
    }

    #[test]
    fn missing_fields_take_defaults() {
        let step: ExerciseStep = toml::from_str("name = \"Walk\"\nduration_secs = 120").unwrap();
        assert_eq!(step.sets, 1);
        assert_eq!(step.rest_secs, 15);
        assert_eq!(step.rest_after_secs, 0);
        assert_eq!(step.icon, "figure.walk");
    }
}
