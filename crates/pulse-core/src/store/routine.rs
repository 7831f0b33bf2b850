//! Routine definitions and the built-in defaults.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::session::ExerciseStep;

fn default_true() -> bool {
    true
}

/// A named recurring break: an interval and the exercises to do when it
/// fires. The name doubles as the routine identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Routine {
    pub name: String,
    pub interval_minutes: u32,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub exercises: Vec<ExerciseStep>,
}

impl Routine {
    pub fn new(name: impl Into<String>, interval_minutes: u32, exercises: Vec<ExerciseStep>) -> Self {
        Self {
            name: name.into(),
            interval_minutes,
            is_active: true,
            exercises,
        }
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Whether this routine gets a timer.
    pub fn is_schedulable(&self) -> bool {
        self.is_active && !self.exercises.is_empty()
    }

    /// Sum of every exercise's work and rest time.
    pub fn total_duration_seconds(&self) -> u64 {
        self.exercises
            .iter()
            .map(ExerciseStep::total_duration_secs)
            .sum()
    }

    /// # Errors
    ///
    /// Returns the first problem found in the routine or its exercises.
    pub fn validate(&self, index: usize) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyRoutineName { index: index + 1 });
        }
        for (i, exercise) in self.exercises.iter().enumerate() {
            exercise.validate(&self.name, i)?;
        }
        Ok(())
    }
}

/// Validate a whole routine list: at least one routine, unique names, and
/// every routine valid.
///
/// # Errors
///
/// Returns the first validation failure.
pub fn validate_routines(routines: &[Routine]) -> Result<(), ValidationError> {
    if routines.is_empty() {
        return Err(ValidationError::NoRoutines);
    }
    let mut seen = std::collections::HashSet::new();
    for (i, routine) in routines.iter().enumerate() {
        routine.validate(i)?;
        if !seen.insert(routine.name.as_str()) {
            return Err(ValidationError::DuplicateRoutine(routine.name.clone()));
        }
    }
    Ok(())
}

/// Routines shipped with the app: a short desk break every half hour and a
/// longer active break every hour and a half.
pub fn default_routines() -> Vec<Routine> {
    vec![
        Routine::new(
            "Micro Pausa",
            30,
            vec![
                ExerciseStep::timed("Neck Stretch", 20)
                    .with_rest_after(5)
                    .with_description("Tilt your head slowly to each side")
                    .with_icon("figure.mind.and.body"),
                ExerciseStep::timed("Shoulder Rolls", 15)
                    .with_rest_after(5)
                    .with_description("Roll your shoulders backwards in big circles")
                    .with_icon("figure.cooldown"),
                ExerciseStep::timed("Eye Rest", 20)
                    .with_description("Look at something 6 meters away")
                    .with_icon("eye"),
            ],
        ),
        Routine::new(
            "Pausa Activa",
            90,
            vec![
                ExerciseStep::timed("Walk", 120)
                    .with_rest_after(10)
                    .with_description("Walk around, get some water")
                    .with_icon("figure.walk"),
                ExerciseStep::timed("Full Stretch", 60)
                    .with_rest_after(10)
                    .with_description("Reach up, then touch your toes")
                    .with_icon("figure.flexibility"),
                ExerciseStep::timed("Plank", 30)
                    .with_rest_after(10)
                    .with_description("Keep your back straight")
                    .with_icon("figure.core.training"),
                ExerciseStep::timed("Squats", 30)
                    .with_description("Slow and controlled")
                    .with_icon("figure.strengthtraining.functional"),
            ],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let routines = default_routines();
        assert!(validate_routines(&routines).is_ok());
        assert_eq!(routines[0].interval_minutes, 30);
        assert_eq!(routines[1].interval_minutes, 90);
    }

    #[test]
    fn total_duration_adds_rests() {
        let routines = default_routines();
        assert_eq!(routines[0].total_duration_seconds(), 20 + 5 + 15 + 5 + 20);
        assert_eq!(routines[1].total_duration_seconds(), 120 + 60 + 30 + 30 + 30);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let routine = Routine::new("Desk", 30, vec![ExerciseStep::timed("Neck", 10)]);
        let err = validate_routines(&[routine.clone(), routine]).unwrap_err();
        assert_eq!(err, ValidationError::DuplicateRoutine("Desk".into()));
    }

    #[test]
    fn bad_exercise_is_reported_with_routine() {
        let routine = Routine::new("Desk", 30, vec![ExerciseStep::timed("Neck", 0)]);
        assert_eq!(
            routine.validate(0).unwrap_err(),
            ValidationError::ZeroDuration {
                routine: "Desk".into(),
                exercise: "Neck".into(),
            }
        );
    }

    #[test]
    fn empty_or_inactive_routines_are_not_schedulable() {
        assert!(!Routine::new("Empty", 30, Vec::new()).is_schedulable());
        let inactive = Routine::new("Off", 30, vec![ExerciseStep::timed("Neck", 10)]).inactive();
        assert!(!inactive.is_schedulable());
    }

    #[test]
    fn routine_parses_from_toml() {
        let routine: Routine = toml::from_str(
            r#"
name = "Desk"
interval_minutes = 20

[[exercises]]
name = "Neck"
duration_secs = 20
"#,
        )
        .unwrap();
        assert!(routine.is_active);
        assert_eq!(routine.exercises[0].sets, 1);
    }
}
