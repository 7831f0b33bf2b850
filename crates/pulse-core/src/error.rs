//! Core error types for pulse-core.
//!
//! The timer set and the session engine never fail: invalid transitions are
//! no-ops. Errors only exist at the edges of the library -- configuration
//! files, routine validation, and the routine store.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for pulse-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Routine store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The platform home directory could not be determined
    #[error("Could not determine the configuration directory")]
    NoConfigDir,

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Routine and exercise validation errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    /// No routines at all
    #[error("No routines defined")]
    NoRoutines,

    /// Routine with a blank name
    #[error("Routine {index} has an empty name")]
    EmptyRoutineName { index: usize },

    /// Exercise with a blank name
    #[error("Exercise {index} in \"{routine}\" has an empty name")]
    EmptyExerciseName { routine: String, index: usize },

    /// Duration-based exercise without a duration
    #[error("\"{exercise}\" in \"{routine}\" must have duration >= 1 second")]
    ZeroDuration { routine: String, exercise: String },

    /// Rep-based exercise with no time per rep
    #[error("\"{exercise}\" in \"{routine}\" must have secs_per_rep >= 1")]
    ZeroRepPace { routine: String, exercise: String },

    /// Exercise without any set
    #[error("\"{exercise}\" in \"{routine}\" must have sets >= 1")]
    ZeroSets { routine: String, exercise: String },

    /// Two routines share one identifier
    #[error("Duplicate routine name: {0}")]
    DuplicateRoutine(String),
}

/// Routine store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The requested routine does not exist
    #[error("Unknown routine: {0}")]
    UnknownRoutine(String),

    /// The store's lock was poisoned by a panicking writer
    #[error("Routine store lock poisoned")]
    Poisoned,
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseFailed(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
