//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Routine timer intervals and snooze length
//! - Exercise session behaviour (preparation countdown, auto-advance)
//! - Sound and voice guidance settings
//! - Custom routine definitions
//!
//! Configuration is stored at `~/.config/pulse/config.toml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::cue::Voice;
use crate::error::ConfigError;
use crate::session::SessionConfig;
use crate::store::{default_routines, validate_routines, Routine};

pub const MIN_SPEECH_RATE: f32 = 0.3;
pub const MAX_SPEECH_RATE: f32 = 0.7;

/// Returns `~/.config/pulse[-dev]/` based on PULSE_ENV.
///
/// Set PULSE_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if the config directory cannot be created.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .ok_or(ConfigError::NoConfigDir)?
        .join(".config");

    let env = std::env::var("PULSE_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("pulse-dev")
    } else {
        base_dir.join("pulse")
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::SaveFailed {
        path: dir.clone(),
        message: e.to_string(),
    })?;
    Ok(dir)
}

/// Routine timer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimersConfig {
    /// Interval for new routines.
    #[serde(default = "default_interval")]
    pub default_interval_minutes: u32,
    #[serde(default = "default_min_interval")]
    pub min_interval_minutes: u32,
    #[serde(default = "default_max_interval")]
    pub max_interval_minutes: u32,
    #[serde(default = "default_snooze")]
    pub snooze_minutes: u32,
    /// Start every routine timer as soon as the app runs.
    #[serde(default = "default_true")]
    pub auto_start: bool,
}

/// Exercise session settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSettings {
    #[serde(default = "default_preparation")]
    pub preparation_seconds: u64,
    #[serde(default = "default_true")]
    pub auto_advance: bool,
    #[serde(default = "default_postpone_options")]
    pub postpone_options_minutes: Vec<u32>,
}

/// Audio guidance settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioConfig {
    #[serde(default = "default_true")]
    pub sound_enabled: bool,
    #[serde(default = "default_true")]
    pub voice_guidance_enabled: bool,
    #[serde(default = "default_speech_rate")]
    pub speech_rate: f32,
    #[serde(default = "default_speech_volume")]
    pub speech_volume: f32,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/pulse/config.toml`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub timers: TimersConfig,
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub audio: AudioConfig,
    /// Custom routines. The built-in routines apply when empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub routines: Vec<Routine>,
}

// Default functions
fn default_interval() -> u32 {
    45
}
fn default_min_interval() -> u32 {
    1
}
fn default_max_interval() -> u32 {
    120
}
fn default_snooze() -> u32 {
    5
}
fn default_true() -> bool {
    true
}
fn default_preparation() -> u64 {
    5
}
fn default_postpone_options() -> Vec<u32> {
    vec![1, 2, 5]
}
fn default_speech_rate() -> f32 {
    0.5
}
fn default_speech_volume() -> f32 {
    1.0
}

impl Default for TimersConfig {
    fn default() -> Self {
        Self {
            default_interval_minutes: default_interval(),
            min_interval_minutes: default_min_interval(),
            max_interval_minutes: default_max_interval(),
            snooze_minutes: default_snooze(),
            auto_start: true,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            preparation_seconds: default_preparation(),
            auto_advance: true,
            postpone_options_minutes: default_postpone_options(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sound_enabled: true,
            voice_guidance_enabled: true,
            speech_rate: default_speech_rate(),
            speech_volume: default_speech_volume(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as number")));
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    /// `config.toml` inside [`data_dir`].
    ///
    /// # Errors
    /// Returns an error if the config directory is unavailable.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk or return default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from an explicit path, writing defaults there when the file is
    /// missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed or fails validation.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content)?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(_) => {
                tracing::info!(path = %path.display(), "no config file, writing defaults");
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| failed(e.to_string()))?;
        Ok(())
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "using default configuration");
            Self::default()
        })
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Change a value in memory by dot-separated key. The new value must
    /// have the type of the one it replaces and leave the config valid.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value is rejected.
    pub fn update(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Set a config value by key and save. Returns error if key is unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.update(key, value)?;
        self.save()
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns `InvalidValue` naming the offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.timers;
        if t.min_interval_minutes < 1 {
            return Err(ConfigError::InvalidValue {
                key: "timers.min_interval_minutes".into(),
                message: "must be at least 1".into(),
            });
        }
        if t.min_interval_minutes > t.max_interval_minutes {
            return Err(ConfigError::InvalidValue {
                key: "timers.max_interval_minutes".into(),
                message: format!("must be >= min_interval_minutes ({})", t.min_interval_minutes),
            });
        }
        if !self.routines.is_empty() {
            validate_routines(&self.routines).map_err(|e| ConfigError::InvalidValue {
                key: "routines".into(),
                message: e.to_string(),
            })?;
        }
        Ok(())
    }

    /// Clamp an interval into the configured `[min, max]` range.
    pub fn clamp_interval(&self, minutes: u32) -> u32 {
        minutes.clamp(self.timers.min_interval_minutes, self.timers.max_interval_minutes)
    }

    pub fn snooze_seconds(&self) -> u64 {
        u64::from(self.timers.snooze_minutes) * 60
    }

    /// Configured routines, or the built-in ones when none are configured.
    pub fn routines(&self) -> Vec<Routine> {
        if self.routines.is_empty() {
            default_routines()
        } else {
            self.routines.clone()
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            preparation_secs: self.session.preparation_seconds,
            auto_advance: self.session.auto_advance,
            postpone_options_minutes: self.session.postpone_options_minutes.clone(),
        }
    }

    /// Speech rate limited to what stays intelligible.
    pub fn speech_rate(&self) -> f32 {
        self.audio.speech_rate.clamp(MIN_SPEECH_RATE, MAX_SPEECH_RATE)
    }

    /// Voice settings for the cue sink.
    pub fn voice(&self) -> Voice {
        Voice {
            rate: self.speech_rate(),
            volume: self.audio.speech_volume.clamp(0.0, 1.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn config_default_values() {
        let cfg = Config::default();
        assert_eq!(cfg.timers.default_interval_minutes, 45);
        assert_eq!(cfg.timers.snooze_minutes, 5);
        assert_eq!(cfg.session.preparation_seconds, 5);
        assert_eq!(cfg.session.postpone_options_minutes, vec![1, 2, 5]);
        assert!(cfg.audio.voice_guidance_enabled);
        assert_eq!(cfg.routines().len(), 2);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let cfg: Config = toml::from_str("[timers]\nsnooze_minutes = 10\n").unwrap();
        assert_eq!(cfg.timers.snooze_minutes, 10);
        assert_eq!(cfg.timers.max_interval_minutes, 120);
        assert!(cfg.session.auto_advance);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("timers.snooze_minutes").as_deref(), Some("5"));
        assert_eq!(cfg.get("audio.sound_enabled").as_deref(), Some("true"));
        assert!(cfg.get("timers.missing_key").is_none());
    }

    #[test]
    fn set_json_value_by_path_rejects_unknown_key() {
        let mut json = serde_json::to_value(Config::default()).unwrap();
        let result = Config::set_json_value_by_path(&mut json, "timers.nonexistent", "1");
        assert!(matches!(result, Err(ConfigError::UnknownKey(_))));
    }

    #[test]
    fn update_type_checks_values() {
        let mut cfg = Config::default();
        cfg.update("session.auto_advance", "false").unwrap();
        assert!(!cfg.session.auto_advance);
        cfg.update("audio.speech_rate", "0.6").unwrap();
        assert!((cfg.audio.speech_rate - 0.6).abs() < 1e-6);

        assert!(cfg.update("session.auto_advance", "maybe").is_err());
        assert!(cfg.update("timers.snooze_minutes", "-3").is_err());
        assert_eq!(cfg.timers.snooze_minutes, 5);
    }

    #[test]
    fn update_rejects_inverted_range() {
        let mut cfg = Config::default();
        let err = cfg.update("timers.max_interval_minutes", "0").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
        assert_eq!(cfg.timers.max_interval_minutes, 120);
    }

    #[test]
    fn clamp_interval_uses_configured_range() {
        let cfg = Config::default();
        assert_eq!(cfg.clamp_interval(0), 1);
        assert_eq!(cfg.clamp_interval(45), 45);
        assert_eq!(cfg.clamp_interval(500), 120);
    }

    #[test]
    fn speech_rate_is_clamped() {
        let mut cfg = Config::default();
        cfg.audio.speech_rate = 2.0;
        assert_eq!(cfg.speech_rate(), MAX_SPEECH_RATE);
    }

    #[test]
    fn voice_carries_clamped_audio_settings() {
        let mut cfg = Config::default();
        assert_eq!(cfg.voice(), Voice::default());
        cfg.audio.speech_rate = 0.1;
        cfg.audio.speech_volume = 3.0;
        let voice = cfg.voice();
        assert_eq!(voice.rate, MIN_SPEECH_RATE);
        assert_eq!(voice.volume, 1.0);
    }

    #[test]
    fn session_config_carries_postpone_options() {
        let mut cfg = Config::default();
        cfg.update("session.postpone_options_minutes", "[10, 15]").unwrap();
        assert_eq!(cfg.session_config().postpone_options_minutes, vec![10, 15]);
    }

    #[test]
    fn load_from_missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg, Config::default());
        assert!(path.exists());
    }

    #[test]
    fn save_and_load_custom_routines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut cfg = Config::default();
        cfg.routines = vec![Routine::new(
            "Desk",
            20,
            vec![crate::session::ExerciseStep::timed("Neck", 15)],
        )];
        cfg.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.routines().len(), 1);
        assert_eq!(loaded.routines()[0].name, "Desk");
    }

    #[test]
    fn load_from_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "timers = 3").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::ParseFailed(_))
        ));
    }
}
