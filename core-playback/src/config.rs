//! # Playback Configuration
//!
//! Tunables for the engine, the preload cache and the session.

use crate::types::Language;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Audio engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Upper bound on fetch plus decode readiness for `play`.
    ///
    /// Default: 5 seconds.
    #[serde(default = "default_ready_timeout")]
    pub ready_timeout: Duration,

    /// Volume applied when the engine is created.
    ///
    /// Default: 1.0.
    #[serde(default = "default_initial_volume")]
    pub initial_volume: f32,

    /// Origin for relative audio paths such as `/audio/a1.mp3`.
    ///
    /// Default: none, relative paths are fetched as given.
    #[serde(default)]
    pub origin: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ready_timeout: default_ready_timeout(),
            initial_volume: default_initial_volume(),
            origin: None,
        }
    }
}

impl EngineConfig {
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.ready_timeout.is_zero() {
            return Err("ready_timeout must be greater than zero".to_string());
        }
        if !(0.0..=1.0).contains(&self.initial_volume) {
            return Err(format!(
                "initial_volume must be between 0.0 and 1.0, got {}",
                self.initial_volume
            ));
        }
        Ok(())
    }
}

/// Preload cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreloadConfig {
    /// Whether `preload` does anything at all.
    ///
    /// Default: true.
    #[serde(default = "default_preload_enabled")]
    pub enabled: bool,

    /// Upper bound on fetch plus probe for one entry.
    ///
    /// Default: 10 seconds.
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout: Duration,

    /// Maximum number of ready buffers retained. The least recently used
    /// entry is released first.
    ///
    /// Default: 8.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

impl Default for PreloadConfig {
    fn default() -> Self {
        Self {
            enabled: default_preload_enabled(),
            probe_timeout: default_probe_timeout(),
            max_entries: default_max_entries(),
        }
    }
}

impl PreloadConfig {
    /// A cache that never fetches.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_entries == 0 {
            return Err("max_entries must be at least 1".to_string());
        }
        if self.probe_timeout.is_zero() {
            return Err("probe_timeout must be greater than zero".to_string());
        }
        Ok(())
    }
}

/// Playback session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Language of a fresh session.
    ///
    /// Default: Japanese.
    #[serde(default)]
    pub default_language: Language,

    /// Carry the elapsed offset across a language switch.
    ///
    /// Default: true.
    #[serde(default = "default_resume_offset")]
    pub resume_offset_on_language_switch: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_language: Language::default(),
            resume_offset_on_language_switch: default_resume_offset(),
        }
    }
}

/// Everything the player needs, grouped.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub preload: PreloadConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

impl PlayerConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.engine.validate()?;
        self.preload.validate()?;
        Ok(())
    }
}

// Default value functions for serde

fn default_ready_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_initial_volume() -> f32 {
    1.0
}

fn default_preload_enabled() -> bool {
    true
}

fn default_probe_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_max_entries() -> usize {
    8
}

fn default_resume_offset() -> bool {
    true
}
