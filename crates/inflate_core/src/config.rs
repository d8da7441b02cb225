use crate::error::ConfigError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

// ============================================================================
// Top-level config
// ============================================================================

/// Every tunable of the simulation core, one section per component.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub input: InputConfig,
    pub pump: PumpConfig,
    pub joystick: JoystickConfig,
    pub emotion: EmotionConfig,
}

impl SimConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    /// After loading, env var overrides are applied and the result is validated.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let mut config = Self::from_toml(&content)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document without touching the environment.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).with_context(|| "Failed to parse TOML config")
    }

    /// Try to load from path; if the file is missing or invalid, return defaults
    /// with env overrides.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::info!("Config file not found or invalid ({:#}), using defaults", e);
                let mut cfg = Self::default();
                cfg.apply_env_overrides();
                if let Err(e) = cfg.validate() {
                    tracing::warn!("Env overrides rejected ({}), using pure defaults", e);
                    return Self::default();
                }
                cfg
            }
        }
    }

    /// Render the effective configuration back to TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).with_context(|| "Failed to serialize config")
    }

    /// Reject values that would make the dynamics diverge or stall.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.input.validate()?;
        self.pump.validate()?;
        self.joystick.validate()?;
        self.emotion.validate()
    }

    fn apply_env_overrides(&mut self) {
        override_f32("INFLATE_PUMP_VOLUME", &mut self.pump.pump_volume);
        override_f32("INFLATE_PUMP_RETAINED", &mut self.pump.pump_retained);
        override_f32("INFLATE_FILL_CEILING", &mut self.pump.fill_ceiling);
        override_f32("INFLATE_SWIRL_SPEED", &mut self.joystick.swirl_speed);
        override_f32("INFLATE_WORK_UP_TIME", &mut self.emotion.horny_work_up_time);
    }
}

fn override_f32(var: &str, slot: &mut f32) {
    if let Ok(v) = std::env::var(var) {
        match v.parse() {
            Ok(n) => *slot = n,
            Err(_) => tracing::warn!("Ignoring {}={:?}: not a number", var, v),
        }
    }
}

// ============================================================================
// Validation helpers
// ============================================================================

fn finite(field: &'static str, value: f32) -> Result<f32, ConfigError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ConfigError::NotFinite { field, value })
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if finite(field, value)? < 0.0 {
        return Err(ConfigError::Negative { field, value });
    }
    Ok(())
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if finite(field, value)? <= 0.0 {
        return Err(ConfigError::NotPositive { field, value });
    }
    Ok(())
}

fn in_range(field: &'static str, value: f32, min: f32, max: f32) -> Result<(), ConfigError> {
    let value = finite(field, value)?;
    if value < min || value > max {
        return Err(ConfigError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}

// ============================================================================
// Sub-configs
// ============================================================================

/// Press smoothing for the trigger axis and the two pump keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Max change of the effective press per second while the trigger drives it.
    pub vr_press_rate: f32,
    /// Fraction of one tick's step below which the press snaps onto the trigger.
    pub snap_factor: f32,
    /// Press change per second while a pump key is held.
    pub key_rate: f32,
    /// Startle per second while pumping against the current stroke direction.
    pub key_sensitivity: f32,
    /// Retained fill removed per second at full undo.
    pub undo_rate: f32,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            vr_press_rate: 2.0,
            snap_factor: 0.95,
            key_rate: 1.0,
            key_sensitivity: 0.5,
            undo_rate: 0.25,
        }
    }
}

impl InputConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        positive("input.vr_press_rate", self.vr_press_rate)?;
        in_range("input.snap_factor", self.snap_factor, f32::MIN_POSITIVE, 1.0)?;
        positive("input.key_rate", self.key_rate)?;
        non_negative("input.key_sensitivity", self.key_sensitivity)?;
        non_negative("input.undo_rate", self.undo_rate)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PumpConfig {
    /// How much displayed fill one unit of press is worth.
    pub pump_volume: f32,
    /// Fraction of each released stroke that stays permanently.
    pub pump_retained: f32,
    /// Hard cap on displayed and retained fill.
    pub fill_ceiling: f32,
}

impl Default for PumpConfig {
    fn default() -> Self {
        Self {
            pump_volume: 0.2,
            pump_retained: 0.4,
            fill_ceiling: 1.5,
        }
    }
}

impl PumpConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        non_negative("pump.pump_volume", self.pump_volume)?;
        in_range("pump.pump_retained", self.pump_retained, 0.0, 1.0)?;
        positive("pump.fill_ceiling", self.fill_ceiling)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JoystickConfig {
    /// Length of the rolling sample window in seconds.
    pub window_secs: f32,
    /// Weighted angular speed (rad/s) that rates as 1.0.
    pub swirl_speed: f32,
    /// Stick deflection below which swirling does not arouse.
    pub dead_zone: f32,
    /// Startle per second per unit of overkill.
    pub joystick_sensitivity: f32,
}

impl Default for JoystickConfig {
    fn default() -> Self {
        Self {
            window_secs: 0.5,
            swirl_speed: 6.0,
            dead_zone: 0.2,
            joystick_sensitivity: 0.5,
        }
    }
}

impl JoystickConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        positive("joystick.window_secs", self.window_secs)?;
        positive("joystick.swirl_speed", self.swirl_speed)?;
        in_range("joystick.dead_zone", self.dead_zone, 0.0, 1.0)?;
        non_negative("joystick.joystick_sensitivity", self.joystick_sensitivity)
    }
}

/// Coefficients of the startle / horny / concern integrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmotionConfig {
    pub vr_sensitivity: f32,
    /// Seconds of on-target swirling needed to go from 0 to fully horny.
    pub horny_work_up_time: f32,
    pub startle_decay_rate: f32,
    pub horny_decay_rate: f32,
    /// Horny level above which the concern ceiling drops below 1.
    pub horny_concern_threshold: f32,
    pub horny_concern_suppression: f32,
    /// Concern only reacts to the fill while startle is below this.
    pub startle_settled_threshold: f32,
    pub concern_fill_threshold: f32,
    pub concern_equilibrium: f32,
    pub concern_drift_rate: f32,
}

impl Default for EmotionConfig {
    fn default() -> Self {
        Self {
            vr_sensitivity: 1.0,
            horny_work_up_time: 5.0,
            startle_decay_rate: 0.1,
            horny_decay_rate: 0.05,
            horny_concern_threshold: 0.5,
            horny_concern_suppression: 2.0,
            startle_settled_threshold: 0.1,
            concern_fill_threshold: 0.5,
            concern_equilibrium: 0.5,
            concern_drift_rate: 0.05,
        }
    }
}

impl EmotionConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        non_negative("emotion.vr_sensitivity", self.vr_sensitivity)?;
        positive("emotion.horny_work_up_time", self.horny_work_up_time)?;
        non_negative("emotion.startle_decay_rate", self.startle_decay_rate)?;
        non_negative("emotion.horny_decay_rate", self.horny_decay_rate)?;
        in_range(
            "emotion.horny_concern_threshold",
            self.horny_concern_threshold,
            0.0,
            1.0,
        )?;
        non_negative(
            "emotion.horny_concern_suppression",
            self.horny_concern_suppression,
        )?;
        in_range(
            "emotion.startle_settled_threshold",
            self.startle_settled_threshold,
            0.0,
            1.0,
        )?;
        non_negative("emotion.concern_fill_threshold", self.concern_fill_threshold)?;
        in_range("emotion.concern_equilibrium", self.concern_equilibrium, 0.0, 1.0)?;
        non_negative("emotion.concern_drift_rate", self.concern_drift_rate)
    }
}

// ============================================================================
// Tests
// ============================================================================
