use crate::frame::RigCurves;
use crate::heartbeat::HeartbeatConfig;
use anyhow::{Context, Result};
use inflate_core::ConfigError;
use serde::{Deserialize, Serialize};

/// The `[rig]` section of the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RigConfig {
    /// Simulation ticks per second
    pub tick_hz: f32,
    /// Lerp factor for emotion inertia (0.0 = frozen, 1.0 = instant)
    pub smoothing: f32,
    /// Blend jumps larger than this skip smoothing
    pub surprise_bypass_threshold: f32,
    pub curves: RigCurves,
}

impl Default for RigConfig {
    fn default() -> Self {
        Self {
            tick_hz: 72.0,
            smoothing: 0.3,
            surprise_bypass_threshold: 0.5,
            curves: RigCurves::default(),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct RigSection {
    #[serde(default)]
    rig: RigConfig,
}

impl RigConfig {
    /// Pull the `[rig]` table out of a full config document; other tables
    /// are ignored.
    pub fn from_toml(content: &str) -> Result<Self> {
        let section: RigSection =
            toml::from_str(content).with_context(|| "Failed to parse [rig] config")?;
        section.rig.validate()?;
        Ok(section.rig)
    }

    /// Reject values that would turn every frame into NaN or stall the heartbeat.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("rig.tick_hz", self.tick_hz)?;
        in_range("rig.smoothing", self.smoothing, 0.0, 1.0)?;
        if finite("rig.surprise_bypass_threshold", self.surprise_bypass_threshold)? < 0.0 {
            return Err(ConfigError::Negative {
                field: "rig.surprise_bypass_threshold",
                value: self.surprise_bypass_threshold,
            });
        }

        let c = &self.curves;
        positive("rig.curves.fill_max", c.fill_max)?;
        for (field, (lo, hi)) in [
            ("rig.curves.fill_to_tail_scale", c.fill_to_tail_scale),
            ("rig.curves.fill_to_ear_scale", c.fill_to_ear_scale),
            ("rig.curves.fill_to_belly_blend", c.fill_to_belly_blend),
            ("rig.curves.horny_to_blush", c.horny_to_blush),
            ("rig.curves.startle_to_pupil_size", c.startle_to_pupil_size),
        ] {
            finite(field, lo)?;
            finite(field, hi)?;
        }
        Ok(())
    }

    /// Render as a `[rig]` table, ready to append to a full config document.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(&RigSection { rig: self.clone() })
            .with_context(|| "Failed to serialize [rig] config")
    }

    pub fn heartbeat(&self) -> HeartbeatConfig {
        HeartbeatConfig::from_hz(self.tick_hz)
    }
}

fn finite(field: &'static str, value: f32) -> Result<f32, ConfigError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ConfigError::NotFinite { field, value })
    }
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_section_uses_defaults() {
        let cfg = RigConfig::from_toml("[pump]\npump_volume = 0.3\n").unwrap();
        assert_eq!(cfg, RigConfig::default());
    }

    #[test]
    fn test_parse_rig_section() {
        let toml_str = r#"
[rig]
tick_hz = 90.0
smoothing = 0.5

[rig.curves]
fill_to_tail_scale = [1.0, 2.0]
"#;
        let cfg = RigConfig::from_toml(toml_str).unwrap();
        assert_eq!(cfg.tick_hz, 90.0);
        assert_eq!(cfg.smoothing, 0.5);
        assert_eq!(cfg.curves.fill_to_tail_scale, (1.0, 2.0));
        assert_eq!(cfg.curves.fill_max, 1.5);
        assert_eq!(cfg.surprise_bypass_threshold, 0.5);
    }

    #[test]
    fn test_to_toml_reads_back() {
        let cfg = RigConfig {
            tick_hz: 90.0,
            ..Default::default()
        };
        let rendered = cfg.to_toml().unwrap();
        assert!(rendered.contains("[rig]"));
        assert_eq!(RigConfig::from_toml(&rendered).unwrap(), cfg);
    }

    #[test]
    fn test_nan_smoothing_rejected() {
        let cfg = RigConfig {
            smoothing: f32::NAN,
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::NotFinite { field: "rig.smoothing", .. })
        ));

        let cfg = RigConfig {
            surprise_bypass_threshold: f32::NAN,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_invalid_rig_section_fails_to_load() {
        let err = RigConfig::from_toml("[rig]\nsmoothing = 1.5\n").unwrap_err();
        assert!(format!("{:#}", err).contains("rig.smoothing"), "{:#}", err);

        assert!(RigConfig::from_toml("[rig]\ntick_hz = 0.0\n").is_err());
    }
}
