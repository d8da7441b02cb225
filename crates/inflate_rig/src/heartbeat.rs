//! Heartbeat configuration for the tick driver
//!
//! The heartbeat determines how often the simulation is advanced. It should
//! match the headset's display refresh so every rendered frame sees a fresh
//! rig pose.

use std::time::Duration;

/// Configuration for the driver heartbeat
#[derive(Debug, Clone)]
pub struct HeartbeatConfig {
    /// How often to tick the simulation (default: 72 Hz)
    pub interval: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self::from_hz(72.0)
    }
}

impl HeartbeatConfig {
    /// Tick `hz` times per second. Non-positive rates fall back to the default.
    pub fn from_hz(hz: f32) -> Self {
        let hz = if hz.is_finite() && hz > 0.0 { hz } else { 72.0 };
        Self {
            interval: Duration::from_secs_f64(1.0 / f64::from(hz)),
        }
    }
}
