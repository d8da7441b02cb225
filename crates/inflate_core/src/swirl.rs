//! Joystick swirl detection.
//!
//! A rolling window of stick samples is turned into a "swirl rating": the
//! magnitude-weighted angular speed of the stick, relative to a reference
//! speed. Circling exactly at the reference speed with the stick fully
//! deflected rates 1.0; anything faster spills into `overkill`.

use crate::config::JoystickConfig;
use crate::state::clamp01;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::f32::consts::{PI, TAU};

/// Hard cap on retained samples, independent of tick rate.
const MAX_SAMPLES: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SwirlReading {
    /// Weighted angular speed over `swirl_speed` (unitless, typically 0 - 2+)
    pub rating: f32,
    /// `clamp01(rating - 1)`: the part of the rating past the safe speed
    pub overkill: f32,
    /// Deflection of the newest sample (0.0 - 1.0)
    pub magnitude: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct StickSample {
    x: f32,
    y: f32,
    /// Seconds since the history was created
    t: f64,
}

impl StickSample {
    fn magnitude(&self) -> f32 {
        self.x.hypot(self.y)
    }

    fn angle(&self) -> f32 {
        self.y.atan2(self.x)
    }
}

#[derive(Debug, Clone)]
pub struct JoystickHistory {
    window_secs: f64,
    swirl_speed: f32,
    samples: VecDeque<StickSample>,
    clock: f64,
}

impl JoystickHistory {
    pub fn new(config: &JoystickConfig) -> Self {
        Self {
            window_secs: f64::from(config.window_secs),
            swirl_speed: config.swirl_speed,
            samples: VecDeque::with_capacity(64),
            clock: 0.0,
        }
    }

    /// Append the stick position reached after `dt` more seconds and evict
    /// whatever fell out of the window.
    pub fn push(&mut self, x: f32, y: f32, dt: f32) {
        self.clock += f64::from(dt);
        self.samples.push_back(StickSample {
            x: x.clamp(-1.0, 1.0),
            y: y.clamp(-1.0, 1.0),
            t: self.clock,
        });

        let horizon = self.clock - self.window_secs;
        while self.samples.front().is_some_and(|s| s.t < horizon) {
            self.samples.pop_front();
        }
        while self.samples.len() > MAX_SAMPLES {
            self.samples.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn reading(&self) -> SwirlReading {
        let (Some(oldest), Some(newest)) = (self.samples.front(), self.samples.back()) else {
            return SwirlReading::default();
        };
        let magnitude = newest.magnitude().min(1.0);

        let elapsed = (newest.t - oldest.t) as f32;
        if elapsed <= 0.0 {
            return SwirlReading {
                magnitude,
                ..Default::default()
            };
        }

        let mut swept = 0.0;
        for (prev, next) in self.samples.iter().zip(self.samples.iter().skip(1)) {
            // Angle is undefined at the centre
            if prev.magnitude() == 0.0 || next.magnitude() == 0.0 {
                continue;
            }
            swept += wrap_angle(next.angle() - prev.angle()) * next.magnitude();
        }

        let rating = (swept.abs() / elapsed) / self.swirl_speed;
        SwirlReading {
            rating,
            overkill: clamp01(rating - 1.0),
            magnitude,
        }
    }
}

/// Wrap an angle difference into [-PI, PI).
fn wrap_angle(d: f32) -> f32 {
    (d + PI).rem_euclid(TAU) - PI
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    /// Circle the stick at `omega` rad/s with the given deflection.
    fn circle(history: &mut JoystickHistory, omega: f32, radius: f32, secs: f32) {
        let ticks = (secs / DT).round() as usize;
        let mut angle = 0.0f32;
        for _ in 0..ticks {
            angle += omega * DT;
            history.push(radius * angle.cos(), radius * angle.sin(), DT);
        }
    }

    #[test]
    fn test_empty_history_reads_zero() {
        let history = JoystickHistory::new(&JoystickConfig::default());
        assert_eq!(history.reading(), SwirlReading::default());
    }

    #[test]
    fn test_still_stick_has_no_swirl() {
        let mut history = JoystickHistory::new(&JoystickConfig::default());
        for _ in 0..60 {
            history.push(1.0, 0.0, DT);
        }
        let reading = history.reading();
        assert_eq!(reading.rating, 0.0);
        assert_eq!(reading.magnitude, 1.0);
    }

    #[test]
    fn test_rating_matches_reference_speed() {
        let config = JoystickConfig::default();
        let mut history = JoystickHistory::new(&config);
        circle(&mut history, config.swirl_speed, 1.0, 1.0);

        let reading = history.reading();
        assert!((reading.rating - 1.0).abs() < 0.02, "rating={}", reading.rating);
        assert!(reading.overkill < 0.02);
    }

    #[test]
    fn test_fast_swirl_overkills() {
        let config = JoystickConfig::default();
        let mut history = JoystickHistory::new(&config);
        circle(&mut history, config.swirl_speed * 1.5, 1.0, 1.0);

        let reading = history.reading();
        assert!((reading.rating - 1.5).abs() < 0.03, "rating={}", reading.rating);
        assert!((reading.overkill - 0.5).abs() < 0.03);
    }

    #[test]
    fn test_direction_does_not_matter() {
        let config = JoystickConfig::default();
        let mut cw = JoystickHistory::new(&config);
        let mut ccw = JoystickHistory::new(&config);
        circle(&mut cw, -config.swirl_speed, 1.0, 1.0);
        circle(&mut ccw, config.swirl_speed, 1.0, 1.0);
        assert!((cw.reading().rating - ccw.reading().rating).abs() < 1e-3);
    }

    #[test]
    fn test_partial_deflection_scales_rating() {
        let config = JoystickConfig::default();
        let mut history = JoystickHistory::new(&config);
        circle(&mut history, config.swirl_speed, 0.5, 1.0);
        assert!((history.reading().rating - 0.5).abs() < 0.02);
    }

    #[test]
    fn test_window_evicts_old_samples() {
        let config = JoystickConfig::default();
        let mut history = JoystickHistory::new(&config);
        for _ in 0..600 {
            history.push(0.0, 1.0, DT);
        }
        // 0.5 s at 60 Hz, plus the sample sitting on the window edge
        assert!(history.len() <= 32, "len={}", history.len());
        assert!(history.len() >= 30);
    }

    #[test]
    fn test_sample_cap_holds_with_tiny_dt() {
        let mut history = JoystickHistory::new(&JoystickConfig::default());
        for _ in 0..5_000 {
            history.push(1.0, 0.0, 1e-5);
        }
        assert_eq!(history.len(), MAX_SAMPLES);
    }

    #[test]
    fn test_wrap_angle() {
        assert!((wrap_angle(3.0 * PI / 2.0) + PI / 2.0).abs() < 1e-5);
        assert!((wrap_angle(-3.0 * PI / 2.0) - PI / 2.0).abs() < 1e-5);
        assert!((wrap_angle(0.1) - 0.1).abs() < 1e-6);
    }
}
