//! Press smoothing: turns the raw trigger axis or the two pump keys into a
//! single rate-limited `effective` press in [0, 1].
//!
//! The trigger is authoritative from the first tick it reads above zero and
//! stays so until a pump key is pressed. Keys step the press linearly and
//! model alternating strokes: once the press bottoms out or tops out with no
//! key held, the stroke direction flips.

use crate::config::InputConfig;
use crate::state::{clamp01, PressMode, PressState};
use serde::{Deserialize, Serialize};

/// What one tick of smoothing produced.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PressReading {
    pub effective: f32,
    /// Gap the rate limit left between trigger and press. Zero in discrete mode.
    pub mismatch: f32,
    /// Startle earned this tick by pumping against the stroke direction.
    pub startle_impulse: f32,
    pub mode: PressMode,
    pub inflating: bool,
}

#[derive(Debug, Clone)]
pub struct InputSmoother {
    config: InputConfig,
    state: PressState,
}

impl InputSmoother {
    pub fn new(config: InputConfig) -> Self {
        Self::with_state(config, PressState::default())
    }

    pub fn with_state(config: InputConfig, mut state: PressState) -> Self {
        state.normalize();
        Self { config, state }
    }

    pub fn state(&self) -> &PressState {
        &self.state
    }

    /// Advance the press by `dt` seconds.
    ///
    /// `trigger` is `None` while the controller is not reporting. Callers are
    /// expected to skip ticks with `dt <= 0`.
    pub fn advance(
        &mut self,
        trigger: Option<f32>,
        increase_key: bool,
        decrease_key: bool,
        dt: f32,
    ) -> PressReading {
        let trigger = trigger.map(clamp01);
        let key_held = increase_key || decrease_key;

        if key_held {
            self.switch_mode(PressMode::Discrete);
        } else if trigger.is_some_and(|t| t > 0.0) {
            self.switch_mode(PressMode::Continuous);
        }

        let (mismatch, startle_impulse) = match self.state.mode {
            PressMode::Continuous => (self.follow_trigger(trigger.unwrap_or(0.0), dt), 0.0),
            PressMode::Discrete => (0.0, self.step_keys(increase_key, decrease_key, dt)),
        };

        self.state.normalize();

        PressReading {
            effective: self.state.effective,
            mismatch,
            startle_impulse,
            mode: self.state.mode,
            inflating: self.state.inflating,
        }
    }

    fn switch_mode(&mut self, mode: PressMode) {
        if self.state.mode != mode {
            tracing::debug!("Press source switched to {:?}", mode);
            self.state.mode = mode;
        }
    }

    /// Rate-limited follow. Returns the remaining gap to the trigger.
    fn follow_trigger(&mut self, target: f32, dt: f32) -> f32 {
        let step = self.config.vr_press_rate * dt;
        let gap = target - self.state.effective;

        if gap.abs() < step * self.config.snap_factor {
            self.state.effective = target;
        } else {
            self.state.effective += step.copysign(gap);
        }
        self.state.target = target;

        (target - clamp01(self.state.effective)).abs()
    }

    /// Key stepping. Returns the startle impulse for wrong-direction pumping.
    fn step_keys(&mut self, increase_key: bool, decrease_key: bool, dt: f32) -> f32 {
        let step = self.config.key_rate * dt;
        let penalty = self.config.key_sensitivity * dt;
        let mut impulse = 0.0;

        if increase_key {
            self.state.effective += step;
            if !self.state.inflating {
                impulse += penalty;
            }
        }
        if decrease_key {
            self.state.effective -= step;
            if self.state.inflating {
                impulse += penalty;
            }
        }

        self.state.effective = clamp01(self.state.effective);
        self.state.target = self.state.effective;

        if !increase_key && !decrease_key {
            if self.state.inflating && self.state.effective >= 1.0 {
                self.state.inflating = false;
                tracing::debug!("Stroke topped out, now deflating");
            } else if !self.state.inflating && self.state.effective <= 0.0 {
                self.state.inflating = true;
                tracing::debug!("Stroke bottomed out, now inflating");
            }
        }

        impulse
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn smoother() -> InputSmoother {
        InputSmoother::new(InputConfig::default())
    }

    #[test]
    fn test_trigger_is_rate_limited() {
        let mut s = smoother();
        let reading = s.advance(Some(1.0), false, false, DT);

        let step = InputConfig::default().vr_press_rate * DT;
        assert_eq!(reading.mode, PressMode::Continuous);
        assert!((reading.effective - step).abs() < 1e-6);
        assert!((reading.mismatch - (1.0 - step)).abs() < 1e-6);
    }

    #[test]
    fn test_trigger_snaps_when_close() {
        let mut s = smoother();
        // Default rate covers 1.0 in half a second
        for _ in 0..40 {
            s.advance(Some(1.0), false, false, DT);
        }
        assert_eq!(s.state().effective, 1.0);

        // A gap smaller than one step lands exactly on target
        let reading = s.advance(Some(0.99), false, false, DT);
        assert_eq!(reading.effective, 0.99);
        assert_eq!(reading.mismatch, 0.0);
    }

    #[test]
    fn test_released_trigger_keeps_continuous_mode() {
        let mut s = smoother();
        for _ in 0..40 {
            s.advance(Some(1.0), false, false, DT);
        }
        let reading = s.advance(None, false, false, DT);
        assert_eq!(reading.mode, PressMode::Continuous);
        assert!(reading.effective < 1.0);
    }

    #[test]
    fn test_key_press_takes_over_from_trigger() {
        let mut s = smoother();
        s.advance(Some(0.5), false, false, DT);
        let reading = s.advance(Some(0.5), true, false, DT);
        assert_eq!(reading.mode, PressMode::Discrete);
        assert_eq!(reading.mismatch, 0.0);
    }

    #[test]
    fn test_wrong_direction_key_startles() {
        let mut s = smoother();
        s.advance(None, true, false, 0.5);

        // Inflating: the decrease key pumps against the stroke
        let reading = s.advance(None, false, true, 0.1);
        let expected = InputConfig::default().key_sensitivity * 0.1;
        assert!((reading.startle_impulse - expected).abs() < 1e-6);
        assert!((reading.effective - 0.4).abs() < 1e-6);

        // Increase key in the stroke direction is free
        let reading = s.advance(None, true, false, 0.1);
        assert_eq!(reading.startle_impulse, 0.0);
    }

    #[test]
    fn test_alternating_strokes_flip_direction() {
        let mut s = smoother();

        // Pump to the top, then let go
        for _ in 0..12 {
            s.advance(None, true, false, 0.1);
        }
        assert_eq!(s.state().effective, 1.0);
        assert!(s.state().inflating, "direction only flips once keys are released");
        let reading = s.advance(None, false, false, 0.1);
        assert!(!reading.inflating);

        // While deflating, the increase key is the wrong one
        let reading = s.advance(None, true, false, 0.1);
        assert!(reading.startle_impulse > 0.0);

        // Release all the way down, then let go
        for _ in 0..12 {
            s.advance(None, false, true, 0.1);
        }
        assert_eq!(s.state().effective, 0.0);
        let reading = s.advance(None, false, false, 0.1);
        assert!(reading.inflating);
    }

    #[test]
    fn test_out_of_range_trigger_is_clamped() {
        let mut s = smoother();
        for _ in 0..100 {
            s.advance(Some(7.0), false, false, DT);
        }
        assert_eq!(s.state().effective, 1.0);
        assert_eq!(s.state().target, 1.0);
    }
}
