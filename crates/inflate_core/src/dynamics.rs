//! Emotion dynamics: how startle, horny and concern evolve each tick.
//!
//! The update is a continuous integrator, not a state machine. Terms are
//! applied in a fixed order and later terms read what earlier ones wrote:
//!
//! 1. stimulus increments (press mismatch, wrong-way pumping, swirl)
//! 2. linear decay of startle and horny
//! 3. concern picks up what startle lost
//! 4. arousal caps concern
//! 5. once startle has settled, concern follows the fill level
//! 6. clamp everything to [0, 1]

use crate::config::{EmotionConfig, JoystickConfig};
use crate::state::{clamp01, EmotionState};
use crate::swirl::SwirlReading;
use serde::{Deserialize, Serialize};

/// Trait for implementing emotion dynamics
pub trait Dynamics: Send + Sync {
    /// Advance the emotions by `dt` seconds given this tick's stimulus
    fn step(&self, state: &mut EmotionState, stimulus: &EmotionStimulus, dt: f32);
}

/// Everything the emotions react to in one tick.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EmotionStimulus {
    /// Clamped displayed fill from the pump
    pub displayed_fill: f32,
    /// Trigger-vs-press gap; zero unless the trigger drives the press
    pub press_mismatch: f32,
    /// Startle already integrated over the tick (wrong-way key pumping)
    pub startle_impulse: f32,
    pub swirl: SwirlReading,
}

/// The girl's default temperament.
#[derive(Debug, Clone)]
pub struct GirlDynamics {
    pub emotion: EmotionConfig,
    /// Swirls with a smaller stick deflection do not arouse
    pub dead_zone: f32,
    pub joystick_sensitivity: f32,
}

impl Default for GirlDynamics {
    fn default() -> Self {
        Self::new(EmotionConfig::default(), &JoystickConfig::default())
    }
}

impl Dynamics for GirlDynamics {
    fn step(&self, state: &mut EmotionState, stimulus: &EmotionStimulus, dt: f32) {
        let c = &self.emotion;

        // === 1. Stimulus ===
        state.startle += stimulus.startle_impulse;
        state.startle += stimulus.press_mismatch * c.vr_sensitivity * dt;

        let swirl = &stimulus.swirl;
        state.startle += swirl.overkill * self.joystick_sensitivity * dt;
        if swirl.magnitude > self.dead_zone {
            state.horny += (swirl.rating - swirl.overkill) / c.horny_work_up_time * dt;
        }

        // === 2. Decay ===
        state.startle -= c.startle_decay_rate * dt;
        state.horny -= c.horny_decay_rate * dt;

        // === 3. Concern rises as startle wears off ===
        // Whatever decay pushed startle below zero was never really lost.
        state.concern += c.startle_decay_rate * dt - clamp01(-state.startle);

        // === 4. Arousal crowds out concern ===
        state.concern = state.concern.min(self.concern_ceiling(state.horny));

        // === 5. Settled: concern follows the fill ===
        if state.startle < c.startle_settled_threshold {
            let drift = c.concern_drift_rate * dt;
            if stimulus.displayed_fill > c.concern_fill_threshold {
                state.concern = move_towards(state.concern, c.concern_equilibrium, drift);
            } else {
                state.concern -= drift;
            }
        }

        // === 6. Clamp ===
        state.normalize();
    }
}

impl GirlDynamics {
    pub fn new(emotion: EmotionConfig, joystick: &JoystickConfig) -> Self {
        Self {
            emotion,
            dead_zone: joystick.dead_zone,
            joystick_sensitivity: joystick.joystick_sensitivity,
        }
    }

    /// Highest concern the given horny level allows.
    pub fn concern_ceiling(&self, horny: f32) -> f32 {
        1.0 - (horny - self.emotion.horny_concern_threshold) * self.emotion.horny_concern_suppression
    }
}

/// Step `from` toward `to` by at most `max_delta` without overshooting.
fn move_towards(from: f32, to: f32, max_delta: f32) -> f32 {
    let gap = to - from;
    if gap.abs() <= max_delta {
        to
    } else {
        from + max_delta.copysign(gap)
    }
}
