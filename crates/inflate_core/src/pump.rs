//! The pump: a two-stage fill accumulator.
//!
//! Pushing the press in adds temporary fill one-for-one. Letting it out
//! drains the same amount of temporary fill, but a `pump_retained` share of
//! each released stroke (scaled by `pump_volume`) stays for good.

use crate::config::PumpConfig;
use crate::state::{sanitize_f32, FillState};

/// Temporary fill below `-NEGATIVE_FILL_TOLERANCE` means the press history
/// and the fill state disagree.
pub const NEGATIVE_FILL_TOLERANCE: f32 = 1e-4;

#[derive(Debug, Clone)]
pub struct Pump {
    config: PumpConfig,
    state: FillState,
}

impl Pump {
    pub fn new(config: PumpConfig) -> Self {
        Self::with_state(config, FillState::default())
    }

    pub fn with_state(config: PumpConfig, mut state: FillState) -> Self {
        state.retained = sanitize_f32(state.retained, 0.0).clamp(0.0, config.fill_ceiling);
        state.temporary = sanitize_f32(state.temporary, 0.0);
        state.last_press = sanitize_f32(state.last_press, 0.0).clamp(0.0, 1.0);
        Self { config, state }
    }

    pub fn state(&self) -> &FillState {
        &self.state
    }

    /// Feed this tick's effective press and return the raw displayed fill.
    ///
    /// No clamping happens here; see [`Pump::displayed_clamped`].
    pub fn advance(&mut self, press: f32) -> f32 {
        let delta = press - self.state.last_press;

        if delta > 0.0 {
            self.state.temporary += delta;
        } else if delta < 0.0 {
            let released = -delta;
            self.state.retained +=
                released * self.config.pump_retained * self.config.pump_volume;
            self.state.temporary -= released;
        }
        self.state.last_press = press;

        if self.state.temporary < -NEGATIVE_FILL_TOLERANCE {
            tracing::warn!(
                "Temporary fill went negative ({:.5}); press history is out of sync",
                self.state.temporary
            );
        }

        self.displayed()
    }

    /// Remove up to `amount` of retained fill, stopping at zero.
    pub fn undo(&mut self, amount: f32) {
        if amount > 0.0 {
            self.state.retained = (self.state.retained - amount).max(0.0);
        }
    }

    /// Enforce the hard ceiling on retained fill.
    pub fn cap(&mut self) {
        self.state.retained = sanitize_f32(self.state.retained, 0.0)
            .clamp(0.0, self.config.fill_ceiling);
    }

    pub fn displayed(&self) -> f32 {
        self.state.displayed(self.config.pump_volume)
    }

    /// Displayed fill limited to `[retained, fill_ceiling]`.
    pub fn displayed_clamped(&self) -> f32 {
        let retained = self.state.retained.clamp(0.0, self.config.fill_ceiling);
        sanitize_f32(self.displayed(), retained).clamp(retained, self.config.fill_ceiling)
    }
}
