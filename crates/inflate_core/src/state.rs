//! Simulation state, split by the component that owns it:
//! - `PressState`: smoothed press and stroke direction (InputSmoother)
//! - `FillState`: temporary vs. retained fill (Pump)
//! - `EmotionState`: startle, horny and concern (Girl)
//!
//! All three are plain data. They are created once with the defaults below
//! and mutated exactly once per tick by the simulation driver.

use serde::{Deserialize, Serialize};

/// Guard against NaN and Infinity in state values.
/// If the value is NaN or Inf, replace with the provided fallback.
#[inline]
pub(crate) fn sanitize_f32(v: f32, fallback: f32) -> f32 {
    if v.is_finite() {
        v
    } else {
        tracing::warn!("NaN/Inf detected in state, resetting to fallback {}", fallback);
        fallback
    }
}

/// `clamp(v, 0, 1)` that also maps NaN to 0.
#[inline]
pub fn clamp01(v: f32) -> f32 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

// =============================================================================
// Press
// =============================================================================

/// Which input source last drove the press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PressMode {
    /// Trigger axis, rate-limited toward the raw value.
    Continuous,
    /// Pump keys, stepped while held.
    #[default]
    Discrete,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PressState {
    /// Smoothed press (0.0 - 1.0)
    pub effective: f32,
    /// Where the press is heading; the trigger value in continuous mode
    pub target: f32,
    /// Stroke direction for alternating key pumping
    pub inflating: bool,
    pub mode: PressMode,
}

impl Default for PressState {
    fn default() -> Self {
        Self {
            effective: 0.0,
            target: 0.0,
            inflating: true,
            mode: PressMode::Discrete,
        }
    }
}

impl PressState {
    pub fn normalize(&mut self) {
        self.effective = clamp01(sanitize_f32(self.effective, 0.0));
        self.target = clamp01(sanitize_f32(self.target, 0.0));
    }
}

// =============================================================================
// Fill
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FillState {
    /// Permanent fill, only grows on release strokes
    pub retained: f32,
    /// Reversible fill pushed in by the current stroke. May dip a hair
    /// below zero from float accumulation.
    pub temporary: f32,
    /// Press seen on the previous tick
    pub last_press: f32,
}

impl FillState {
    /// `retained + temporary * volume`
    pub fn displayed(&self, volume: f32) -> f32 {
        self.retained + self.temporary * volume
    }
}

// =============================================================================
// Emotion
// =============================================================================

/// The girl's three coupled emotions. Every field is in [0, 1] between ticks.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EmotionState {
    pub startle: f32,
    pub horny: f32,
    pub concern: f32,
}

impl EmotionState {
    pub fn new(startle: f32, horny: f32, concern: f32) -> Self {
        let mut state = Self {
            startle,
            horny,
            concern,
        };
        state.normalize();
        state
    }

    /// Clamp all values to valid ranges
    pub fn normalize(&mut self) {
        self.startle = clamp01(sanitize_f32(self.startle, 0.0));
        self.horny = clamp01(sanitize_f32(self.horny, 0.0));
        self.concern = clamp01(sanitize_f32(self.concern, 0.0));
    }

    /// The emotion with the highest level, ties resolved startle > concern > horny.
    pub fn dominant(&self) -> Option<Emotion> {
        let ranked = [
            (Emotion::Startle, self.startle),
            (Emotion::Concern, self.concern),
            (Emotion::Horny, self.horny),
        ];
        ranked
            .into_iter()
            .filter(|(_, level)| *level > 0.0)
            .fold(None, |best: Option<(Emotion, f32)>, (e, level)| match best {
                Some((_, b)) if b >= level => best,
                _ => Some((e, level)),
            })
            .map(|(e, _)| e)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Emotion {
    Startle,
    Horny,
    Concern,
}
