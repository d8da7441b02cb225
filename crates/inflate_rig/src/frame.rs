//! Rig frames - the bridge between the simulation and the character model
//!
//! A `RigFrame` is everything the engine side needs to pose the model for one
//! rendered frame: bone scales driven by the fill, shader parameters and
//! animator blend weights driven by the emotions.

use inflate_core::{Emotion, EmotionState, TickOutput};
use serde::{Deserialize, Serialize};

/// Curves mapping simulation output to rig parameters.
///
/// Each pair is `(value at input 0, value at input max)`; inputs are clamped
/// and interpolated linearly. Different models need different curves (a
/// small model may want subtler ear growth), so these are plain data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RigCurves {
    /// Fill that maps to the top end of every fill curve
    pub fill_max: f32,
    pub fill_to_tail_scale: (f32, f32),
    pub fill_to_ear_scale: (f32, f32),
    /// Belly blend shape weight, in the engine's 0 - 100 convention
    pub fill_to_belly_blend: (f32, f32),
    pub horny_to_blush: (f32, f32),
    pub startle_to_pupil_size: (f32, f32),
}

impl Default for RigCurves {
    fn default() -> Self {
        Self {
            fill_max: 1.5,
            // Bones scale 1:1 with the fill, starting from nothing
            fill_to_tail_scale: (0.0, 1.5),
            fill_to_ear_scale: (0.0, 1.5),
            fill_to_belly_blend: (0.0, 100.0),
            horny_to_blush: (0.0, 1.0),
            startle_to_pupil_size: (1.0, 1.6),
        }
    }
}

/// Pose parameters for one rendered frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RigFrame {
    pub tail_scale: f32,
    pub ear_scale: f32,
    pub belly_blend: f32,

    /// Shader: cheek blush (0.0 - 1.0)
    pub blush: f32,
    /// Shader: pupil scale, 1.0 at rest
    pub pupil_size: f32,

    /// Animator layer weights (0.0 - 1.0)
    pub startle_blend: f32,
    pub horny_blend: f32,
    pub concern_blend: f32,

    /// Strongest emotion, for picking a facial expression
    pub expression: Option<Emotion>,
}

impl RigFrame {
    pub fn from_output(output: &TickOutput, curves: &RigCurves) -> Self {
        let fill = if curves.fill_max > 0.0 {
            output.displayed_fill / curves.fill_max
        } else {
            0.0
        };
        let emotion = EmotionState::new(output.startle, output.horny, output.concern);

        Self {
            tail_scale: lerp(curves.fill_to_tail_scale, fill),
            ear_scale: lerp(curves.fill_to_ear_scale, fill),
            belly_blend: lerp(curves.fill_to_belly_blend, fill),
            blush: lerp(curves.horny_to_blush, emotion.horny),
            pupil_size: lerp(curves.startle_to_pupil_size, emotion.startle),
            startle_blend: emotion.startle,
            horny_blend: emotion.horny,
            concern_blend: emotion.concern,
            expression: emotion.dominant(),
        }
    }

    /// Interpolate every numeric field toward `target`.
    /// The expression switches to the target's once `t` passes one half.
    pub fn lerp(&self, target: &RigFrame, t: f32) -> RigFrame {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: f32, b: f32| a + (b - a) * t;
        RigFrame {
            tail_scale: mix(self.tail_scale, target.tail_scale),
            ear_scale: mix(self.ear_scale, target.ear_scale),
            belly_blend: mix(self.belly_blend, target.belly_blend),
            blush: mix(self.blush, target.blush),
            pupil_size: mix(self.pupil_size, target.pupil_size),
            startle_blend: mix(self.startle_blend, target.startle_blend),
            horny_blend: mix(self.horny_blend, target.horny_blend),
            concern_blend: mix(self.concern_blend, target.concern_blend),
            expression: if t > 0.5 {
                target.expression
            } else {
                self.expression
            },
        }
    }

    /// Largest jump between the two frames' animator weights.
    pub fn max_blend_delta(&self, other: &RigFrame) -> f32 {
        [
            (self.startle_blend - other.startle_blend).abs(),
            (self.horny_blend - other.horny_blend).abs(),
            (self.concern_blend - other.concern_blend).abs(),
        ]
        .into_iter()
        .fold(0.0, f32::max)
    }
}

/// Emotion inertia for the rig.
///
/// Lerps each new frame toward the raw one so expressions ease in and out.
/// A jump in any blend weight larger than `bypass_threshold` skips the lerp
/// so a sudden startle lands on the very next frame.
#[derive(Debug, Clone)]
pub struct RigSmoother {
    prev: Option<RigFrame>,
    /// 0.0 = frozen, 1.0 = no smoothing
    smoothing: f32,
    bypass_threshold: f32,
}

impl RigSmoother {
    /// A NaN `smoothing` disables smoothing; a NaN threshold never bypasses.
    pub fn new(smoothing: f32, bypass_threshold: f32) -> Self {
        let smoothing = if smoothing.is_nan() {
            tracing::warn!("NaN rig smoothing, frames will not be smoothed");
            1.0
        } else {
            smoothing.clamp(0.0, 1.0)
        };
        let bypass_threshold = if bypass_threshold.is_nan() {
            f32::INFINITY
        } else {
            bypass_threshold
        };
        Self {
            prev: None,
            smoothing,
            bypass_threshold,
        }
    }

    pub fn smooth(&mut self, raw: RigFrame) -> RigFrame {
        let smoothed = match &self.prev {
            None => raw,
            Some(prev) if prev.max_blend_delta(&raw) > self.bypass_threshold => {
                tracing::debug!("Blend jump past threshold, skipping smoothing");
                raw
            }
            Some(prev) => prev.lerp(&raw, self.smoothing),
        };
        self.prev = Some(smoothed);
        smoothed
    }

    /// Forget the last frame so the next one is taken as-is.
    pub fn reset(&mut self) {
        self.prev = None;
    }
}

/// Linear interpolation across a curve
fn lerp((a, b): (f32, f32), t: f32) -> f32 {
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(fill: f32, startle: f32, horny: f32, concern: f32) -> TickOutput {
        TickOutput {
            displayed_fill: fill,
            startle,
            horny,
            concern,
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_output_gives_rest_pose() {
        let frame = RigFrame::from_output(&TickOutput::default(), &RigCurves::default());
        assert_eq!(frame.tail_scale, 0.0);
        assert_eq!(frame.belly_blend, 0.0);
        assert_eq!(frame.pupil_size, 1.0);
        assert_eq!(frame.expression, None);
    }

    #[test]
    fn test_bones_scale_with_fill() {
        let curves = RigCurves::default();
        let frame = RigFrame::from_output(&output(0.75, 0.0, 0.0, 0.0), &curves);
        assert!((frame.tail_scale - 0.75).abs() < 1e-6);
        assert!((frame.ear_scale - 0.75).abs() < 1e-6);
        assert!((frame.belly_blend - 50.0).abs() < 1e-4);

        let full = RigFrame::from_output(&output(9.0, 0.0, 0.0, 0.0), &curves);
        assert_eq!(full.tail_scale, 1.5);
    }

    #[test]
    fn test_emotions_drive_shader_and_blends() {
        let frame = RigFrame::from_output(&output(0.0, 1.0, 0.5, 0.2), &RigCurves::default());
        assert!((frame.pupil_size - 1.6).abs() < 1e-6);
        assert!((frame.blush - 0.5).abs() < 1e-6);
        assert_eq!(frame.startle_blend, 1.0);
        assert_eq!(frame.expression, Some(Emotion::Startle));
    }

    #[test]
    fn test_smoother_eases_small_changes() {
        let curves = RigCurves::default();
        let mut smoother = RigSmoother::new(0.5, 0.5);
        smoother.smooth(RigFrame::from_output(&output(0.0, 0.0, 0.0, 0.0), &curves));

        let frame = smoother.smooth(RigFrame::from_output(&output(1.5, 0.0, 0.2, 0.0), &curves));
        assert!((frame.tail_scale - 0.75).abs() < 1e-6);
        assert!((frame.horny_blend - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_smoother_bypasses_on_startle() {
        let curves = RigCurves::default();
        let mut smoother = RigSmoother::new(0.1, 0.5);
        smoother.smooth(RigFrame::from_output(&output(0.0, 0.0, 0.0, 0.0), &curves));

        let frame = smoother.smooth(RigFrame::from_output(&output(0.0, 0.9, 0.0, 0.0), &curves));
        assert_eq!(frame.startle_blend, 0.9);
    }

    #[test]
    fn test_smoother_survives_nan_settings() {
        let curves = RigCurves::default();
        let mut smoother = RigSmoother::new(f32::NAN, f32::NAN);
        smoother.smooth(RigFrame::from_output(&output(0.0, 0.0, 0.0, 0.0), &curves));

        let frame = smoother.smooth(RigFrame::from_output(&output(1.5, 0.2, 0.3, 0.1), &curves));
        assert_eq!(frame.tail_scale, 1.5);
        assert!(!frame.startle_blend.is_nan());
        assert!(!frame.belly_blend.is_nan());
    }

    #[test]
    fn test_smoother_reset() {
        let curves = RigCurves::default();
        let mut smoother = RigSmoother::new(0.0, 1.0);
        smoother.smooth(RigFrame::from_output(&output(0.0, 0.0, 0.0, 0.0), &curves));
        smoother.reset();
        let frame = smoother.smooth(RigFrame::from_output(&output(1.5, 0.0, 0.0, 0.0), &curves));
        assert_eq!(frame.tail_scale, 1.5);
    }
}
