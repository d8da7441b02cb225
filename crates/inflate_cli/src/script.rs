//! Input scripts: timed controller states replayed against the simulation.
//!
//! A script is a JSON array of steps; each step holds one controller state
//! for a number of seconds:
//!
//! ```json
//! [
//!   { "secs": 1.5, "input": { "trigger": 1.0 } },
//!   { "secs": 1.0, "input": { "trigger": 0.0 } }
//! ]
//! ```

use anyhow::{Context, Result};
use inflate_core::{Simulation, TickInput, TickOutput};
use inflate_rig::{RigCurves, RigFrame, RigSmoother};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Longest single step a script may hold: one day.
pub const MAX_STEP_SECS: f32 = 86_400.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScriptStep {
    /// How long the input is held
    pub secs: f32,
    #[serde(default)]
    pub input: TickInput,
}

impl ScriptStep {
    fn hold(secs: f32, input: TickInput) -> Self {
        Self { secs, input }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Script {
    pub steps: Vec<ScriptStep>,
}

impl Script {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read script: {}", path.as_ref().display()))?;
        Self::from_json(&content)
            .with_context(|| format!("Invalid script: {}", path.as_ref().display()))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let steps: Vec<ScriptStep> =
            serde_json::from_str(content).with_context(|| "Failed to parse script JSON")?;
        if let Some((i, step)) = steps
            .iter()
            .enumerate()
            .find(|(_, s)| !(0.0..=MAX_STEP_SECS).contains(&s.secs))
        {
            anyhow::bail!(
                "Step {} has invalid duration {} (must be 0 - {} s)",
                i,
                step.secs,
                MAX_STEP_SECS
            );
        }
        Ok(Self { steps })
    }

    /// Three full trigger strokes, a swirl of the stick, then the grip held
    /// until the retained fill is gone.
    pub fn demo() -> Self {
        let trigger = |v: f32| TickInput {
            trigger: Some(v),
            ..Default::default()
        };

        let mut steps = Vec::new();
        for _ in 0..3 {
            steps.push(ScriptStep::hold(1.5, trigger(1.0)));
            steps.push(ScriptStep::hold(1.0, trigger(0.0)));
        }

        // Quarter turns at full deflection, four per second
        let corners = [[1.0, 0.0], [0.0, 1.0], [-1.0, 0.0], [0.0, -1.0]];
        for i in 0..12 {
            steps.push(ScriptStep::hold(
                0.25,
                TickInput {
                    joystick: corners[i % corners.len()],
                    ..Default::default()
                },
            ));
        }

        steps.push(ScriptStep::hold(
            5.0,
            TickInput {
                grip: 1.0,
                ..Default::default()
            },
        ));
        steps.push(ScriptStep::hold(1.0, TickInput::default()));

        Self { steps }
    }

    pub fn total_secs(&self) -> f32 {
        self.steps.iter().map(|s| s.secs).sum()
    }
}

/// One emitted line of a replay.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ReplayLine {
    /// Simulated seconds since the start of the script
    pub t: f64,
    pub output: TickOutput,
    pub frame: RigFrame,
}

/// Fixed-step offline replay: no clock, just `dt` slices.
pub struct Replay {
    dt: f32,
    every: u64,
    curves: RigCurves,
    smoother: RigSmoother,
}

impl Replay {
    pub fn new(dt: f32, every: u64, curves: RigCurves, smoother: RigSmoother) -> Result<Self> {
        if !dt.is_finite() || dt <= 0.0 {
            anyhow::bail!("Tick length must be positive, got {}", dt);
        }
        Ok(Self {
            dt,
            every: every.max(1),
            curves,
            smoother,
        })
    }

    /// Run every step, calling `emit` on every `every`-th tick and on the
    /// final one. A step that does not divide evenly ends with a short tick.
    pub fn run<F>(&mut self, sim: &mut Simulation, script: &Script, mut emit: F) -> Result<()>
    where
        F: FnMut(&ReplayLine) -> Result<()>,
    {
        let dt = f64::from(self.dt);
        let mut t = 0.0f64;
        let mut ticks = 0u64;
        let mut emitted_at = None;
        let mut last = None;

        for step in &script.steps {
            let secs = f64::from(step.secs);
            // Tick count is fixed up front so long steps cannot stall on f32 rounding
            let n = (secs / dt - 1e-6).ceil().max(0.0) as u64;
            for i in 0..n {
                let slice = if i + 1 == n {
                    secs - dt * (n - 1) as f64
                } else {
                    dt
                };
                t += slice;
                ticks += 1;

                let output = sim.tick(&step.input, slice as f32);
                let frame = self
                    .smoother
                    .smooth(RigFrame::from_output(&output, &self.curves));
                let line = ReplayLine { t, output, frame };

                if ticks % self.every == 0 {
                    emit(&line)?;
                    emitted_at = Some(ticks);
                }
                last = Some(line);
            }
        }

        if let Some(line) = last {
            if emitted_at != Some(ticks) {
                emit(&line)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inflate_core::SimConfig;

    fn replay(dt: f32, every: u64) -> Replay {
        Replay::new(dt, every, RigCurves::default(), RigSmoother::new(1.0, 0.5)).unwrap()
    }

    #[test]
    fn test_parse_script() {
        let script = Script::from_json(
            r#"[
                { "secs": 1.5, "input": { "trigger": 1.0 } },
                { "secs": 0.5 }
            ]"#,
        )
        .unwrap();
        assert_eq!(script.steps.len(), 2);
        assert_eq!(script.steps[0].input.trigger, Some(1.0));
        assert_eq!(script.steps[1].input, TickInput::default());
        assert!((script.total_secs() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_negative_duration_rejected() {
        let err = Script::from_json(r#"[{ "secs": -1.0 }]"#).unwrap_err();
        assert!(err.to_string().contains("invalid duration"));
    }

    #[test]
    fn test_overlong_step_rejected() {
        let err = Script::from_json(r#"[{ "secs": 300000.0 }]"#).unwrap_err();
        assert!(err.to_string().contains("invalid duration"), "{}", err);
        assert!(Script::from_json(r#"[{ "secs": 86400.0 }]"#).is_ok());
    }

    #[test]
    fn test_replay_long_step_finishes_on_time() {
        let script = Script::from_json(r#"[{ "secs": 86400.0 }]"#).unwrap();
        let mut sim = Simulation::new(SimConfig::default()).unwrap();
        let mut last_t = 0.0;
        replay(60.0, 1_000)
            .run(&mut sim, &script, |line| {
                last_t = line.t;
                Ok(())
            })
            .unwrap();

        assert_eq!(sim.ticks(), 1440);
        assert!((last_t - 86400.0).abs() < 1e-6, "t={}", last_t);
    }

    #[test]
    fn test_malformed_script_rejected() {
        assert!(Script::from_json("{ not json").is_err());
    }

    #[test]
    fn test_replay_emits_every_nth_tick_and_the_last() {
        let script = Script::from_json(r#"[{ "secs": 1.0 }]"#).unwrap();
        let mut sim = Simulation::new(SimConfig::default()).unwrap();
        let mut lines = Vec::new();
        replay(0.1, 3)
            .run(&mut sim, &script, |line| {
                lines.push(*line);
                Ok(())
            })
            .unwrap();

        assert_eq!(sim.ticks(), 10);
        // ticks 3, 6, 9 and the final tick 10
        assert_eq!(lines.len(), 4);
        assert!((lines[3].t - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_replay_splits_uneven_steps() {
        let script = Script::from_json(r#"[{ "secs": 0.25 }]"#).unwrap();
        let mut sim = Simulation::new(SimConfig::default()).unwrap();
        let mut last_t = 0.0;
        replay(0.1, 1)
            .run(&mut sim, &script, |line| {
                last_t = line.t;
                Ok(())
            })
            .unwrap();
        assert_eq!(sim.ticks(), 3);
        assert!((last_t - 0.25).abs() < 1e-4);
    }

    #[test]
    fn test_demo_retains_then_undoes_fill() {
        let script = Script::demo();
        let mut sim = Simulation::new(SimConfig::default()).unwrap();
        let mut peak_retained = 0.0f32;
        let mut last = None;
        replay(1.0 / 72.0, 1)
            .run(&mut sim, &script, |line| {
                peak_retained = peak_retained.max(line.output.retained_fill);
                last = Some(*line);
                Ok(())
            })
            .unwrap();

        // Three strokes at 0.2 * 0.4 each
        assert!((peak_retained - 0.24).abs() < 0.01, "peak={}", peak_retained);
        let last = last.unwrap();
        assert!(last.output.retained_fill < 1e-5);
        assert!(last.frame.tail_scale < 1e-3);
    }

    #[test]
    fn test_zero_dt_rejected() {
        assert!(Replay::new(0.0, 1, RigCurves::default(), RigSmoother::new(1.0, 0.5)).is_err());
    }
}
