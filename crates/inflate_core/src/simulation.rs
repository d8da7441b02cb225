//! The tick driver.
//!
//! `Simulation` owns every piece of state and advances it in a fixed order:
//! raw input, press smoothing and swirl, pump, emotions. It has no clock of
//! its own; the caller supplies `dt` each tick.

use crate::config::SimConfig;
use crate::dynamics::{Dynamics, EmotionStimulus, GirlDynamics};
use crate::error::ConfigError;
use crate::input::InputSmoother;
use crate::pump::Pump;
use crate::state::{clamp01, EmotionState, FillState, PressMode, PressState};
use crate::swirl::JoystickHistory;
use serde::{Deserialize, Serialize};

/// Raw controller and keyboard state for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TickInput {
    /// Index trigger (0.0 - 1.0), `None` while the controller is not tracked
    pub trigger: Option<f32>,
    /// Hand grip (0.0 - 1.0); squeezing it undoes retained fill
    pub grip: f32,
    pub increase_key: bool,
    pub decrease_key: bool,
    /// Undo key or axis (0.0 - 1.0)
    pub undo: f32,
    /// Thumbstick, each axis in [-1, 1]
    pub joystick: [f32; 2],
}

impl TickInput {
    /// Clamp every axis into range and replace NaN with rest values.
    pub fn sanitized(&self) -> Self {
        let axis = |v: f32| clamp01(v);
        let stick = |v: f32| if v.is_nan() { 0.0 } else { v.clamp(-1.0, 1.0) };
        Self {
            trigger: self.trigger.map(axis),
            grip: axis(self.grip),
            increase_key: self.increase_key,
            decrease_key: self.decrease_key,
            undo: axis(self.undo),
            joystick: [stick(self.joystick[0]), stick(self.joystick[1])],
        }
    }
}

/// What the effector side gets after every tick.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TickOutput {
    /// Fill to show, in `[retained_fill, fill_ceiling]`
    pub displayed_fill: f32,
    pub retained_fill: f32,
    pub temporary_fill: f32,
    pub effective_press: f32,
    pub inflating: bool,
    pub mode: PressMode,
    pub startle: f32,
    pub horny: f32,
    pub concern: f32,
    pub swirl_rating: f32,
    pub overkill: f32,
}

/// Serializable copy of the persistent state.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SimulationSnapshot {
    pub press: PressState,
    pub fill: FillState,
    pub emotion: EmotionState,
}

#[derive(Debug, Clone)]
pub struct Simulation {
    config: SimConfig,
    smoother: InputSmoother,
    joystick: JoystickHistory,
    pump: Pump,
    girl: GirlDynamics,
    emotion: EmotionState,
    last_output: TickOutput,
    ticks: u64,
}

impl Simulation {
    /// Build a fresh simulation: empty pump, calm girl, inflating stroke.
    pub fn new(config: SimConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut sim = Self {
            smoother: InputSmoother::new(config.input.clone()),
            joystick: JoystickHistory::new(&config.joystick),
            pump: Pump::new(config.pump.clone()),
            girl: GirlDynamics::new(config.emotion.clone(), &config.joystick),
            emotion: EmotionState::default(),
            last_output: TickOutput::default(),
            ticks: 0,
            config,
        };
        sim.last_output = sim.compose_output(0.0, 0.0);
        Ok(sim)
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn emotion(&self) -> &EmotionState {
        &self.emotion
    }

    pub fn fill(&self) -> &FillState {
        self.pump.state()
    }

    pub fn press(&self) -> &PressState {
        self.smoother.state()
    }

    /// Output of the most recent tick.
    pub fn output(&self) -> &TickOutput {
        &self.last_output
    }

    /// Number of ticks that actually advanced the state.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Advance everything by `dt` seconds.
    ///
    /// A tick with `dt <= 0` (or a non-finite `dt`) is a no-op and returns
    /// the previous output unchanged.
    pub fn tick(&mut self, input: &TickInput, dt: f32) -> TickOutput {
        if !(dt.is_finite() && dt > 0.0) {
            tracing::trace!("Skipping tick with dt={}", dt);
            return self.last_output;
        }
        let input = input.sanitized();

        // Input
        let press = self
            .smoother
            .advance(input.trigger, input.increase_key, input.decrease_key, dt);
        self.joystick.push(input.joystick[0], input.joystick[1], dt);
        let swirl = self.joystick.reading();

        // Pump
        self.pump.advance(press.effective);
        let undo = input.grip.max(input.undo);
        self.pump.undo(undo * self.config.input.undo_rate * dt);
        self.pump.cap();
        let displayed_fill = self.pump.displayed_clamped();

        // Girl
        let stimulus = EmotionStimulus {
            displayed_fill,
            press_mismatch: match press.mode {
                PressMode::Continuous => press.mismatch,
                PressMode::Discrete => 0.0,
            },
            startle_impulse: press.startle_impulse,
            swirl,
        };
        self.girl.step(&mut self.emotion, &stimulus, dt);

        self.ticks += 1;
        self.last_output = self.compose_output(swirl.rating, swirl.overkill);
        tracing::trace!(
            tick = self.ticks,
            fill = displayed_fill,
            startle = self.emotion.startle,
            horny = self.emotion.horny,
            concern = self.emotion.concern,
            "Simulation tick"
        );
        self.last_output
    }

    pub fn snapshot(&self) -> SimulationSnapshot {
        SimulationSnapshot {
            press: *self.smoother.state(),
            fill: *self.pump.state(),
            emotion: self.emotion,
        }
    }

    /// Replace the persistent state. The joystick window starts over.
    pub fn restore(&mut self, snapshot: SimulationSnapshot) {
        self.smoother = InputSmoother::with_state(self.config.input.clone(), snapshot.press);
        self.pump = Pump::with_state(self.config.pump.clone(), snapshot.fill);
        self.emotion = snapshot.emotion;
        self.emotion.normalize();
        self.joystick.clear();
        self.last_output = self.compose_output(0.0, 0.0);
    }

    fn compose_output(&self, swirl_rating: f32, overkill: f32) -> TickOutput {
        let press = self.smoother.state();
        let fill = self.pump.state();
        TickOutput {
            displayed_fill: self.pump.displayed_clamped(),
            retained_fill: fill.retained,
            temporary_fill: fill.temporary,
            effective_press: press.effective,
            inflating: press.inflating,
            mode: press.mode,
            startle: self.emotion.startle,
            horny: self.emotion.horny,
            concern: self.emotion.concern,
            swirl_rating,
            overkill,
        }
    }
}
