//! # Inflate Core
//!
//! The tick-driven simulation behind the inflation toy. Each tick:
//!
//! 1. `InputSmoother` turns trigger / key input into a rate-limited press
//!    and `JoystickHistory` rates how fast the stick is being swirled
//! 2. `Pump` converts press strokes into temporary and retained fill
//! 3. `GirlDynamics` updates startle, horny and concern
//!
//! The core owns no clock and does no I/O. Whoever drives it passes `dt`
//! and forwards the resulting `TickOutput` to the rig.

pub mod config;
pub mod dynamics;
pub mod error;
pub mod input;
pub mod pump;
pub mod simulation;
pub mod state;
pub mod swirl;

pub use config::{EmotionConfig, InputConfig, JoystickConfig, PumpConfig, SimConfig};
pub use dynamics::{Dynamics, EmotionStimulus, GirlDynamics};
pub use error::ConfigError;
pub use input::{InputSmoother, PressReading};
pub use pump::Pump;
pub use simulation::{Simulation, SimulationSnapshot, TickInput, TickOutput};
pub use state::{clamp01, Emotion, EmotionState, FillState, PressMode, PressState};
pub use swirl::{JoystickHistory, SwirlReading};
