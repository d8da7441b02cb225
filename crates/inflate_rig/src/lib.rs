//! # Inflate Rig
//!
//! Everything between the simulation core and the character model:
//!
//! - `SimulationDriver` runs the tick heartbeat as a background task that
//!   exclusively owns the simulation
//! - `RigFrame` maps fill and emotions onto bone scales, shader parameters
//!   and animator blends, with emotion inertia from `RigSmoother`
//! - `EffectorSink` is where frames land; `BoneRig` poses a named bone tree

mod config;
mod driver;
mod frame;
mod heartbeat;
mod node;
mod sink;

pub use config::RigConfig;
pub use driver::SimulationDriver;
pub use frame::{RigCurves, RigFrame, RigSmoother};
pub use heartbeat::HeartbeatConfig;
pub use node::RigNode;
pub use sink::{BoneNames, BoneRig, EffectorSink, NullSink, RecordingSink};
