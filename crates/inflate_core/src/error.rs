//! Error types for the simulation core.

use thiserror::Error;

/// A configuration value that would make the dynamics misbehave.
///
/// Raised by [`crate::SimConfig::validate`] and therefore by every
/// constructor that takes a config, so a bad tunable fails at startup
/// instead of producing a divergent simulation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be finite, got {value}")]
    NotFinite { field: &'static str, value: f32 },

    #[error("{field} must not be negative, got {value}")]
    Negative { field: &'static str, value: f32 },

    #[error("{field} must be greater than zero, got {value}")]
    NotPositive { field: &'static str, value: f32 },

    #[error("{field} must lie in [{min}, {max}], got {value}")]
    OutOfRange {
        field: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },
}
