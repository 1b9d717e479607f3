//! Error types for the Scout core

use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the localization and search controllers
#[derive(Debug, Error)]
pub enum ScoutError {
    /// A sensor-driven wait did not complete before its deadline.
    #[error("{phase} timed out after {after:?}")]
    Timeout {
        phase: &'static str,
        after: Duration,
    },

    /// The control thread was asked to stop.
    #[error("operation cancelled during {phase}")]
    Cancelled { phase: &'static str },

    /// A collaborator (motor, claw, sensor driver) reported a failure.
    #[error("hardware error: {0}")]
    Hardware(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    /// The planner could not produce any path between two points.
    #[error("no path from ({from_x:.1}, {from_y:.1}) to ({to_x:.1}, {to_y:.1})")]
    NoPath {
        from_x: f64,
        from_y: f64,
        to_x: f64,
        to_y: f64,
    },
}

impl ScoutError {
    /// True when the error came from a stalled or cancelled wait rather
    /// than from a collaborator.
    pub fn is_stall(&self) -> bool {
        matches!(self, ScoutError::Timeout { .. } | ScoutError::Cancelled { .. })
    }
}

impl From<toml::de::Error> for ScoutError {
    fn from(err: toml::de::Error) -> Self {
        ScoutError::Config(err.to_string())
    }
}

impl From<std::io::Error> for ScoutError {
    fn from(err: std::io::Error) -> Self {
        ScoutError::Config(err.to_string())
    }
}

pub type ScoutResult<T> = Result<T, ScoutError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message_names_phase() {
        let err = ScoutError::Timeout {
            phase: "line scan",
            after: Duration::from_millis(1500),
        };
        assert_eq!(err.to_string(), "line scan timed out after 1.5s");
        assert!(err.is_stall());
    }

    #[test]
    fn test_hardware_error_is_not_stall() {
        let err = ScoutError::Hardware("left motor stalled".to_string());
        assert!(!err.is_stall());
    }
}
