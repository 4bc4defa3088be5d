//! Error types for the motion core

use thiserror::Error;

/// Errors raised by trajectory generation, ingestion and the controller.
///
/// None of these are fatal: callers log them and keep the current motion
/// state untouched.
#[derive(Debug, Error)]
pub enum MotionError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("unknown joint name '{0}'")]
    UnknownJoint(String),

    #[error("unrecognized command '{0}', expected 'grip_on' or 'grip_off'")]
    UnrecognizedCommand(String),

    #[error("present configuration has not been received yet")]
    StaleConfiguration,

    #[error("external path contains no waypoints")]
    EmptyPath,

    #[error("expected {expected} values, got {actual}")]
    ArityMismatch { expected: usize, actual: usize },

    #[error("config error: {0}")]
    Config(String),

    #[error("controller is not running")]
    NotRunning,

    #[error("request queue is full")]
    Busy,

    #[error("lifecycle error: {0}")]
    Lifecycle(String),
}

impl From<std::io::Error> for MotionError {
    fn from(err: std::io::Error) -> Self {
        MotionError::Config(err.to_string())
    }
}

impl From<toml::de::Error> for MotionError {
    fn from(err: toml::de::Error) -> Self {
        MotionError::Config(err.to_string())
    }
}

/// Convenience alias used throughout the crate
pub type Result<T> = std::result::Result<T, MotionError>;
