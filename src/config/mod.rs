//! Controller configuration
//!
//! Loaded once from TOML at startup and frozen when the controller is
//! activated. The sample interval is always derived from the control
//! frequency so the two can never disagree.

use crate::common::ARM_DOF;
use crate::control::trajectory::MAX_STEPS;
use crate::error::{MotionError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Accepted control loop rates, in Hz
pub const MIN_CONTROL_FREQUENCY: f64 = 0.1;
pub const MAX_CONTROL_FREQUENCY: f64 = 10_000.0;

/// Gripper motion parameters, expressed in degrees at the command boundary
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GripperConfig {
    #[serde(default = "default_move_time")]
    pub move_time: f64,
    #[serde(default = "default_grip_on_deg")]
    pub grip_on_deg: f64,
    #[serde(default)]
    pub grip_off_deg: f64,
    #[serde(default = "default_gripper_joint_name")]
    pub joint_name: String,
}

impl Default for GripperConfig {
    fn default() -> Self {
        Self {
            move_time: default_move_time(),
            grip_on_deg: default_grip_on_deg(),
            grip_off_deg: 0.0,
            joint_name: default_gripper_joint_name(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ControllerConfig {
    #[serde(default = "default_control_frequency")]
    pub control_frequency: f64,
    #[serde(default)]
    pub gripper: GripperConfig,
    #[serde(default = "default_joint_names")]
    pub joint_names: Vec<String>,
    #[serde(default = "default_path_settle_time")]
    pub path_settle_time: f64,
    #[serde(default = "default_setpoint_queue_depth")]
    pub setpoint_queue_depth: usize,
    #[serde(default = "default_ingest_queue_depth")]
    pub ingest_queue_depth: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            control_frequency: default_control_frequency(),
            gripper: GripperConfig::default(),
            joint_names: default_joint_names(),
            path_settle_time: default_path_settle_time(),
            setpoint_queue_depth: default_setpoint_queue_depth(),
            ingest_queue_depth: default_ingest_queue_depth(),
        }
    }
}

fn default_control_frequency() -> f64 {
    100.0
}
fn default_move_time() -> f64 {
    2.0
}
fn default_grip_on_deg() -> f64 {
    -75.0
}
fn default_gripper_joint_name() -> String {
    "grip_joint".to_string()
}
fn default_joint_names() -> Vec<String> {
    (1..=ARM_DOF).map(|i| format!("joint{}", i)).collect()
}
fn default_path_settle_time() -> f64 {
    0.5
}
fn default_setpoint_queue_depth() -> usize {
    64
}
fn default_ingest_queue_depth() -> usize {
    8
}

impl ControllerConfig {
    /// Load and validate a config file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: ControllerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Sample interval of the playback loop, `1 / control_frequency`
    pub fn sample_interval(&self) -> f64 {
        1.0 / self.control_frequency
    }

    /// Sample interval as a timer period; never zero
    pub fn sample_period(&self) -> Result<Duration> {
        let period = Duration::try_from_secs_f64(self.sample_interval()).map_err(|e| {
            MotionError::InvalidParameter(format!(
                "control_frequency {} has no usable period: {}",
                self.control_frequency, e
            ))
        })?;
        if period.is_zero() {
            return Err(MotionError::InvalidParameter(format!(
                "control_frequency {} is too high",
                self.control_frequency
            )));
        }
        Ok(period)
    }

    /// Wait between ingesting an external path and offering it
    pub fn settle_period(&self) -> Result<Duration> {
        Duration::try_from_secs_f64(self.path_settle_time).map_err(|e| {
            MotionError::InvalidParameter(format!(
                "path_settle_time {}: {}",
                self.path_settle_time, e
            ))
        })
    }

    pub fn validate(&self) -> Result<()> {
        if !(MIN_CONTROL_FREQUENCY..=MAX_CONTROL_FREQUENCY).contains(&self.control_frequency) {
            return Err(MotionError::InvalidParameter(format!(
                "control_frequency must be within {}..={} Hz, got {}",
                MIN_CONTROL_FREQUENCY, MAX_CONTROL_FREQUENCY, self.control_frequency
            )));
        }
        self.sample_period()?;
        if !(self.gripper.move_time > 0.0) || !self.gripper.move_time.is_finite() {
            return Err(MotionError::InvalidParameter(
                "gripper.move_time must be positive and finite".to_string(),
            ));
        }
        if self.gripper.move_time * self.control_frequency >= MAX_STEPS as f64 {
            return Err(MotionError::InvalidParameter(format!(
                "gripper.move_time {} needs more than {} samples",
                self.gripper.move_time, MAX_STEPS
            )));
        }
        if !self.gripper.grip_on_deg.is_finite() || !self.gripper.grip_off_deg.is_finite() {
            return Err(MotionError::InvalidParameter(
                "gripper positions must be finite".to_string(),
            ));
        }
        if !(self.path_settle_time >= 0.0) || !self.path_settle_time.is_finite() {
            return Err(MotionError::InvalidParameter(
                "path_settle_time must be non-negative and finite".to_string(),
            ));
        }
        self.settle_period()?;
        if self.joint_names.len() != ARM_DOF {
            return Err(MotionError::InvalidParameter(format!(
                "expected {} joint names, got {}",
                ARM_DOF,
                self.joint_names.len()
            )));
        }
        if self.setpoint_queue_depth == 0 || self.ingest_queue_depth == 0 {
            return Err(MotionError::InvalidParameter(
                "queue depths must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Override numeric settings from a flat parameter map
    pub fn configure(&mut self, params: &HashMap<String, f64>) -> Result<()> {
        let mut updated = self.clone();

        if let Some(&frequency) = params.get("control_frequency") {
            updated.control_frequency = frequency;
        }
        if let Some(&move_time) = params.get("gripper_move_time") {
            updated.gripper.move_time = move_time;
        }
        if let Some(&deg) = params.get("grip_on_deg") {
            updated.gripper.grip_on_deg = deg;
        }
        if let Some(&deg) = params.get("grip_off_deg") {
            updated.gripper.grip_off_deg = deg;
        }
        if let Some(&settle) = params.get("path_settle_time") {
            updated.path_settle_time = settle;
        }

        updated.validate()?;
        *self = updated;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ControllerConfig::default();
        assert!(config.validate().is_ok());
        assert!((config.sample_interval() - 0.01).abs() < 1e-12);
        assert_eq!(config.joint_names, vec!["joint1", "joint2", "joint3", "joint4"]);
        assert_eq!(config.gripper.grip_on_deg, -75.0);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = ControllerConfig::from_toml_str(
            r#"
            control_frequency = 125.0

            [gripper]
            move_time = 1.5
            "#,
        )
        .unwrap();
        assert_eq!(config.control_frequency, 125.0);
        assert!((config.sample_interval() - 0.008).abs() < 1e-12);
        assert_eq!(config.gripper.move_time, 1.5);
        assert_eq!(config.gripper.joint_name, "grip_joint");
        assert_eq!(config.path_settle_time, 0.5);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(ControllerConfig::from_toml_str("control_frequency = 0.0").is_err());
        assert!(ControllerConfig::from_toml_str("joint_names = [\"a\"]").is_err());
        assert!(ControllerConfig::from_toml_str("control_frequency = \"fast\"").is_err());
    }

    #[test]
    fn test_rejects_values_without_a_timer_period() {
        for doc in [
            "path_settle_time = nan",
            "path_settle_time = inf",
            "path_settle_time = -0.1",
            "control_frequency = nan",
            "control_frequency = 1e-300",
            "control_frequency = 1e10",
            "[gripper]\ngrip_on_deg = inf",
            "[gripper]\nmove_time = inf",
            "[gripper]\nmove_time = 1e6",
        ] {
            assert!(
                matches!(
                    ControllerConfig::from_toml_str(doc),
                    Err(MotionError::InvalidParameter(_))
                ),
                "accepted {:?}",
                doc
            );
        }
    }

    #[test]
    fn test_timer_periods() {
        let config = ControllerConfig::default();
        assert_eq!(config.sample_period().unwrap(), Duration::from_millis(10));
        assert_eq!(config.settle_period().unwrap(), Duration::from_millis(500));

        let config = ControllerConfig::from_toml_str(
            "control_frequency = 10000.0\npath_settle_time = 0.0",
        )
        .unwrap();
        assert_eq!(config.sample_period().unwrap(), Duration::from_micros(100));
        assert!(config.settle_period().unwrap().is_zero());
    }

    #[test]
    fn test_configure_is_all_or_nothing() {
        let mut config = ControllerConfig::default();
        let mut params = HashMap::new();
        params.insert("gripper_move_time".to_string(), 3.0);
        params.insert("control_frequency".to_string(), -1.0);
        assert!(config.configure(&params).is_err());
        assert_eq!(config.gripper.move_time, 2.0);

        params.insert("control_frequency".to_string(), 50.0);
        config.configure(&params).unwrap();
        assert_eq!(config.gripper.move_time, 3.0);
        assert_eq!(config.control_frequency, 50.0);
    }
}
