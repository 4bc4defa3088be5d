//! Manual gripper commands
//!
//! Tokens are parsed here and gripper targets are converted from degrees to
//! radians here, so nothing below this module deals with degrees.

use crate::common::units::deg_to_rad;
use crate::config::GripperConfig;
use crate::control::trajectory::buffer::{MotionKind, Trajectory};
use crate::control::trajectory::TrajectoryGenerator;
use crate::error::{MotionError, Result};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GripCommand {
    On,
    Off,
}

impl FromStr for GripCommand {
    type Err = MotionError;

    fn from_str(token: &str) -> Result<Self> {
        match token.trim() {
            "grip_on" => Ok(GripCommand::On),
            "grip_off" => Ok(GripCommand::Off),
            other => Err(MotionError::UnrecognizedCommand(other.to_string())),
        }
    }
}

impl fmt::Display for GripCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GripCommand::On => write!(f, "grip_on"),
            GripCommand::Off => write!(f, "grip_off"),
        }
    }
}

/// Builds gripper trajectories for manual commands
#[derive(Debug, Clone)]
pub struct GripPlanner {
    generator: TrajectoryGenerator,
    sample_interval: f64,
    grip_on: f64,
    grip_off: f64,
    move_time: f64,
}

impl GripPlanner {
    pub fn new(config: &GripperConfig, sample_interval: f64) -> Self {
        GripPlanner {
            generator: TrajectoryGenerator::new(),
            sample_interval,
            grip_on: deg_to_rad(config.grip_on_deg),
            grip_off: deg_to_rad(config.grip_off_deg),
            move_time: config.move_time,
        }
    }

    /// Target aperture in radians
    pub fn target(&self, command: GripCommand) -> f64 {
        match command {
            GripCommand::On => self.grip_on,
            GripCommand::Off => self.grip_off,
        }
    }

    /// Rest-to-rest move from the present aperture to the command's target
    pub fn plan(&self, command: GripCommand, present_gripper: f64) -> Result<Trajectory> {
        self.generator.point_to_point(
            MotionKind::Gripper,
            &[present_gripper],
            &[self.target(command)],
            self.sample_interval,
            self.move_time,
        )
    }
}
