//! Fixed-rate playback of armed trajectories
//!
//! The engine holds at most one motion in flight. Gripper motions arm
//! immediately and replace whatever is playing. Externally planned joint
//! paths wait as a pending candidate until execution is confirmed and the
//! engine is idle.

use super::trajectory::buffer::{MotionKind, Trajectory};
use crate::common::{JointConfiguration, ARM_DOF, GRIPPER_DOF};
use crate::error::{MotionError, Result};
use crate::planning::JointNameTable;
use std::sync::Arc;
use tracing::{debug, info};

/// Engine phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackPhase {
    Idle,
    Playing(MotionKind),
}

/// Snapshot of the playback bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackState {
    pub active: Option<MotionKind>,
    pub current_step: usize,
    pub total_steps: usize,
}

impl PlaybackState {
    pub fn idle() -> Self {
        PlaybackState {
            active: None,
            current_step: 0,
            total_steps: 0,
        }
    }

    pub fn is_moving(&self) -> bool {
        self.active.is_some()
    }

    pub fn phase(&self) -> PlaybackPhase {
        match self.active {
            Some(kind) => PlaybackPhase::Playing(kind),
            None => PlaybackPhase::Idle,
        }
    }
}

/// Named joint-state command sent to the actuators
#[derive(Debug, Clone, PartialEq)]
pub struct Setpoint {
    pub names: Vec<String>,
    pub positions: Vec<f64>,
}

impl Setpoint {
    pub fn position_of(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|candidate| candidate == name)
            .and_then(|index| self.positions.get(index).copied())
    }
}

/// Result of a single tick
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    /// Published only while a motion is playing
    pub setpoint: Option<Setpoint>,
    /// Set on the tick that plays a motion's final row
    pub finished: Option<MotionKind>,
}

/// Motion arbiter and step counter, owned by the driving loop
#[derive(Debug)]
pub struct PlaybackEngine {
    joints: Arc<JointNameTable>,
    gripper_name: String,
    active: Option<Trajectory>,
    current_step: usize,
    pending_joint_path: Option<Trajectory>,
    execution_confirmed: bool,
    goal_joint: JointConfiguration,
    goal_gripper: JointConfiguration,
}

impl PlaybackEngine {
    pub fn new(joints: Arc<JointNameTable>, gripper_name: &str) -> Self {
        PlaybackEngine {
            joints,
            gripper_name: gripper_name.to_string(),
            active: None,
            current_step: 0,
            pending_joint_path: None,
            execution_confirmed: false,
            goal_joint: JointConfiguration::zeros(ARM_DOF),
            goal_gripper: JointConfiguration::zeros(GRIPPER_DOF),
        }
    }

    pub fn state(&self) -> PlaybackState {
        match &self.active {
            Some(trajectory) => PlaybackState {
                active: Some(trajectory.kind()),
                current_step: self.current_step,
                total_steps: trajectory.total_steps(),
            },
            None => PlaybackState::idle(),
        }
    }

    pub fn phase(&self) -> PlaybackPhase {
        self.state().phase()
    }

    pub fn is_moving(&self) -> bool {
        self.active.is_some()
    }

    /// Last arm goal written by playback
    pub fn last_commanded_joints(&self) -> &JointConfiguration {
        &self.goal_joint
    }

    pub fn last_commanded_gripper(&self) -> &JointConfiguration {
        &self.goal_gripper
    }

    pub fn has_pending_joint_path(&self) -> bool {
        self.pending_joint_path.is_some()
    }

    /// Install a trajectory as the active motion, replacing any motion in
    /// flight and restarting at step 0
    pub fn arm(&mut self, trajectory: Trajectory) -> Result<()> {
        let expected = match trajectory.kind() {
            MotionKind::Gripper => GRIPPER_DOF,
            MotionKind::Joint => ARM_DOF,
        };
        if trajectory.buffer().dof_count() != expected {
            return Err(MotionError::ArityMismatch {
                expected,
                actual: trajectory.buffer().dof_count(),
            });
        }
        if trajectory.total_steps() == 0 {
            return Err(MotionError::InvalidParameter(
                "cannot arm an empty trajectory".to_string(),
            ));
        }

        if let Some(previous) = &self.active {
            debug!(
                "Overwriting {:?} motion at step {}/{}",
                previous.kind(),
                self.current_step,
                previous.total_steps()
            );
        }

        match trajectory.kind() {
            MotionKind::Gripper => info!("Start Gripper Trajectory"),
            MotionKind::Joint => info!("Send Motion Trajectory"),
        }

        self.active = Some(trajectory);
        self.current_step = 0;
        Ok(())
    }

    /// Offer a freshly ingested joint path. It becomes the pending
    /// candidate (replacing any older one) and is armed right away only if
    /// execution was already confirmed and nothing is playing.
    pub fn offer_joint_path(&mut self, trajectory: Trajectory) -> Result<bool> {
        if trajectory.kind() != MotionKind::Joint {
            return Err(MotionError::InvalidParameter(
                "only joint trajectories can be offered as external paths".to_string(),
            ));
        }
        info!("Get Joint Trajectory");
        self.pending_joint_path = Some(trajectory);

        if self.execution_confirmed && !self.is_moving() {
            self.execution_confirmed = false;
            return self.arm_pending();
        }
        Ok(false)
    }

    /// Record that the planner started executing the previewed path.
    ///
    /// Ignored while a motion is playing. With no pending path yet the
    /// confirmation is latched for the next one.
    pub fn confirm_execution(&mut self) -> Result<bool> {
        if self.is_moving() {
            debug!("Execution confirmation ignored while moving");
            return Ok(false);
        }
        if self.pending_joint_path.is_some() {
            self.execution_confirmed = false;
            return self.arm_pending();
        }
        self.execution_confirmed = true;
        Ok(false)
    }

    fn arm_pending(&mut self) -> Result<bool> {
        match self.pending_joint_path.take() {
            Some(trajectory) => {
                // start from where the arm is held now, not where it was at ingestion
                let trajectory = trajectory.with_first_row(&self.goal_joint)?;
                self.arm(trajectory)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Advance one tick
    pub fn tick(&mut self) -> TickOutcome {
        let Some(trajectory) = &self.active else {
            return TickOutcome {
                setpoint: None,
                finished: None,
            };
        };

        let kind = trajectory.kind();
        let total_steps = trajectory.total_steps();
        if let Some(row) = trajectory.buffer().row(self.current_step) {
            let target = match kind {
                MotionKind::Gripper => &mut self.goal_gripper,
                MotionKind::Joint => &mut self.goal_joint,
            };
            let assigned = target.assign(row.as_slice());
            debug_assert!(assigned.is_ok(), "arity checked when armed: {:?}", assigned);
        }
        self.current_step += 1;

        let setpoint = self.current_setpoint();

        let finished = if self.current_step >= total_steps {
            self.active = None;
            self.current_step = 0;
            info!("End Trajectory");
            Some(kind)
        } else {
            None
        };

        TickOutcome {
            setpoint: Some(setpoint),
            finished,
        }
    }

    /// Arm joints in registered order followed by the gripper joint
    pub fn current_setpoint(&self) -> Setpoint {
        let mut names: Vec<String> = self.joints.names().to_vec();
        let mut positions: Vec<f64> = self.goal_joint.as_slice().to_vec();
        names.push(self.gripper_name.clone());
        positions.push(self.goal_gripper.get(0).unwrap_or(0.0));
        Setpoint { names, positions }
    }
}
