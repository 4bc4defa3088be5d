//! Ingestion of externally planned joint paths
pub mod messages;

use self::messages::DisplayTrajectory;
use crate::common::{JointConfiguration, ARM_DOF};
use crate::control::trajectory::buffer::{MotionKind, Trajectory, TrajectoryBuffer};
use crate::error::{MotionError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Planner feedback state meaning a previewed path is being executed
pub const EXECUTION_MONITOR_STATE: &str = "MONITOR";

/// True when a planner feedback state confirms execution
pub fn is_execution_confirmed(feedback_state: &str) -> bool {
    feedback_state == EXECUTION_MONITOR_STATE
}

/// Registered mapping from joint name to arm column
#[derive(Debug, Clone, Default)]
pub struct JointNameTable {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl JointNameTable {
    pub fn new() -> Self {
        JointNameTable::default()
    }

    /// Register names in column order
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        let mut table = JointNameTable::new();
        for name in names {
            table.register(name.as_ref())?;
        }
        Ok(table)
    }

    /// Append a joint; its column is the next free index
    pub fn register(&mut self, name: &str) -> Result<usize> {
        if self.index.contains_key(name) {
            return Err(MotionError::InvalidParameter(format!(
                "joint '{}' registered twice",
                name
            )));
        }
        let column = self.names.len();
        self.names.push(name.to_string());
        self.index.insert(name.to_string(), column);
        Ok(column)
    }

    pub fn resolve(&self, name: &str) -> Result<usize> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| MotionError::UnknownJoint(name.to_string()))
    }

    /// Names in column order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Turns a previewed multi-segment path into a playable joint table.
///
/// Waypoints are copied row by row in order; their timestamps are not
/// resampled onto the tick grid. Only the final waypoint time is kept, as
/// the announced duration.
#[derive(Debug, Clone)]
pub struct ExternalPathIngester {
    joints: Arc<JointNameTable>,
}

impl ExternalPathIngester {
    pub fn new(joints: Arc<JointNameTable>) -> Self {
        ExternalPathIngester { joints }
    }

    /// Build a joint trajectory starting from `last_commanded`
    pub fn ingest(
        &self,
        msg: &DisplayTrajectory,
        last_commanded: &JointConfiguration,
    ) -> Result<Trajectory> {
        if last_commanded.arity() != ARM_DOF {
            return Err(MotionError::ArityMismatch {
                expected: ARM_DOF,
                actual: last_commanded.arity(),
            });
        }

        let total_points = msg.waypoint_count();
        if total_points == 0 {
            return Err(MotionError::EmptyPath);
        }

        let mut buffer = TrajectoryBuffer::new(total_points, ARM_DOF);
        let mut resolved_any = false;
        let mut first_unknown: Option<String> = None;
        let mut row = 0;

        for segment in &msg.trajectory {
            let path = &segment.joint_trajectory;

            let columns: Vec<Option<usize>> = path
                .joint_names
                .iter()
                .map(|name| match self.joints.resolve(name) {
                    Ok(column) => {
                        resolved_any = true;
                        Some(column)
                    }
                    Err(err) => {
                        warn!("Skipping waypoint values: {}", err);
                        first_unknown.get_or_insert_with(|| name.clone());
                        None
                    }
                })
                .collect();

            for point in &path.points {
                // joints the segment does not mention hold their previous value
                if row == 0 {
                    buffer.set_row(0, last_commanded)?;
                } else {
                    for dof in 0..ARM_DOF {
                        let held = buffer.value(row - 1, dof).unwrap_or(0.0);
                        buffer.set(row, dof, held);
                    }
                }

                for (value_index, column) in columns.iter().enumerate() {
                    let Some(column) = column else { continue };
                    match point.positions.get(value_index) {
                        Some(&position) => buffer.set(row, *column, position),
                        None => warn!(
                            "Waypoint {} has no position for '{}'",
                            row, path.joint_names[value_index]
                        ),
                    }
                }
                row += 1;
            }
        }

        if !resolved_any {
            return Err(match first_unknown {
                Some(name) => MotionError::UnknownJoint(name),
                None => MotionError::InvalidParameter("path names no joints".to_string()),
            });
        }

        // first played sample is where the arm was last told to be
        buffer.set_row(0, last_commanded)?;

        let duration = msg
            .final_time()
            .map(|time| time.as_secs_f64())
            .unwrap_or(0.0);

        debug!(
            "Ingested external path: {} waypoints, announced {:.3}s",
            total_points, duration
        );

        Ok(Trajectory::new(MotionKind::Joint, buffer, duration))
    }
}
