//! Message model for externally planned joint paths

use std::time::Duration;

/// One waypoint; values are indexed like the owning trajectory's `joint_names`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JointTrajectoryPoint {
    pub positions: Vec<f64>,
    pub velocities: Vec<f64>,
    pub accelerations: Vec<f64>,
    pub time_from_start: Duration,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct JointTrajectory {
    pub joint_names: Vec<String>,
    pub points: Vec<JointTrajectoryPoint>,
}

/// A single planned path segment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RobotTrajectory {
    pub joint_trajectory: JointTrajectory,
}

/// Preview of a planned motion, possibly spanning several segments
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisplayTrajectory {
    pub model_id: String,
    pub trajectory: Vec<RobotTrajectory>,
}

impl DisplayTrajectory {
    /// Total waypoints over every segment
    pub fn waypoint_count(&self) -> usize {
        self.trajectory
            .iter()
            .map(|segment| segment.joint_trajectory.points.len())
            .sum()
    }

    /// Nominal time of the very last waypoint
    pub fn final_time(&self) -> Option<Duration> {
        self.trajectory
            .iter()
            .rev()
            .find_map(|segment| segment.joint_trajectory.points.last())
            .map(|point| point.time_from_start)
    }

    /// Single-segment path with evenly spaced waypoints
    pub fn from_positions(joint_names: &[&str], positions: &[Vec<f64>], spacing: Duration) -> Self {
        let points = positions
            .iter()
            .enumerate()
            .map(|(i, values)| JointTrajectoryPoint {
                positions: values.clone(),
                velocities: vec![0.0; values.len()],
                accelerations: vec![0.0; values.len()],
                time_from_start: spacing * i as u32,
            })
            .collect();

        DisplayTrajectory {
            model_id: String::new(),
            trajectory: vec![RobotTrajectory {
                joint_trajectory: JointTrajectory {
                    joint_names: joint_names.iter().map(|name| name.to_string()).collect(),
                    points,
                },
            }],
        }
    }
}
