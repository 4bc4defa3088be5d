//! Common utilities and types shared across the motion core

use crate::error::{MotionError, Result};
use nalgebra::DVector;

/// Number of arm joints on the manipulator
pub const ARM_DOF: usize = 4;

/// Number of gripper axes
pub const GRIPPER_DOF: usize = 1;

/// Arity of the present configuration feed (arm joints followed by gripper)
pub const PRESENT_DOF: usize = ARM_DOF + GRIPPER_DOF;

/// Unit conversion between the command boundary and trajectory math.
///
/// Everything below the manual command feed works in radians.
pub mod units {
    use std::f64::consts::PI;

    /// Degrees to radians
    pub fn deg_to_rad(deg: f64) -> f64 {
        deg * PI / 180.0
    }

    /// Radians to degrees
    pub fn rad_to_deg(rad: f64) -> f64 {
        rad * 180.0 / PI
    }
}

/// An ordered set of joint positions in radians whose arity never changes
#[derive(Debug, Clone, PartialEq)]
pub struct JointConfiguration {
    values: DVector<f64>,
}

impl JointConfiguration {
    /// All-zero configuration of the given arity
    pub fn zeros(arity: usize) -> Self {
        JointConfiguration {
            values: DVector::zeros(arity),
        }
    }

    /// Build a configuration from a slice
    pub fn from_slice(values: &[f64]) -> Self {
        JointConfiguration {
            values: DVector::from_column_slice(values),
        }
    }

    /// Number of degrees of freedom
    pub fn arity(&self) -> usize {
        self.values.len()
    }

    /// Position of one axis
    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied()
    }

    /// Overwrite every value, rejecting a vector of different arity
    pub fn assign(&mut self, values: &[f64]) -> Result<()> {
        if values.len() != self.arity() {
            return Err(MotionError::ArityMismatch {
                expected: self.arity(),
                actual: values.len(),
            });
        }
        self.values.copy_from_slice(values);
        Ok(())
    }

    pub fn as_slice(&self) -> &[f64] {
        self.values.as_slice()
    }

    pub fn as_vector(&self) -> &DVector<f64> {
        &self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_units_round_trip() {
        let rad = units::deg_to_rad(-75.0);
        assert!((rad + 1.308_996_938_995_747).abs() < 1e-12);
        assert!((units::rad_to_deg(rad) + 75.0).abs() < 1e-12);
    }

    #[test]
    fn test_assign_keeps_arity() {
        let mut config = JointConfiguration::zeros(ARM_DOF);
        assert!(config.assign(&[0.1, 0.2, 0.3, 0.4]).is_ok());
        assert_eq!(config.get(2), Some(0.3));

        let err = config.assign(&[1.0, 2.0]).unwrap_err();
        assert!(matches!(
            err,
            MotionError::ArityMismatch {
                expected: 4,
                actual: 2
            }
        ));
        assert_eq!(config.as_slice(), &[0.1, 0.2, 0.3, 0.4]);
    }
}
