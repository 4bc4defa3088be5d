//! Per-tick target tables

use crate::common::JointConfiguration;
use crate::error::{MotionError, Result};
use nalgebra::DMatrix;
use std::sync::Arc;

/// Which buffer a motion plays back from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionKind {
    Gripper,
    Joint,
}

/// A `num_steps x num_dof` table; row `i` is the target at `i * dt`
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryBuffer {
    table: DMatrix<f64>,
}

impl TrajectoryBuffer {
    /// Create a zero-filled table
    pub fn new(num_steps: usize, num_dof: usize) -> Self {
        TrajectoryBuffer {
            table: DMatrix::zeros(num_steps, num_dof),
        }
    }

    /// Resize to new dimensions; every cell is reset to zero
    pub fn resize(&mut self, num_steps: usize, num_dof: usize) {
        self.table = DMatrix::zeros(num_steps, num_dof);
    }

    /// Fill one DoF column; `values` must cover every row
    pub fn set_column(&mut self, dof: usize, values: &[f64]) -> Result<()> {
        if dof >= self.dof_count() {
            return Err(MotionError::InvalidParameter(format!(
                "column {} out of range for {} DoF",
                dof,
                self.dof_count()
            )));
        }
        if values.len() != self.row_count() {
            return Err(MotionError::ArityMismatch {
                expected: self.row_count(),
                actual: values.len(),
            });
        }
        self.table.column_mut(dof).copy_from_slice(values);
        Ok(())
    }

    /// Fill one row from a full configuration
    pub fn set_row(&mut self, step: usize, config: &JointConfiguration) -> Result<()> {
        if step >= self.row_count() {
            return Err(MotionError::InvalidParameter(format!(
                "row {} out of range for {} steps",
                step,
                self.row_count()
            )));
        }
        if config.arity() != self.dof_count() {
            return Err(MotionError::ArityMismatch {
                expected: self.dof_count(),
                actual: config.arity(),
            });
        }
        for (dof, value) in config.as_slice().iter().enumerate() {
            self.table[(step, dof)] = *value;
        }
        Ok(())
    }

    pub(crate) fn set(&mut self, step: usize, dof: usize, value: f64) {
        self.table[(step, dof)] = value;
    }

    /// Target configuration at a step, `None` past the end
    pub fn row(&self, step: usize) -> Option<JointConfiguration> {
        if step >= self.row_count() {
            return None;
        }
        let values: Vec<f64> = self.table.row(step).iter().copied().collect();
        Some(JointConfiguration::from_slice(&values))
    }

    pub fn value(&self, step: usize, dof: usize) -> Option<f64> {
        self.table.get((step, dof)).copied()
    }

    pub fn row_count(&self) -> usize {
        self.table.nrows()
    }

    pub fn dof_count(&self) -> usize {
        self.table.ncols()
    }
}

/// A finished trajectory ready to be armed.
///
/// The table sits behind an `Arc` and is never mutated once built; arming a
/// new motion swaps the whole `Trajectory`.
#[derive(Debug, Clone)]
pub struct Trajectory {
    kind: MotionKind,
    buffer: Arc<TrajectoryBuffer>,
    duration: f64,
}

impl Trajectory {
    pub fn new(kind: MotionKind, buffer: TrajectoryBuffer, duration: f64) -> Self {
        Trajectory {
            kind,
            buffer: Arc::new(buffer),
            duration,
        }
    }

    pub fn kind(&self) -> MotionKind {
        self.kind
    }

    pub fn buffer(&self) -> &TrajectoryBuffer {
        &self.buffer
    }

    /// Announced duration in seconds
    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn total_steps(&self) -> usize {
        self.buffer.row_count()
    }

    /// Copy of this trajectory whose first row is `start`; `self` is untouched
    pub fn with_first_row(&self, start: &JointConfiguration) -> Result<Trajectory> {
        let mut buffer = (*self.buffer).clone();
        buffer.set_row(0, start)?;
        Ok(Trajectory::new(self.kind, buffer, self.duration))
    }
}
