//! Minimum-jerk trajectory generation
//!
//! Each DoF follows a quintic polynomial fixed by position, velocity and
//! acceleration at both ends. All columns of a table share one [`TimeGrid`],
//! whose duration is snapped to a whole number of samples so the last row
//! lands exactly on a tick.

pub mod buffer;

use self::buffer::{MotionKind, Trajectory, TrajectoryBuffer};
use crate::error::{MotionError, Result};

/// Tolerance when flooring `duration / dt`, so durations that are already
/// a whole number of samples are not lost to rounding
const GRID_EPSILON: f64 = 1e-9;

/// Upper bound on the samples in one trajectory
pub const MAX_STEPS: usize = 1_000_000;

/// Position, velocity and acceleration at one end of a segment
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundaryCondition {
    pub position: f64,
    pub velocity: f64,
    pub acceleration: f64,
}

impl BoundaryCondition {
    pub fn new(position: f64, velocity: f64, acceleration: f64) -> Self {
        BoundaryCondition {
            position,
            velocity,
            acceleration,
        }
    }

    /// Boundary with zero velocity and acceleration
    pub fn at_rest(position: f64) -> Self {
        BoundaryCondition::new(position, 0.0, 0.0)
    }
}

/// Sample grid shared by every column of a trajectory
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeGrid {
    dt: f64,
    num_steps: usize,
}

impl TimeGrid {
    /// `num_steps = floor(duration / dt) + 1`; at least two samples required
    pub fn new(dt: f64, duration: f64) -> Result<Self> {
        if !(dt > 0.0) || !dt.is_finite() {
            return Err(MotionError::InvalidParameter(format!(
                "sample interval must be positive, got {}",
                dt
            )));
        }
        if !(duration > 0.0) || !duration.is_finite() {
            return Err(MotionError::InvalidParameter(format!(
                "duration must be positive, got {}",
                duration
            )));
        }

        let ratio = duration / dt + GRID_EPSILON;
        if !ratio.is_finite() || ratio >= MAX_STEPS as f64 {
            return Err(MotionError::InvalidParameter(format!(
                "duration {} at dt {} exceeds {} samples",
                duration, dt, MAX_STEPS
            )));
        }
        let num_steps = (ratio.floor() as usize).checked_add(1).ok_or_else(|| {
            MotionError::InvalidParameter(format!("too many samples for dt {}", dt))
        })?;
        if num_steps < 2 {
            return Err(MotionError::InvalidParameter(format!(
                "duration {} is shorter than one sample of {}",
                duration, dt
            )));
        }

        Ok(TimeGrid { dt, num_steps })
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn num_steps(&self) -> usize {
        self.num_steps
    }

    /// Duration snapped to the tick grid, `(num_steps - 1) * dt`
    pub fn duration(&self) -> f64 {
        (self.num_steps - 1) as f64 * self.dt
    }

    /// Sample time of a row
    pub fn time_at(&self, step: usize) -> f64 {
        step as f64 * self.dt
    }
}

/// Quintic `p(t) = c0 + c1 t + ... + c5 t^5` on `[0, duration]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuinticSegment {
    coeffs: [f64; 6],
    duration: f64,
}

impl QuinticSegment {
    /// Closed-form minimum-jerk coefficients for the given boundaries
    pub fn new(start: BoundaryCondition, end: BoundaryCondition, duration: f64) -> Result<Self> {
        if !(duration > 0.0) || !duration.is_finite() {
            return Err(MotionError::InvalidParameter(format!(
                "duration must be positive, got {}",
                duration
            )));
        }

        let t1 = duration;
        let t2 = t1 * t1;
        let t3 = t2 * t1;
        let t4 = t3 * t1;
        let t5 = t4 * t1;
        let dq = end.position - start.position;
        let (v0, v1) = (start.velocity, end.velocity);
        let (a0, a1) = (start.acceleration, end.acceleration);

        let c3 = (20.0 * dq - (8.0 * v1 + 12.0 * v0) * t1 - (3.0 * a0 - a1) * t2) / (2.0 * t3);
        let c4 = (-30.0 * dq + (14.0 * v1 + 16.0 * v0) * t1 + (3.0 * a0 - 2.0 * a1) * t2)
            / (2.0 * t4);
        let c5 = (12.0 * dq - 6.0 * (v1 + v0) * t1 + (a1 - a0) * t2) / (2.0 * t5);

        Ok(QuinticSegment {
            coeffs: [start.position, v0, 0.5 * a0, c3, c4, c5],
            duration,
        })
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn position(&self, t: f64) -> f64 {
        let c = &self.coeffs;
        c[0] + t * (c[1] + t * (c[2] + t * (c[3] + t * (c[4] + t * c[5]))))
    }

    pub fn velocity(&self, t: f64) -> f64 {
        let c = &self.coeffs;
        c[1] + t * (2.0 * c[2] + t * (3.0 * c[3] + t * (4.0 * c[4] + t * 5.0 * c[5])))
    }

    pub fn acceleration(&self, t: f64) -> f64 {
        let c = &self.coeffs;
        2.0 * c[2] + t * (6.0 * c[3] + t * (12.0 * c[4] + t * 20.0 * c[5]))
    }

    pub fn jerk(&self, t: f64) -> f64 {
        let c = &self.coeffs;
        6.0 * c[3] + t * (24.0 * c[4] + t * 60.0 * c[5])
    }
}

/// Stateless minimum-jerk trajectory generator
#[derive(Debug, Default, Clone, Copy)]
pub struct TrajectoryGenerator;

impl TrajectoryGenerator {
    pub fn new() -> Self {
        TrajectoryGenerator
    }

    /// Sample one DoF from `start` to `end` every `dt` seconds.
    ///
    /// `duration` is snapped to the sample grid first, so the returned column
    /// has `floor(duration / dt) + 1` entries and ends exactly at `end`.
    pub fn generate(
        &self,
        start: BoundaryCondition,
        end: BoundaryCondition,
        dt: f64,
        duration: f64,
    ) -> Result<Vec<f64>> {
        let grid = TimeGrid::new(dt, duration)?;
        self.generate_column(start, end, &grid)
    }

    /// Sample one DoF on an existing grid
    pub fn generate_column(
        &self,
        start: BoundaryCondition,
        end: BoundaryCondition,
        grid: &TimeGrid,
    ) -> Result<Vec<f64>> {
        let segment = QuinticSegment::new(start, end, grid.duration())?;
        let mut column: Vec<f64> = (0..grid.num_steps())
            .map(|step| segment.position(grid.time_at(step)))
            .collect();
        // pin the final sample so completion lands exactly on the goal
        if let Some(last) = column.last_mut() {
            *last = end.position;
        }
        Ok(column)
    }

    /// Build a multi-DoF table where every column shares one time grid
    pub fn generate_table(
        &self,
        starts: &[BoundaryCondition],
        ends: &[BoundaryCondition],
        grid: &TimeGrid,
    ) -> Result<TrajectoryBuffer> {
        if starts.len() != ends.len() {
            return Err(MotionError::ArityMismatch {
                expected: starts.len(),
                actual: ends.len(),
            });
        }
        if starts.is_empty() {
            return Err(MotionError::InvalidParameter(
                "trajectory needs at least one DoF".to_string(),
            ));
        }

        let mut buffer = TrajectoryBuffer::new(grid.num_steps(), starts.len());
        for (dof, (start, end)) in starts.iter().zip(ends.iter()).enumerate() {
            let column = self.generate_column(*start, *end, grid)?;
            buffer.set_column(dof, &column)?;
        }
        Ok(buffer)
    }

    /// Point-to-point rest-to-rest motion, ready to arm
    pub fn point_to_point(
        &self,
        kind: MotionKind,
        from: &[f64],
        to: &[f64],
        dt: f64,
        duration: f64,
    ) -> Result<Trajectory> {
        let grid = TimeGrid::new(dt, duration)?;
        let starts: Vec<BoundaryCondition> =
            from.iter().map(|&q| BoundaryCondition::at_rest(q)).collect();
        let ends: Vec<BoundaryCondition> =
            to.iter().map(|&q| BoundaryCondition::at_rest(q)).collect();
        let buffer = self.generate_table(&starts, &ends, &grid)?;
        Ok(Trajectory::new(kind, buffer, grid.duration()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-9;

    #[test]
    fn test_time_grid_snaps_duration() {
        let grid = TimeGrid::new(0.01, 2.0).unwrap();
        assert_eq!(grid.num_steps(), 201);
        assert!((grid.duration() - 2.0).abs() < TOL);

        let grid = TimeGrid::new(0.03, 0.1).unwrap();
        assert_eq!(grid.dt(), 0.03);
        assert_eq!(grid.num_steps(), 4);
        assert!((grid.duration() - 0.09).abs() < TOL);
    }

    #[test]
    fn test_time_grid_rejects_degenerate_input() {
        assert!(matches!(
            TimeGrid::new(0.0, 1.0),
            Err(MotionError::InvalidParameter(_))
        ));
        assert!(matches!(
            TimeGrid::new(0.01, -1.0),
            Err(MotionError::InvalidParameter(_))
        ));
        assert!(matches!(
            TimeGrid::new(0.01, 0.005),
            Err(MotionError::InvalidParameter(_))
        ));
        assert!(TimeGrid::new(f64::NAN, 1.0).is_err());
    }

    #[test]
    fn test_time_grid_rejects_unbounded_step_count() {
        // ratio overflows to infinity
        assert!(matches!(
            TimeGrid::new(1e-300, 1e300),
            Err(MotionError::InvalidParameter(_))
        ));
        // finite, but far too many samples to allocate
        assert!(matches!(
            TimeGrid::new(1e-10, 2.0),
            Err(MotionError::InvalidParameter(_))
        ));
        assert!(matches!(
            TimeGrid::new(1.0, MAX_STEPS as f64),
            Err(MotionError::InvalidParameter(_))
        ));

        let grid = TimeGrid::new(1.0, (MAX_STEPS - 2) as f64).unwrap();
        assert_eq!(grid.num_steps(), MAX_STEPS - 1);
        assert_eq!(grid.dt(), 1.0);
    }

    #[test]
    fn test_rest_to_rest_profile() {
        let segment = QuinticSegment::new(
            BoundaryCondition::at_rest(0.0),
            BoundaryCondition::at_rest(1.0),
            1.0,
        )
        .unwrap();
        // symmetric profile passes the midpoint halfway through
        assert!((segment.position(0.5) - 0.5).abs() < TOL);
        assert!((segment.velocity(0.5) - 1.875).abs() < TOL);
        assert!(segment.acceleration(0.5).abs() < TOL);
        // jerk starts at 60 * delta / T^3 and is symmetric about the midpoint
        assert!((segment.jerk(0.0) - 60.0).abs() < TOL);
        assert!((segment.jerk(1.0) - 60.0).abs() < TOL);
        assert!((segment.jerk(0.5) + 30.0).abs() < TOL);
    }

    #[test]
    fn test_general_boundaries_are_met() {
        let start = BoundaryCondition::new(0.3, -0.4, 1.2);
        let end = BoundaryCondition::new(-1.1, 0.25, -0.6);
        let segment = QuinticSegment::new(start, end, 1.7).unwrap();

        assert!((segment.position(0.0) - 0.3).abs() < TOL);
        assert!((segment.velocity(0.0) + 0.4).abs() < TOL);
        assert!((segment.acceleration(0.0) - 1.2).abs() < TOL);
        assert!((segment.position(1.7) + 1.1).abs() < TOL);
        assert!((segment.velocity(1.7) - 0.25).abs() < TOL);
        assert!((segment.acceleration(1.7) + 0.6).abs() < TOL);
    }

    #[test]
    fn test_generate_column_endpoints() {
        let generator = TrajectoryGenerator::new();
        let column = generator
            .generate(
                BoundaryCondition::at_rest(0.2),
                BoundaryCondition::at_rest(-0.7),
                0.01,
                0.5,
            )
            .unwrap();
        assert_eq!(column.len(), 51);
        assert!((column[0] - 0.2).abs() < TOL);
        assert_eq!(*column.last().unwrap(), -0.7);
    }

    #[test]
    fn test_generate_table_shares_grid() {
        let generator = TrajectoryGenerator::new();
        let grid = TimeGrid::new(0.01, 0.3).unwrap();
        let starts = [BoundaryCondition::at_rest(0.0), BoundaryCondition::at_rest(1.0)];
        let ends = [BoundaryCondition::at_rest(1.0), BoundaryCondition::at_rest(1.0)];
        let table = generator.generate_table(&starts, &ends, &grid).unwrap();

        assert_eq!(table.row_count(), 31);
        assert_eq!(table.dof_count(), 2);
        // a DoF with equal endpoints stays put
        for step in 0..table.row_count() {
            assert!((table.value(step, 1).unwrap() - 1.0).abs() < TOL);
        }
        assert!(generator.generate_table(&starts, &ends[..1], &grid).is_err());
    }
}
