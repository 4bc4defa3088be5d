//! Present configuration feed
//!
//! Holds only the most recent joint + gripper reading. Writers overwrite,
//! readers see the latest value; nothing is queued.

use crate::common::{JointConfiguration, ARM_DOF, PRESENT_DOF};
use crate::error::{MotionError, Result};
use tokio::sync::watch;

#[derive(Debug)]
pub struct PresentConfigurationFeed {
    latest: watch::Sender<Option<JointConfiguration>>,
}

impl Default for PresentConfigurationFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl PresentConfigurationFeed {
    pub fn new() -> Self {
        let (latest, _) = watch::channel(None);
        PresentConfigurationFeed { latest }
    }

    /// Replace the reading; `positions` is arm joints then gripper
    pub fn update(&self, positions: &[f64]) -> Result<()> {
        if positions.len() != PRESENT_DOF {
            return Err(MotionError::ArityMismatch {
                expected: PRESENT_DOF,
                actual: positions.len(),
            });
        }
        self.latest
            .send_replace(Some(JointConfiguration::from_slice(positions)));
        Ok(())
    }

    pub fn has_received(&self) -> bool {
        self.latest.borrow().is_some()
    }

    /// Latest reading, or `StaleConfiguration` before the first update
    pub fn latest(&self) -> Result<JointConfiguration> {
        self.latest
            .borrow()
            .clone()
            .ok_or(MotionError::StaleConfiguration)
    }

    /// Present gripper aperture
    pub fn gripper_position(&self) -> Result<f64> {
        self.latest()?
            .get(ARM_DOF)
            .ok_or(MotionError::StaleConfiguration)
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<JointConfiguration>> {
        self.latest.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stale_until_first_update() {
        let feed = PresentConfigurationFeed::new();
        assert!(!feed.has_received());
        assert!(matches!(
            feed.gripper_position(),
            Err(MotionError::StaleConfiguration)
        ));

        feed.update(&[0.0, 0.1, 0.2, 0.3, -0.5]).unwrap();
        assert_eq!(feed.gripper_position().unwrap(), -0.5);
    }

    #[test]
    fn test_latest_value_wins() {
        let feed = PresentConfigurationFeed::new();
        let rx = feed.subscribe();
        feed.update(&[0.0; 5]).unwrap();
        feed.update(&[1.0, 1.0, 1.0, 1.0, 1.0]).unwrap();
        assert!(feed.update(&[2.0; 3]).is_err());

        assert_eq!(feed.latest().unwrap().as_slice(), &[1.0; 5]);
        assert_eq!(rx.borrow().as_ref().unwrap().as_slice(), &[1.0; 5]);
    }
}
