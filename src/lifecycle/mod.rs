//! Lifecycle management for manipulator components

use crate::error::{MotionError, Result};
use std::any::Any;

/// Trait for components that follow a lifecycle pattern
pub trait LifecycleNode: Send {
    /// Configure the node
    fn on_configure(&mut self) -> Result<()>;

    /// Activate the node
    fn on_activate(&mut self) -> Result<()>;

    /// Deactivate the node
    fn on_deactivate(&mut self) -> Result<()>;

    /// Clean up the node
    fn on_cleanup(&mut self) -> Result<()>;

    /// Convert to Any for downcasting
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// State of a lifecycle node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Unconfigured,
    Inactive,
    Active,
}

/// Base implementation for lifecycle nodes
pub struct LifecycleNodeBase {
    pub name: String,
    state: State,
}

impl LifecycleNodeBase {
    /// Create a new lifecycle node base
    pub fn new(name: &str) -> Self {
        LifecycleNodeBase {
            name: name.to_string(),
            state: State::Unconfigured,
        }
    }

    /// Get the current state
    pub fn get_state(&self) -> State {
        self.state
    }

    /// Move to `next`, rejecting transitions the lifecycle does not allow
    pub fn transition(&mut self, next: State) -> Result<()> {
        let allowed = matches!(
            (self.state, next),
            (State::Unconfigured, State::Inactive)
                | (State::Inactive, State::Active)
                | (State::Active, State::Inactive)
                | (State::Inactive, State::Unconfigured)
        );
        if !allowed {
            return Err(MotionError::Lifecycle(format!(
                "{}: cannot go from {:?} to {:?}",
                self.name, self.state, next
            )));
        }
        self.state = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions() {
        let mut base = LifecycleNodeBase::new("node");
        assert!(base.transition(State::Active).is_err());
        base.transition(State::Inactive).unwrap();
        base.transition(State::Active).unwrap();
        assert!(base.transition(State::Unconfigured).is_err());
        base.transition(State::Inactive).unwrap();
        base.transition(State::Unconfigured).unwrap();
        assert_eq!(base.get_state(), State::Unconfigured);
    }
}
