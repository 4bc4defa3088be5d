pub mod command;
pub mod common;
pub mod config;
pub mod control;
pub mod error;
pub mod feedback;
pub mod lifecycle;
pub mod planning;

use crate::control::PositionController;
use crate::error::Result;
use crate::lifecycle::LifecycleNode;

pub use crate::error::MotionError;

/// Motion execution core for the manipulator
pub struct ManipulatorCore {
    components: Vec<Box<dyn LifecycleNode>>,
}

impl Default for ManipulatorCore {
    fn default() -> Self {
        Self::new()
    }
}

impl ManipulatorCore {
    /// Create a new instance of ManipulatorCore
    pub fn new() -> Self {
        ManipulatorCore {
            components: Vec::new(),
        }
    }

    /// Register a component with the core
    pub fn register<T: LifecycleNode + 'static>(&mut self, component: T) {
        self.components.push(Box::new(component));
    }

    /// Configure and activate all registered components
    pub fn init(&mut self) -> Result<()> {
        for component in &mut self.components {
            component.on_configure()?;
            component.on_activate()?;
        }
        Ok(())
    }

    /// Deactivate and clean up all registered components, in reverse order
    pub fn shutdown(&mut self) -> Result<()> {
        for component in self.components.iter_mut().rev() {
            component.on_deactivate()?;
            component.on_cleanup()?;
        }
        Ok(())
    }

    /// Get a reference to the position controller
    pub fn position_controller_mut(&mut self) -> Option<&mut PositionController> {
        self.components
            .iter_mut()
            .find_map(|component| component.as_any_mut().downcast_mut::<PositionController>())
    }
}
