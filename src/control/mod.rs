//! Control module for the manipulator
pub mod driver;
pub mod playback;
pub mod trajectory;

use self::driver::{ControllerHandle, DriverTasks, SetpointPublisher};
use crate::config::ControllerConfig;
use crate::error::{MotionError, Result};
use crate::lifecycle::{LifecycleNode, LifecycleNodeBase, State};
use std::any::Any;
use tracing::info;

/// Position controller node: owns the configuration and the running driver
pub struct PositionController {
    base: LifecycleNodeBase,
    config: ControllerConfig,
    publisher: Option<Box<dyn SetpointPublisher>>,
    handle: Option<ControllerHandle>,
    tasks: Option<DriverTasks>,
}

impl PositionController {
    /// Create a new position controller
    pub fn new<P: SetpointPublisher>(config: ControllerConfig, publisher: P) -> Self {
        PositionController {
            base: LifecycleNodeBase::new("position_controller"),
            config,
            publisher: Some(Box::new(publisher)),
            handle: None,
            tasks: None,
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn state(&self) -> State {
        self.base.get_state()
    }

    /// Handle to the running driver, available while active
    pub fn handle(&self) -> Option<ControllerHandle> {
        self.handle.clone()
    }

    /// Stop the driver and wait for its tasks to finish
    pub async fn shutdown(&mut self) -> Result<()> {
        if self.base.get_state() == State::Active {
            self.on_deactivate()?;
        }
        if let Some(tasks) = self.tasks.take() {
            tasks.join().await;
        }
        Ok(())
    }
}

impl LifecycleNode for PositionController {
    fn on_configure(&mut self) -> Result<()> {
        info!("Configuring position controller");
        self.config.validate()?;
        self.base.transition(State::Inactive)
    }

    fn on_activate(&mut self) -> Result<()> {
        if self.base.get_state() != State::Inactive {
            return Err(MotionError::Lifecycle(format!(
                "cannot activate from {:?}",
                self.base.get_state()
            )));
        }
        let publisher = self.publisher.take().ok_or_else(|| {
            MotionError::Lifecycle("setpoint publisher already consumed".to_string())
        })?;

        info!("Activating position controller");
        let (handle, tasks) = driver::spawn(&self.config, publisher)?;
        self.handle = Some(handle);
        self.tasks = Some(tasks);
        self.base.transition(State::Active)
    }

    fn on_deactivate(&mut self) -> Result<()> {
        if self.base.get_state() == State::Inactive {
            return Ok(());
        }
        info!("Deactivating position controller");
        self.base.transition(State::Inactive)?;
        if let Some(handle) = self.handle.take() {
            handle.shutdown();
        }
        Ok(())
    }

    fn on_cleanup(&mut self) -> Result<()> {
        info!("Cleaning up position controller");
        self.base.transition(State::Unconfigured)?;
        if let Some(tasks) = self.tasks.take() {
            tasks.abort();
        }
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
