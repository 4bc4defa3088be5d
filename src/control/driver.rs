//! Fixed-rate driving loop and its inbound queues
//!
//! The driver task exclusively owns the [`PlaybackEngine`]. Inbound
//! handlers never touch it directly: gripper trajectories are generated on
//! the caller's side and external paths are ingested by a single worker
//! task, and both reach the driver as finished [`Trajectory`] values over a
//! channel. Arming is therefore a whole-value swap between two ticks.

use super::playback::{PlaybackEngine, PlaybackState, Setpoint};
use super::trajectory::buffer::Trajectory;
use crate::command::{GripCommand, GripPlanner};
use crate::common::{JointConfiguration, ARM_DOF};
use crate::config::ControllerConfig;
use crate::error::{MotionError, Result};
use crate::feedback::PresentConfigurationFeed;
use crate::planning::messages::DisplayTrajectory;
use crate::planning::{is_execution_confirmed, ExternalPathIngester, JointNameTable};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

const REQUEST_QUEUE_DEPTH: usize = 32;

/// Sink for the per-tick setpoint
pub trait SetpointPublisher: Send + 'static {
    fn publish(&mut self, setpoint: &Setpoint) -> Result<()>;
}

impl SetpointPublisher for mpsc::Sender<Setpoint> {
    fn publish(&mut self, setpoint: &Setpoint) -> Result<()> {
        self.try_send(setpoint.clone()).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => MotionError::Busy,
            mpsc::error::TrySendError::Closed(_) => MotionError::NotRunning,
        })
    }
}

impl SetpointPublisher for Box<dyn SetpointPublisher> {
    fn publish(&mut self, setpoint: &Setpoint) -> Result<()> {
        (**self).publish(setpoint)
    }
}

#[derive(Debug)]
enum DriverRequest {
    Arm(Trajectory),
    OfferJointPath(Trajectory),
    ConfirmExecution,
}

/// Cloneable front end used by inbound message handlers
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    requests: mpsc::Sender<DriverRequest>,
    paths: mpsc::Sender<DisplayTrajectory>,
    present: Arc<PresentConfigurationFeed>,
    grip_planner: GripPlanner,
    state: watch::Receiver<PlaybackState>,
    last_commanded: watch::Receiver<JointConfiguration>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl ControllerHandle {
    /// Overwrite the present joint + gripper reading
    pub fn update_present_configuration(&self, positions: &[f64]) -> Result<()> {
        self.present.update(positions)
    }

    /// Handle a manual command token. Unknown tokens are logged and leave
    /// the controller untouched.
    pub fn submit_command(&self, token: &str) -> Result<GripCommand> {
        let command: GripCommand = match token.parse() {
            Ok(command) => command,
            Err(err) => {
                error!(
                    "{}. If you want to grip or release something, send 'grip_on' or 'grip_off'",
                    err
                );
                return Err(err);
            }
        };
        self.grip(command)?;
        Ok(command)
    }

    /// Generate and arm a gripper motion from the present aperture
    pub fn grip(&self, command: GripCommand) -> Result<()> {
        let start = match self.present.gripper_position() {
            Ok(position) => position,
            Err(err) => {
                warn!("{}; starting {} from zero", err, command);
                0.0
            }
        };
        let trajectory = self.grip_planner.plan(command, start)?;
        self.send(DriverRequest::Arm(trajectory))
    }

    /// Queue an externally planned path for ingestion
    pub fn submit_path(&self, path: DisplayTrajectory) -> Result<()> {
        self.paths.try_send(path).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => {
                warn!("Ingestion queue full, dropping external path");
                MotionError::Busy
            }
            mpsc::error::TrySendError::Closed(_) => MotionError::NotRunning,
        })
    }

    /// Signal that the most recent path is being executed
    pub fn confirm_execution(&self) -> Result<()> {
        self.send(DriverRequest::ConfirmExecution)
    }

    /// Forward a planner feedback state; only the monitor state confirms
    pub fn planner_feedback(&self, state: &str) -> Result<bool> {
        if is_execution_confirmed(state) {
            self.confirm_execution()?;
            return Ok(true);
        }
        Ok(false)
    }

    pub fn playback_state(&self) -> PlaybackState {
        *self.state.borrow()
    }

    /// Receiver that wakes on every playback state change
    pub fn watch_state(&self) -> watch::Receiver<PlaybackState> {
        self.state.clone()
    }

    pub fn last_commanded(&self) -> JointConfiguration {
        self.last_commanded.borrow().clone()
    }

    /// Ask the driver and ingestion worker to stop
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    pub fn is_running(&self) -> bool {
        !*self.shutdown.borrow() && !self.requests.is_closed()
    }

    fn send(&self, request: DriverRequest) -> Result<()> {
        self.requests.try_send(request).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => MotionError::Busy,
            mpsc::error::TrySendError::Closed(_) => MotionError::NotRunning,
        })
    }
}

/// Join handles of the spawned tasks
#[derive(Debug)]
pub struct DriverTasks {
    driver: JoinHandle<()>,
    ingest: JoinHandle<()>,
}

impl DriverTasks {
    /// Wait for both tasks to exit
    pub async fn join(self) {
        if let Err(e) = self.driver.await {
            error!("Driver task failed: {}", e);
        }
        if let Err(e) = self.ingest.await {
            error!("Ingestion task failed: {}", e);
        }
    }

    pub fn abort(&self) {
        self.driver.abort();
        self.ingest.abort();
    }
}

/// Spawn the driving loop and the ingestion worker on the current runtime
pub fn spawn<P: SetpointPublisher>(
    config: &ControllerConfig,
    publisher: P,
) -> Result<(ControllerHandle, DriverTasks)> {
    config.validate()?;
    let period = config.sample_period()?;
    let settle = config.settle_period()?;
    let runtime = tokio::runtime::Handle::try_current()
        .map_err(|e| MotionError::Lifecycle(format!("no tokio runtime: {}", e)))?;

    let joints = Arc::new(JointNameTable::from_names(&config.joint_names)?);
    let engine = PlaybackEngine::new(Arc::clone(&joints), &config.gripper.joint_name);

    let (request_tx, request_rx) = mpsc::channel(REQUEST_QUEUE_DEPTH);
    let (path_tx, path_rx) = mpsc::channel(config.ingest_queue_depth);
    let (state_tx, state_rx) = watch::channel(PlaybackState::idle());
    let (commanded_tx, commanded_rx) = watch::channel(JointConfiguration::zeros(ARM_DOF));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let driver = runtime.spawn(run_driver(
        engine,
        request_rx,
        publisher,
        state_tx,
        commanded_tx,
        period,
        shutdown_rx.clone(),
    ));
    let ingest = runtime.spawn(run_ingestion(
        ExternalPathIngester::new(joints),
        path_rx,
        request_tx.clone(),
        commanded_rx.clone(),
        settle,
        shutdown_rx,
    ));

    info!(
        "Position controller running at {:.1} Hz",
        config.control_frequency
    );

    let handle = ControllerHandle {
        requests: request_tx,
        paths: path_tx,
        present: Arc::new(PresentConfigurationFeed::new()),
        grip_planner: GripPlanner::new(&config.gripper, config.sample_interval()),
        state: state_rx,
        last_commanded: commanded_rx,
        shutdown: Arc::new(shutdown_tx),
    };

    Ok((handle, DriverTasks { driver, ingest }))
}

async fn run_driver<P: SetpointPublisher>(
    mut engine: PlaybackEngine,
    mut requests: mpsc::Receiver<DriverRequest>,
    mut publisher: P,
    state: watch::Sender<PlaybackState>,
    commanded: watch::Sender<JointConfiguration>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            request = requests.recv() => {
                let Some(request) = request else { break };
                let result = match request {
                    DriverRequest::Arm(trajectory) => engine.arm(trajectory).map(|_| true),
                    DriverRequest::OfferJointPath(trajectory) => engine.offer_joint_path(trajectory),
                    DriverRequest::ConfirmExecution => engine.confirm_execution(),
                };
                match result {
                    Ok(armed) => debug!("Request handled, armed={}", armed),
                    Err(e) => warn!("Rejected motion request: {}", e),
                }
                state.send_replace(engine.state());
            }
            _ = interval.tick() => {
                let outcome = engine.tick();
                if let Some(setpoint) = &outcome.setpoint {
                    if let Err(e) = publisher.publish(setpoint) {
                        warn!("Failed to publish setpoint: {}", e);
                    }
                }
                if outcome.setpoint.is_some() {
                    commanded.send_if_modified(|current| {
                        if *current != *engine.last_commanded_joints() {
                            *current = engine.last_commanded_joints().clone();
                            true
                        } else {
                            false
                        }
                    });
                }
                state.send_if_modified(|current| {
                    let next = engine.state();
                    if *current != next {
                        *current = next;
                        true
                    } else {
                        false
                    }
                });
            }
        }
    }

    info!("Position controller stopped");
}

async fn run_ingestion(
    ingester: ExternalPathIngester,
    mut paths: mpsc::Receiver<DisplayTrajectory>,
    requests: mpsc::Sender<DriverRequest>,
    commanded: watch::Receiver<JointConfiguration>,
    settle: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let path = tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
            path = paths.recv() => match path {
                Some(path) => path,
                None => break,
            },
        };

        let start = commanded.borrow().clone();
        let trajectory = match ingester.ingest(&path, &start) {
            Ok(trajectory) => trajectory,
            Err(e) => {
                warn!("Discarding external path: {}", e);
                continue;
            }
        };

        if !settle.is_zero() {
            tokio::time::sleep(settle).await;
        }

        if requests
            .send(DriverRequest::OfferJointPath(trajectory))
            .await
            .is_err()
        {
            break;
        }
    }
    debug!("Ingestion worker stopped");
}
