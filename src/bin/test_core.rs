use manipulator_core::config::ControllerConfig;
use manipulator_core::control::playback::{PlaybackState, Setpoint};
use manipulator_core::control::PositionController;
use manipulator_core::planning::messages::DisplayTrajectory;
use manipulator_core::ManipulatorCore;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{error, info};

async fn wait_until_idle(states: &mut watch::Receiver<PlaybackState>) {
    let _ = states.wait_for(|state| !state.is_moving()).await;
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().init();

    info!("Initializing Manipulator Core...");

    let mut config = ControllerConfig::default();
    config.gripper.move_time = 0.5;
    config.path_settle_time = 0.0;

    let (setpoint_tx, mut setpoint_rx) = mpsc::channel::<Setpoint>(1024);
    let mut core = ManipulatorCore::new();
    core.register(PositionController::new(config, setpoint_tx));

    match core.init() {
        Ok(_) => info!("Core initialized successfully!"),
        Err(e) => {
            error!("Failed to initialize core: {}", e);
            return;
        }
    }

    let Some(handle) = core.position_controller_mut().and_then(|c| c.handle()) else {
        error!("Position controller has no running driver");
        return;
    };

    let mut states = handle.watch_state();

    if let Err(e) = handle.update_present_configuration(&[0.0, 0.0, 0.0, 0.0, 0.0]) {
        error!("Failed to set present configuration: {}", e);
    }

    // grip, then release
    for token in ["grip_on", "foo", "grip_off"] {
        if handle.submit_command(token).is_ok() {
            let _ = states.changed().await;
            wait_until_idle(&mut states).await;
        }
    }

    // previewed path only plays once execution is confirmed
    let path = DisplayTrajectory::from_positions(
        &["joint1", "joint2", "joint3", "joint4"],
        &[
            vec![0.0, 0.0, 0.0, 0.0],
            vec![0.1, -0.2, 0.15, 0.05],
            vec![0.2, -0.4, 0.3, 0.1],
        ],
        Duration::from_millis(500),
    );
    if let Err(e) = handle.submit_path(path) {
        error!("Failed to submit path: {}", e);
    }
    tokio::time::sleep(Duration::from_millis(50)).await;
    info!("Moving before confirmation: {}", handle.playback_state().is_moving());

    if let Err(e) = handle.planner_feedback("MONITOR") {
        error!("Failed to confirm execution: {}", e);
    }
    let _ = states.changed().await;
    wait_until_idle(&mut states).await;
    info!("Last commanded joints: {:?}", handle.last_commanded().as_slice());

    let mut published = 0;
    while setpoint_rx.try_recv().is_ok() {
        published += 1;
    }
    info!("Published {} setpoints", published);

    if let Some(controller) = core.position_controller_mut() {
        if let Err(e) = controller.shutdown().await {
            error!("Failed to stop controller: {}", e);
        }
    }
    match core.shutdown() {
        Ok(_) => info!("Core shutdown successfully!"),
        Err(e) => error!("Failed to shutdown core: {}", e),
    }
}
