use anyhow::{Context, Result};
use manipulator_core::config::ControllerConfig;
use manipulator_core::control::playback::Setpoint;
use manipulator_core::control::PositionController;
use manipulator_core::ManipulatorCore;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn load_config() -> Result<ControllerConfig> {
    match std::env::args().nth(1) {
        Some(path) => ControllerConfig::from_file(&path)
            .with_context(|| format!("failed to load config from {}", path)),
        None => Ok(ControllerConfig::default()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = load_config()?;
    info!(
        "Using parameters: control_frequency={}, gripper_move_time={}",
        config.control_frequency, config.gripper.move_time
    );

    let (setpoint_tx, mut setpoint_rx) = mpsc::channel::<Setpoint>(config.setpoint_queue_depth);

    let mut core = ManipulatorCore::new();
    core.register(PositionController::new(config, setpoint_tx));
    core.init()?;

    let handle = core
        .position_controller_mut()
        .and_then(|controller| controller.handle())
        .context("position controller did not start")?;

    tokio::spawn(async move {
        while let Some(setpoint) = setpoint_rx.recv().await {
            info!("goal_joint_states {:?} = {:?}", setpoint.names, setpoint.positions);
        }
    });

    info!("Send 'grip_on', 'grip_off', 'present <j1> <j2> <j3> <j4> <grip>' or 'MONITOR'");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(values) = line.strip_prefix("present ") {
            let parsed: Result<Vec<f64>, _> =
                values.split_whitespace().map(str::parse::<f64>).collect();
            match parsed {
                Ok(values) => {
                    if let Err(e) = handle.update_present_configuration(&values) {
                        error!("Ignoring present configuration: {}", e);
                    }
                }
                Err(e) => error!("Malformed present configuration: {}", e),
            }
            continue;
        }
        if line == manipulator_core::planning::EXECUTION_MONITOR_STATE {
            handle.planner_feedback(line)?;
            continue;
        }
        // unknown tokens are logged by the handle and leave state untouched
        let _ = handle.submit_command(line);
    }

    if let Some(controller) = core.position_controller_mut() {
        controller.shutdown().await?;
    }
    core.shutdown()?;
    Ok(())
}
