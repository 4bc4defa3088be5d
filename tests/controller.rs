use manipulator_core::config::ControllerConfig;
use manipulator_core::control::driver::{self, ControllerHandle, DriverTasks};
use manipulator_core::control::playback::{PlaybackPhase, PlaybackState, Setpoint};
use manipulator_core::control::trajectory::buffer::MotionKind;
use manipulator_core::planning::messages::DisplayTrajectory;
use manipulator_core::control::PositionController;
use manipulator_core::lifecycle::{LifecycleNode, State};
use manipulator_core::{ManipulatorCore, MotionError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

fn fast_config() -> ControllerConfig {
    let mut config = ControllerConfig::default();
    config.control_frequency = 1000.0;
    config.gripper.move_time = 0.05;
    config.path_settle_time = 0.0;
    config.setpoint_queue_depth = 1024;
    config
}

fn start() -> (ControllerHandle, DriverTasks, mpsc::Receiver<Setpoint>) {
    let config = fast_config();
    let (tx, rx) = mpsc::channel(config.setpoint_queue_depth);
    let (handle, tasks) = driver::spawn(&config, tx).unwrap();
    (handle, tasks, rx)
}

async fn wait_for_state<F>(handle: &ControllerHandle, mut predicate: F)
where
    F: FnMut(&PlaybackState) -> bool,
{
    let mut states = handle.watch_state();
    timeout(WAIT, states.wait_for(|state| predicate(state)))
        .await
        .expect("timed out waiting for playback state")
        .expect("driver stopped");
}

#[tokio::test]
async fn grip_without_present_configuration_starts_from_zero() {
    let (handle, tasks, mut setpoints) = start();

    handle.submit_command("grip_on").unwrap();
    wait_for_state(&handle, |s| s.phase() == PlaybackPhase::Playing(MotionKind::Gripper)).await;
    assert_eq!(handle.playback_state().total_steps, 51);

    let first = timeout(WAIT, setpoints.recv()).await.unwrap().unwrap();
    assert_eq!(first.position_of("grip_joint"), Some(0.0));
    assert_eq!(first.names.len(), 5);

    wait_for_state(&handle, |s| !s.is_moving()).await;
    let mut last = first;
    while let Ok(setpoint) = setpoints.try_recv() {
        last = setpoint;
    }
    let target = (-75.0f64).to_radians();
    assert!((last.position_of("grip_joint").unwrap() - target).abs() < 1e-9);

    handle.shutdown();
    tasks.join().await;
}

#[tokio::test]
async fn grip_starts_from_present_aperture() {
    let (handle, tasks, mut setpoints) = start();

    handle
        .update_present_configuration(&[0.0, 0.0, 0.0, 0.0, -0.4])
        .unwrap();
    handle.submit_command("grip_off").unwrap();

    let first = timeout(WAIT, setpoints.recv()).await.unwrap().unwrap();
    assert!((first.position_of("grip_joint").unwrap() + 0.4).abs() < 1e-12);

    handle.shutdown();
    tasks.join().await;
}

#[tokio::test]
async fn unrecognized_command_changes_nothing() {
    let (handle, tasks, mut setpoints) = start();

    let err = handle.submit_command("foo").unwrap_err();
    assert!(matches!(err, MotionError::UnrecognizedCommand(token) if token == "foo"));

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!handle.playback_state().is_moving());
    assert!(setpoints.try_recv().is_err());

    handle.shutdown();
    tasks.join().await;
}

#[tokio::test]
async fn external_path_needs_confirmation() {
    let (handle, tasks, mut setpoints) = start();
    let path = DisplayTrajectory::from_positions(
        &["joint1", "joint2", "joint3", "joint4"],
        &[vec![0.0; 4], vec![0.3; 4], vec![0.6; 4]],
        Duration::from_millis(200),
    );

    for _ in 0..3 {
        handle.submit_path(path.clone()).unwrap();
    }
    assert!(!handle.planner_feedback("PLANNING").unwrap());
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!handle.playback_state().is_moving());
    assert!(setpoints.try_recv().is_err());

    assert!(handle.planner_feedback("MONITOR").unwrap());
    wait_for_state(&handle, |s| s.phase() == PlaybackPhase::Playing(MotionKind::Joint)).await;
    wait_for_state(&handle, |s| !s.is_moving()).await;

    let mut received = Vec::new();
    while let Ok(setpoint) = setpoints.try_recv() {
        received.push(setpoint);
    }
    assert_eq!(received.len(), 3);
    assert_eq!(&received[0].positions[..4], &[0.0; 4]);
    assert_eq!(&received[2].positions[..4], &[0.6; 4]);

    // the next preview starts from where the arm was left
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(handle.last_commanded().as_slice(), &[0.6; 4]);

    handle.shutdown();
    tasks.join().await;
}

#[tokio::test]
async fn handle_reports_stopped_driver() {
    let (handle, tasks, _setpoints) = start();
    handle.shutdown();
    tasks.join().await;

    assert!(!handle.is_running());
    assert!(matches!(
        handle.submit_command("grip_on"),
        Err(MotionError::NotRunning)
    ));
}

#[tokio::test]
async fn core_manages_controller_lifecycle() {
    let (tx, _rx) = mpsc::channel(16);
    let mut core = ManipulatorCore::new();
    core.register(PositionController::new(fast_config(), tx));
    core.init().unwrap();

    let controller = core.position_controller_mut().unwrap();
    assert_eq!(controller.state(), State::Active);
    let handle = controller.handle().unwrap();
    assert!(handle.is_running());

    controller.shutdown().await.unwrap();
    core.shutdown().unwrap();
    assert!(!handle.is_running());
    assert_eq!(
        core.position_controller_mut().unwrap().state(),
        State::Unconfigured
    );
}

#[tokio::test]
async fn activation_requires_configuration() {
    let (tx, _rx) = mpsc::channel(16);
    let mut controller = PositionController::new(fast_config(), tx);
    assert!(matches!(controller.on_activate(), Err(MotionError::Lifecycle(_))));
    controller.on_configure().unwrap();
    controller.on_activate().unwrap();
    controller.shutdown().await.unwrap();
}

#[tokio::test]
async fn rates_without_a_usable_period_never_spawn() {
    for frequency in [1e10, 1e-300, f64::NAN] {
        let mut config = fast_config();
        config.control_frequency = frequency;
        let (tx, _rx) = mpsc::channel(1);
        assert!(matches!(
            driver::spawn(&config, tx),
            Err(MotionError::InvalidParameter(_))
        ));
    }

    let mut config = fast_config();
    config.path_settle_time = f64::NAN;
    let (tx, _rx) = mpsc::channel(1);
    let mut controller = PositionController::new(config, tx);
    assert!(controller.on_configure().is_err());
    assert_eq!(controller.state(), State::Unconfigured);
}
