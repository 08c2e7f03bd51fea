//! End-to-end tests: raw driver payloads in, camera poses out.
//!
//! The mock backend decodes real spacenavd frames, the daemon dispatches them,
//! and the controller moves the headless camera.

use glam::DVec3;
use spacemouse_core::decode::spnav::encode_frame;
use spacemouse_daemon::infrastructure::backend::mock::MockBackend;
use spacemouse_daemon::infrastructure::storage::config::ControllerConfig;
use spacemouse_daemon::Daemon;
use spacemouse_tool::infrastructure::headless::HeadlessScene;
use spacemouse_tool::{BoundingBox, HostCamera, SpaceMouseTool};

fn running_tool(config: &ControllerConfig) -> (SpaceMouseTool<HeadlessScene>, MockBackend) {
    let mock = MockBackend::new();
    let mut scene = HeadlessScene::new();
    scene.origin = DVec3::ZERO;
    scene.camera.set_position(DVec3::new(0.0, 0.0, 10.0));
    let tool = SpaceMouseTool::new(Daemon::with_backend(Box::new(mock.clone())), scene, config);
    assert!(tool.on_engine_created(None));
    (tool, mock)
}

fn camera_position(tool: &SpaceMouseTool<HeadlessScene>) -> DVec3 {
    tool.controller().lock().unwrap().host().camera.world_position()
}

#[test]
fn test_spnav_motion_frame_pans_camera() {
    // Arrange
    let (tool, mock) = running_tool(&ControllerConfig::default());

    // Act – tz = 200 lifts the cap, which pans the view up
    mock.inject_raw_spnav(&encode_frame(&[0, 0, 0, 200, 0, 0, 0, 16]))
        .expect("valid frame");

    // Assert
    let moved = camera_position(&tool) - DVec3::new(0.0, 0.0, 10.0);
    assert!(moved.abs_diff_eq(DVec3::new(0.0, 3.0, 0.0), 1e-9), "{moved:?}");
}

#[test]
fn test_constrained_orbit_from_config_keeps_distance_to_origin() {
    // Arrange
    let config = ControllerConfig {
        constrained_orbit: true,
        ..ControllerConfig::default()
    };
    let (tool, mock) = running_tool(&config);

    // Act – twist the cap
    for _ in 0..10 {
        mock.inject_raw_spnav(&encode_frame(&[0, 0, 0, 0, 0, 0, 3000, 16]))
            .expect("valid frame");
    }

    // Assert – the eye moved on the sphere of radius 10
    let position = camera_position(&tool);
    assert!((position.length() - 10.0).abs() < 1e-6);
    assert!(position.x.abs() > 1e-3);
}

#[test]
fn test_fit_button_frames_selection() {
    // Arrange
    let (tool, mock) = running_tool(&ControllerConfig::default());
    tool.controller().lock().unwrap().host_mut().selection = Some(BoundingBox::new(
        DVec3::new(4.0, -1.0, -1.0),
        DVec3::new(6.0, 1.0, 1.0),
    ));

    // Act – spacenavd button 1 is FIT
    mock.inject_raw_spnav(&encode_frame(&[1, 1, 0, 0, 0, 0, 0, 0]))
        .expect("valid frame");

    // Assert – the camera now looks straight at the selection centre
    let controller = tool.controller();
    let guard = controller.lock().unwrap();
    let camera = &guard.host().camera;
    let forward = camera.world_transform().transform_vector3(DVec3::NEG_Z);
    let to_center = (DVec3::new(5.0, 0.0, 0.0) - camera.world_position()).normalize();
    assert!(forward.abs_diff_eq(to_center, 1e-9));
}

#[test]
fn test_undecodable_frame_leaves_camera_untouched() {
    let (tool, mock) = running_tool(&ControllerConfig::default());

    let result = mock.inject_raw_spnav(&[0u8; 12]);

    assert!(result.is_err());
    assert_eq!(camera_position(&tool), DVec3::new(0.0, 0.0, 10.0));
}
