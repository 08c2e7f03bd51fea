//! In-memory scene host used by the diagnostic binary.
//!
//! There is no window and no rendering.  The camera is just a transform, a
//! zoom factor and a viewport size, which is enough to watch the controller
//! work in the logs (`RUST_LOG=spacemouse_tool=debug`).

use glam::{DMat4, DVec3};
use spacemouse_core::ModifierKeys;
use tracing::{debug, info};

use super::host::{look_at_transform, BoundingBox, HostCamera, PresetRotation, SceneHost};

/// Default orbit centre of a build plate whose centre sits 100 units up.
const DEFAULT_ORIGIN: DVec3 = DVec3::new(0.0, 100.0, 0.0);
const DEFAULT_EYE: DVec3 = DVec3::new(0.0, 100.0, 700.0);

/// A camera that only stores its state.
#[derive(Debug, Clone)]
pub struct HeadlessCamera {
    transform: DMat4,
    perspective: bool,
    enabled: bool,
    zoom: f64,
    default_zoom: f64,
    viewport: (f64, f64),
}

impl HeadlessCamera {
    pub fn new(perspective: bool) -> Self {
        Self {
            transform: look_at_transform(DEFAULT_EYE, DEFAULT_ORIGIN, DVec3::Y)
                .unwrap_or(DMat4::IDENTITY),
            perspective,
            enabled: true,
            zoom: -0.1,
            default_zoom: -0.1,
            viewport: (1920.0, 1080.0),
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn set_viewport(&mut self, width: f64, height: f64) {
        self.viewport = (width, height);
    }

    fn log_pose(&self) {
        debug!(
            position = ?self.world_position(),
            forward = ?self.transform.transform_vector3(DVec3::NEG_Z),
            zoom = self.zoom,
            "camera moved"
        );
    }
}

impl HostCamera for HeadlessCamera {
    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn is_perspective(&self) -> bool {
        self.perspective
    }

    fn world_transform(&self) -> DMat4 {
        self.transform
    }

    fn set_transform(&mut self, transform: DMat4) {
        self.transform = transform;
        self.log_pose();
    }

    fn translate(&mut self, offset: DVec3) {
        self.transform *= DMat4::from_translation(offset);
        self.log_pose();
    }

    fn zoom_factor(&self) -> f64 {
        self.zoom
    }

    fn set_zoom_factor(&mut self, zoom: f64) {
        self.zoom = zoom;
        self.log_pose();
    }

    fn default_zoom_factor(&self) -> f64 {
        self.default_zoom
    }

    fn world_position(&self) -> DVec3 {
        self.transform.w_axis.truncate()
    }

    fn set_position(&mut self, position: DVec3) {
        self.transform.w_axis = position.extend(1.0);
        self.log_pose();
    }

    fn look_at(&mut self, target: DVec3, up: DVec3) {
        match look_at_transform(self.world_position(), target, up) {
            Some(transform) => self.set_transform(transform),
            None => debug!(?target, "look_at ignored: degenerate direction"),
        }
    }

    fn viewport_size(&self) -> (f64, f64) {
        self.viewport
    }
}

/// Scene with one camera, an optional selection and no keyboard.
#[derive(Debug, Clone)]
pub struct HeadlessScene {
    pub camera: HeadlessCamera,
    pub origin: DVec3,
    pub selection: Option<BoundingBox>,
    pub keyboard_modifiers: ModifierKeys,
}

impl HeadlessScene {
    pub fn new() -> Self {
        Self {
            camera: HeadlessCamera::new(true),
            origin: DEFAULT_ORIGIN,
            selection: None,
            keyboard_modifiers: ModifierKeys::empty(),
        }
    }
}

impl Default for HeadlessScene {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneHost for HeadlessScene {
    fn active_camera(&mut self) -> Option<&mut dyn HostCamera> {
        Some(&mut self.camera)
    }

    fn selection_bounding_box(&self) -> Option<BoundingBox> {
        self.selection
    }

    fn rotation_origin(&self) -> DVec3 {
        self.origin
    }

    fn set_rotation_origin(&mut self, origin: DVec3) {
        self.origin = origin;
    }

    fn set_camera_rotation(&mut self, preset: PresetRotation) {
        // Direction from the origin to the eye, and the up vector of the view.
        let (direction, up) = match preset {
            PresetRotation::Top => (DVec3::Y, DVec3::NEG_Z),
            PresetRotation::Right => (DVec3::X, DVec3::Y),
            PresetRotation::Left => (DVec3::NEG_X, DVec3::Y),
            PresetRotation::Front => (DVec3::Z, DVec3::Y),
        };
        let distance = (self.camera.world_position() - self.origin).length().max(1.0);
        let eye = self.origin + direction * distance;

        if let Some(transform) = look_at_transform(eye, self.origin, up) {
            self.camera.zoom = self.camera.default_zoom;
            self.camera.set_transform(transform);
            info!(?preset, "camera set to preset view");
        }
    }

    fn query_keyboard_modifiers(&self) -> ModifierKeys {
        self.keyboard_modifiers
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_is_in_camera_space() {
        // Arrange – default camera looks down world −z
        let mut camera = HeadlessCamera::new(true);
        let before = camera.world_position();

        // Act – one unit "forward" in camera space
        camera.translate(DVec3::NEG_Z);

        // Assert
        assert!((camera.world_position() - (before + DVec3::NEG_Z)).length() < 1e-9);
    }

    #[test]
    fn test_top_preset_looks_down_at_origin() {
        let mut scene = HeadlessScene::new();
        scene.camera.set_zoom_factor(0.7);

        scene.set_camera_rotation(PresetRotation::Top);

        let forward = scene.camera.world_transform().transform_vector3(DVec3::NEG_Z);
        assert!(forward.abs_diff_eq(DVec3::NEG_Y, 1e-9));
        assert!((scene.camera.world_position() - DVec3::new(0.0, 800.0, 0.0)).length() < 1e-9);
        assert_eq!(scene.camera.zoom_factor(), scene.camera.default_zoom_factor());
    }

    #[test]
    fn test_set_position_keeps_orientation() {
        let mut camera = HeadlessCamera::new(false);
        let forward = camera.world_transform().transform_vector3(DVec3::NEG_Z);

        camera.set_position(DVec3::new(1.0, 2.0, 3.0));

        assert_eq!(camera.world_position(), DVec3::new(1.0, 2.0, 3.0));
        assert!(camera
            .world_transform()
            .transform_vector3(DVec3::NEG_Z)
            .abs_diff_eq(forward, 1e-12));
    }
}
