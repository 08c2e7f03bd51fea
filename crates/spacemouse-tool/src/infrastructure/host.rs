//! Host application surface.
//!
//! The camera controller never talks to a GUI toolkit directly.  Whatever
//! application embeds it implements [`SceneHost`] (scene-level queries and
//! preset views) and [`HostCamera`] (the active camera).
//!
//! # Conventions
//!
//! - World space is y-up.
//! - A camera's world transform maps camera space to world space; the camera
//!   looks down its local −z axis with +y up.
//! - [`HostCamera::translate`] takes a vector in camera space.
//! - The zoom factor only affects orthographic cameras; more negative values
//!   zoom in.

use glam::{DMat4, DVec3};
use spacemouse_core::ModifierKeys;

/// Axis-aligned bounding box in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: DVec3,
    pub max: DVec3,
}

impl BoundingBox {
    pub fn new(min: DVec3, max: DVec3) -> Self {
        Self { min, max }
    }

    pub fn center(&self) -> DVec3 {
        (self.min + self.max) * 0.5
    }

    /// The eight corners.
    pub fn corners(&self) -> [DVec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            DVec3::new(a.x, a.y, a.z),
            DVec3::new(a.x, a.y, b.z),
            DVec3::new(a.x, b.y, a.z),
            DVec3::new(a.x, b.y, b.z),
            DVec3::new(b.x, a.y, a.z),
            DVec3::new(b.x, a.y, b.z),
            DVec3::new(b.x, b.y, a.z),
            DVec3::new(b.x, b.y, b.z),
        ]
    }
}

/// Camera-to-world transform of a camera at `eye` looking at `target`.
///
/// Returns `None` when `eye == target` or the view direction is parallel to `up`.
pub fn look_at_transform(eye: DVec3, target: DVec3, up: DVec3) -> Option<DMat4> {
    let f = (target - eye).try_normalize()?;
    let s = f.cross(up).try_normalize()?;
    let u = s.cross(f);
    Some(DMat4::from_cols(
        s.extend(0.0),
        u.extend(0.0),
        (-f).extend(0.0),
        eye.extend(1.0),
    ))
}

/// Standard views the host provides.  Bottom and rear views are composed by
/// the controller from camera primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PresetRotation {
    Top,
    Right,
    Left,
    Front,
}

/// The host's active camera.
#[cfg_attr(test, mockall::automock)]
pub trait HostCamera {
    fn is_enabled(&self) -> bool;
    fn is_perspective(&self) -> bool;

    /// Camera-to-world transform.
    fn world_transform(&self) -> DMat4;
    fn set_transform(&mut self, transform: DMat4);

    /// Moves the camera by `offset`, given in camera space.
    fn translate(&mut self, offset: DVec3);

    fn zoom_factor(&self) -> f64;
    fn set_zoom_factor(&mut self, zoom: f64);
    fn default_zoom_factor(&self) -> f64;

    fn world_position(&self) -> DVec3;
    fn set_position(&mut self, position: DVec3);
    fn look_at(&mut self, target: DVec3, up: DVec3);

    /// Viewport `(width, height)` in pixels.
    fn viewport_size(&self) -> (f64, f64);
}

/// Scene-level services of the host application.
pub trait SceneHost {
    /// The active camera, if the scene has one.
    fn active_camera(&mut self) -> Option<&mut dyn HostCamera>;

    /// Bounding box of the current selection, `None` when nothing is selected.
    fn selection_bounding_box(&self) -> Option<BoundingBox>;

    /// Point the camera orbits around.
    fn rotation_origin(&self) -> DVec3;
    fn set_rotation_origin(&mut self, origin: DVec3);

    /// Moves the active camera to a standard view.
    fn set_camera_rotation(&mut self, preset: PresetRotation);

    /// Keyboard modifiers currently held on the host keyboard.
    fn query_keyboard_modifiers(&self) -> ModifierKeys;
}
