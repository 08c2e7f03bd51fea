//! Camera controller: turns 3D-mouse events into camera motion.
//!
//! # Navigation modes
//!
//! - **Free** (default): the cap moves the camera like an object held in the
//!   hand.  Translation pans and dollies in camera space, rotation turns the
//!   camera about the rotation origin around an axis given in view space.
//! - **Constrained orbit**: the camera stays on a sphere around the rotation
//!   origin and keeps looking at it.  Twisting the cap changes the azimuth,
//!   tilting it changes the inclination, pushing/pulling zooms.  Inclination
//!   stops 0.1 rad short of the poles.
//!
//! # Device frame to view frame
//!
//! The device reports x right, y forward, z down; the camera uses x right,
//! y up, z backward.  Mapping `(x, y, z) → (-x, z, -y)` gives the usual
//! "object in hand" feel for translation, and the same mapping is applied to
//! the rotation axis.
//!
//! Rotation is axis-angle throughout (`DMat4::from_axis_angle`), applied as a
//! pre-multiplication of the camera's world transform.

use std::f64::consts::{FRAC_PI_2, PI};

use glam::{DMat4, DVec3};
use spacemouse_core::{ButtonEvent, ModifierKey, MotionEvent, SpaceMouseButton};
use spacemouse_daemon::infrastructure::storage::config::ControllerConfig;
use tracing::{debug, trace};

use crate::infrastructure::host::{look_at_transform, PresetRotation, SceneHost};

/// Half of the host's vertical field of view for perspective cameras.
const HALF_FOV_Y: f64 = 15.0 * PI / 180.0;
/// Closest the constrained orbit may get to either pole, in radians.
const POLE_MARGIN: f64 = 0.1;

/// Views without a host preset, as `(eye, rotation origin)`.  The bottom
/// origin is offset in z so the view direction is not parallel to up.
const BOTTOM_VIEW: (DVec3, DVec3) = (DVec3::new(0.0, -800.0, 0.0), DVec3::new(0.0, 100.0, 0.1));
const REAR_VIEW: (DVec3, DVec3) = (DVec3::new(0.0, 100.0, -700.0), DVec3::new(0.0, 100.0, 0.0));

/// Scales and limits applied to raw device values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerSettings {
    pub rot_scale_free: f64,
    pub rot_scale_constrained: f64,
    pub trans_scale: f64,
    pub zoom_scale: f64,
    pub zoom_min: f64,
    pub zoom_max: f64,
    pub fit_border_percentage: f64,
}

impl From<&ControllerConfig> for ControllerSettings {
    fn from(config: &ControllerConfig) -> Self {
        Self {
            rot_scale_free: config.rot_scale_free,
            rot_scale_constrained: config.rot_scale_constrained,
            trans_scale: config.trans_scale,
            zoom_scale: config.zoom_scale,
            zoom_min: config.zoom_min,
            zoom_max: config.zoom_max,
            fit_border_percentage: config.fit_border_percentage,
        }
    }
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self::from(&ControllerConfig::default())
    }
}

/// Consumes device events and drives the host camera.
pub struct CameraController<H: SceneHost> {
    host: H,
    settings: ControllerSettings,
    rotation_locked: bool,
    constrained_orbit: bool,
    /// Set when the driver does not implement the lock-rotation button itself.
    toggles_rotation_lock: bool,
}

impl<H: SceneHost> CameraController<H> {
    pub fn new(host: H, settings: ControllerSettings, toggles_rotation_lock: bool) -> Self {
        Self {
            host,
            settings,
            rotation_locked: false,
            constrained_orbit: false,
            toggles_rotation_lock,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    pub fn is_rotation_locked(&self) -> bool {
        self.rotation_locked
    }

    pub fn set_rotation_locked(&mut self, locked: bool) {
        self.rotation_locked = locked;
    }

    pub fn is_constrained_orbit(&self) -> bool {
        self.constrained_orbit
    }

    pub fn set_constrained_orbit(&mut self, constrained: bool) {
        self.constrained_orbit = constrained;
    }

    /// Switches between free and constrained orbit; returns the new mode.
    pub fn toggle_orbit(&mut self) -> bool {
        self.constrained_orbit = !self.constrained_orbit;
        debug!(constrained = self.constrained_orbit, "orbit mode toggled");
        self.constrained_orbit
    }

    // ── Event handlers ────────────────────────────────────────────────────────

    pub fn on_motion(&mut self, motion: MotionEvent) {
        trace!(?motion, "motion");
        if self.constrained_orbit {
            self.translate(0, motion.ty, 0);
            let azimuth = motion.angle * motion.axis_z * self.settings.rot_scale_constrained;
            let inclination = motion.angle * motion.axis_x * self.settings.rot_scale_constrained;
            self.rotate_constrained(azimuth, inclination);
        } else {
            self.translate(motion.tx, motion.ty, motion.tz);
            self.rotate_free(
                motion.angle * self.settings.rot_scale_free,
                DVec3::new(motion.axis_x, motion.axis_y, motion.axis_z),
            );
        }
    }

    pub fn on_button_press(&mut self, event: ButtonEvent) {
        let modifiers = event
            .modifiers
            .union(self.host.query_keyboard_modifiers());
        let shift = modifiers.contains(ModifierKey::Shift);
        trace!(button = ?event.button, modifiers = modifiers.bits(), "button press");

        match event.button {
            SpaceMouseButton::Top if shift => self.set_view(BOTTOM_VIEW),
            SpaceMouseButton::Top => self.set_preset(PresetRotation::Top),
            SpaceMouseButton::Right => self.set_preset(if shift {
                PresetRotation::Left
            } else {
                PresetRotation::Right
            }),
            SpaceMouseButton::Front if shift => self.set_view(REAR_VIEW),
            SpaceMouseButton::Front => self.set_preset(PresetRotation::Front),
            SpaceMouseButton::RollCw => {
                let angle = if shift { FRAC_PI_2 } else { -FRAC_PI_2 };
                // Device y is the viewing direction.
                self.rotate_about_view_axis(angle, DVec3::Y);
            }
            SpaceMouseButton::Fit => self.fit_selection(),
            SpaceMouseButton::LockRotation if self.toggles_rotation_lock => {
                self.rotation_locked = !self.rotation_locked;
                debug!(locked = self.rotation_locked, "rotation lock toggled");
            }
            SpaceMouseButton::LockRotation => trace!("rotation lock handled by the driver"),
            other => trace!(button = ?other, "button has no camera action"),
        }
    }

    pub fn on_button_release(&mut self, event: ButtonEvent) {
        trace!(button = ?event.button, "button release");
    }

    // ── Camera operations ─────────────────────────────────────────────────────

    fn set_preset(&mut self, preset: PresetRotation) {
        if self.host.active_camera().is_none() {
            debug!("no camera available");
            return;
        }
        self.host.set_camera_rotation(preset);
    }

    /// Puts the camera at `eye` with default zoom, aimed at `origin`, which
    /// becomes the rotation origin.
    fn set_view(&mut self, (eye, origin): (DVec3, DVec3)) {
        let Some(camera) = self.host.active_camera() else {
            debug!("no camera available");
            return;
        };
        let zoom = camera.default_zoom_factor();
        camera.set_zoom_factor(zoom);
        camera.set_position(eye);
        camera.look_at(origin, DVec3::Y);
        self.host.set_rotation_origin(origin);
    }

    /// Pans and dollies (perspective) or pans and zooms (orthographic).
    fn translate(&mut self, tx: i32, ty: i32, tz: i32) {
        let s = self.settings;
        let Some(camera) = self.host.active_camera().filter(|c| c.is_enabled()) else {
            debug!("no camera available");
            return;
        };
        let (tx, ty, tz) = (f64::from(tx), f64::from(ty), f64::from(tz));

        if camera.is_perspective() {
            camera.translate(DVec3::new(-tx, tz, -ty) * s.trans_scale);
        } else {
            camera.translate(DVec3::new(-tx, tz, 0.0) * s.trans_scale);
            let zoom = (camera.zoom_factor() - s.zoom_scale * ty).clamp(s.zoom_min, s.zoom_max);
            camera.set_zoom_factor(zoom);
        }
    }

    fn rotate_free(&mut self, angle: f64, device_axis: DVec3) {
        if self.rotation_locked {
            return;
        }
        self.rotate_about_view_axis(angle, device_axis);
    }

    /// Rotates the camera by `angle` about the rotation origin, around the
    /// axis `device_axis` given in the device frame.
    fn rotate_about_view_axis(&mut self, angle: f64, device_axis: DVec3) {
        if angle == 0.0 {
            return;
        }
        let origin = self.host.rotation_origin();
        let Some(camera) = self.host.active_camera().filter(|c| c.is_enabled()) else {
            return;
        };

        let view_axis = DVec3::new(-device_axis.x, device_axis.z, -device_axis.y);
        let transform = camera.world_transform();
        let Some(world_axis) = transform.transform_vector3(view_axis).try_normalize() else {
            return;
        };

        let rotation = DMat4::from_translation(origin)
            * DMat4::from_axis_angle(world_axis, angle)
            * DMat4::from_translation(-origin);
        camera.set_transform(rotation * transform);
    }

    /// Orbits on a sphere around the rotation origin, keeping the origin in view.
    fn rotate_constrained(&mut self, azimuth: f64, inclination: f64) {
        if self.rotation_locked {
            return;
        }
        let target = self.host.rotation_origin();
        let Some(camera) = self.host.active_camera().filter(|c| c.is_enabled()) else {
            return;
        };

        let up = DVec3::Y;
        let eye = camera.world_position();
        let Some(to_target) = (target - eye).try_normalize() else {
            return;
        };
        let angle_to_up = up.dot(to_target).clamp(-1.0, 1.0).acos();

        let about_target = |axis: DVec3, angle: f64| {
            DMat4::from_translation(target)
                * DMat4::from_axis_angle(axis, angle)
                * DMat4::from_translation(-target)
        };

        let mut rotation = about_target(up, azimuth);
        let away_from_top = angle_to_up > POLE_MARGIN || inclination > 0.0;
        let away_from_bottom = angle_to_up < PI - POLE_MARGIN || inclination < 0.0;
        if away_from_top && away_from_bottom {
            if let Some(side) = up.cross(to_target).try_normalize() {
                rotation *= about_target(side, inclination);
            }
        }

        let new_eye = rotation.transform_point3(eye);
        // Position and orientation in one transform, so the camera never
        // shows an intermediate pose.
        if let Some(transform) = look_at_transform(new_eye, target, up) {
            camera.set_transform(transform);
        }
    }

    /// Centres the selection and frames it.
    fn fit_selection(&mut self) {
        let border = self.settings.fit_border_percentage;
        if self.host.active_camera().filter(|c| c.is_enabled()).is_none() {
            debug!("no camera available");
            return;
        }
        let Some(bounds) = self.host.selection_bounding_box() else {
            debug!("nothing selected to fit");
            return;
        };
        let Some(camera) = self.host.active_camera() else {
            return;
        };

        let (width, height) = camera.viewport_size();
        if width <= 0.0 || height <= 0.0 {
            debug!(width, height, "viewport has no area; cannot fit");
            return;
        }

        let view = camera.world_transform().inverse();
        let center = bounds.center();
        let center_in_view = view.transform_point3(center);
        camera.translate(DVec3::new(center_in_view.x, center_in_view.y, 0.0));

        if camera.is_perspective() {
            let aspect = width / height;
            let half_fov_x = (aspect * HALF_FOV_Y.tan()).atan();
            let half_fov = half_fov_x.min(HALF_FOV_Y);

            let radius = (center - bounds.min).length();
            let distance = radius / half_fov.sin();
            let Some(center_to_camera) = (camera.world_position() - center).try_normalize() else {
                return;
            };
            camera.set_position(center + center_to_camera * distance);
        } else {
            let (mut min, mut max) = (DVec3::splat(f64::INFINITY), DVec3::splat(f64::NEG_INFINITY));
            for corner in bounds.corners() {
                let p = view.transform_point3(corner);
                min = min.min(p);
                max = max.max(p);
            }
            let grow = 1.0 + 2.0 * border;
            let zoom_horizontal = grow * (max.x - min.x) / 2.0 / width - 0.5;
            let zoom_vertical = grow * (max.y - min.y) / 2.0 / height - 0.5;
            camera.set_zoom_factor(zoom_horizontal.max(zoom_vertical));
        }
    }
}

impl<H: SceneHost> std::fmt::Debug for CameraController<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraController")
            .field("settings", &self.settings)
            .field("rotation_locked", &self.rotation_locked)
            .field("constrained_orbit", &self.constrained_orbit)
            .finish_non_exhaustive()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
