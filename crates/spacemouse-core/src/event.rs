//! Normalized 3D-mouse events.
//!
//! These types are the only thing the host ever sees from the daemon.  They are
//! identical on every platform; the decoders in [`crate::decode`] are
//! responsible for producing them from whatever the OS driver delivers.
//!
//! # Units and frames
//!
//! - Translation (`tx`, `ty`, `tz`) is in **raw device units**.  No scaling or
//!   sensitivity curve is applied here; that is the camera controller's job.
//! - Rotation is an **angle plus a unit axis** expressed in the device's own
//!   frame: x points right, y points forward (away from the user), z points
//!   down.  The daemon never converts this into a camera frame.

use serde::{Deserialize, Serialize};

/// A single 6-DOF sample from the device.
///
/// `angle` is the length of the raw rotation vector and `(axis_x, axis_y,
/// axis_z)` is that vector normalized.  When the rotation vector is zero the
/// axis is `(0, 0, 1)` so the value is always a valid axis-angle pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionEvent {
    /// Translation x (raw device units).
    pub tx: i32,
    /// Translation y (raw device units).
    pub ty: i32,
    /// Translation z (raw device units).
    pub tz: i32,
    /// Rotation angle (raw device units, length of the rotation vector).
    pub angle: f64,
    /// Rotation axis x (unit length together with `axis_y`, `axis_z`).
    pub axis_x: f64,
    /// Rotation axis y.
    pub axis_y: f64,
    /// Rotation axis z.
    pub axis_z: f64,
}

impl MotionEvent {
    /// Builds a motion event from the six raw axis values reported by a driver.
    ///
    /// Translation is copied verbatim.  The rotation vector `(rx, ry, rz)` is
    /// split into its length (the angle) and its direction (the axis).
    pub fn from_axes(tx: i32, ty: i32, tz: i32, rx: i32, ry: i32, rz: i32) -> Self {
        let (rx, ry, rz) = (f64::from(rx), f64::from(ry), f64::from(rz));
        let angle = (rx * rx + ry * ry + rz * rz).sqrt();

        let (axis_x, axis_y, axis_z) = if angle == 0.0 {
            (0.0, 0.0, 1.0)
        } else {
            (rx / angle, ry / angle, rz / angle)
        };

        Self {
            tx,
            ty,
            tz,
            angle,
            axis_x,
            axis_y,
            axis_z,
        }
    }

    /// Returns `true` if the sample carries no rotation.
    pub fn is_pure_translation(&self) -> bool {
        self.angle == 0.0
    }
}

/// Platform-independent button identifiers.
///
/// The numeric values are part of the host callback contract and never change.
/// Raw driver codes that have no entry here decode to [`SpaceMouseButton::Undefined`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SpaceMouseButton {
    /// Top view button.
    Top = 0,
    /// Right view button.
    Right = 1,
    /// Front view button.
    Front = 2,
    /// Roll the view clockwise around the viewing direction.
    RollCw = 3,
    /// Lock rotation.
    LockRotation = 4,
    /// Configurable button 1.
    Custom1 = 5,
    /// Configurable button 2.
    Custom2 = 6,
    /// Configurable button 3.
    Custom3 = 7,
    /// Configurable button 4.
    Custom4 = 8,
    /// Escape key.
    Esc = 9,
    /// Shift key.
    Shift = 10,
    /// Control key.
    Ctrl = 11,
    /// Alternate key.
    Alt = 12,
    /// Fit shown objects to screen.
    Fit = 13,
    /// Any raw code without a mapping.
    Undefined = 14,
}

impl SpaceMouseButton {
    /// Returns the stable numeric identifier (0..=14).
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// The modifier this button toggles while held, if any.
    pub fn modifier(self) -> Option<ModifierKey> {
        match self {
            SpaceMouseButton::Shift => Some(ModifierKey::Shift),
            SpaceMouseButton::Ctrl => Some(ModifierKey::Ctrl),
            SpaceMouseButton::Alt => Some(ModifierKey::Alt),
            _ => None,
        }
    }
}

impl TryFrom<u8> for SpaceMouseButton {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => SpaceMouseButton::Top,
            1 => SpaceMouseButton::Right,
            2 => SpaceMouseButton::Front,
            3 => SpaceMouseButton::RollCw,
            4 => SpaceMouseButton::LockRotation,
            5 => SpaceMouseButton::Custom1,
            6 => SpaceMouseButton::Custom2,
            7 => SpaceMouseButton::Custom3,
            8 => SpaceMouseButton::Custom4,
            9 => SpaceMouseButton::Esc,
            10 => SpaceMouseButton::Shift,
            11 => SpaceMouseButton::Ctrl,
            12 => SpaceMouseButton::Alt,
            13 => SpaceMouseButton::Fit,
            14 => SpaceMouseButton::Undefined,
            other => return Err(other),
        })
    }
}

/// A single modifier key.  The discriminant is its bit in [`ModifierKeys`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ModifierKey {
    Shift = 1,
    Ctrl = 2,
    Alt = 4,
}

/// Bitset of held modifier keys (`SHIFT = 1`, `CTRL = 2`, `ALT = 4`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ModifierKeys(u8);

impl ModifierKeys {
    pub const SHIFT: u8 = ModifierKey::Shift as u8;
    pub const CTRL: u8 = ModifierKey::Ctrl as u8;
    pub const ALT: u8 = ModifierKey::Alt as u8;
    const ALL: u8 = Self::SHIFT | Self::CTRL | Self::ALT;

    /// The empty set.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Builds a set from raw bits; bits outside `SHIFT | CTRL | ALT` are dropped.
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & Self::ALL)
    }

    /// Raw bit representation.
    pub const fn bits(self) -> u8 {
        self.0
    }

    pub fn add(&mut self, key: ModifierKey) {
        self.0 |= key as u8;
    }

    pub fn remove(&mut self, key: ModifierKey) {
        self.0 &= !(key as u8);
    }

    pub fn contains(self, key: ModifierKey) -> bool {
        self.0 & key as u8 != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns the union of both sets.
    pub fn union(self, other: ModifierKeys) -> Self {
        Self(self.0 | other.0)
    }
}

/// A button press or release together with the modifiers held at that moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonEvent {
    pub button: SpaceMouseButton,
    pub modifiers: ModifierKeys,
}

/// One decoded device event.  Each raw payload decodes to exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeviceEvent {
    Motion(MotionEvent),
    ButtonPress(ButtonEvent),
    ButtonRelease(ButtonEvent),
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_axes_copies_translation_without_scaling() {
        // Arrange / Act
        let event = MotionEvent::from_axes(100, -50, 0, 0, 0, 0);

        // Assert
        assert_eq!((event.tx, event.ty, event.tz), (100, -50, 0));
        assert_eq!(event.angle, 0.0);
        assert!(event.is_pure_translation());
    }

    #[test]
    fn test_from_axes_zero_rotation_uses_z_axis() {
        let event = MotionEvent::from_axes(0, 0, 0, 0, 0, 0);
        assert_eq!((event.axis_x, event.axis_y, event.axis_z), (0.0, 0.0, 1.0));
    }

    #[test]
    fn test_from_axes_normalizes_rotation_axis() {
        // Arrange / Act – a 3-4-5 triangle gives an exact length
        let event = MotionEvent::from_axes(0, 0, 0, 3, 0, 4);

        // Assert
        assert_eq!(event.angle, 5.0);
        assert!((event.axis_x - 0.6).abs() < 1e-12);
        assert_eq!(event.axis_y, 0.0);
        assert!((event.axis_z - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_from_axes_keeps_sign_of_negative_rotation() {
        let event = MotionEvent::from_axes(0, 0, 0, 0, -7, 0);
        assert_eq!(event.angle, 7.0);
        assert_eq!(event.axis_y, -1.0);
    }

    #[test]
    fn test_button_numeric_values_are_stable() {
        assert_eq!(SpaceMouseButton::Top.as_u8(), 0);
        assert_eq!(SpaceMouseButton::LockRotation.as_u8(), 4);
        assert_eq!(SpaceMouseButton::Custom4.as_u8(), 8);
        assert_eq!(SpaceMouseButton::Alt.as_u8(), 12);
        assert_eq!(SpaceMouseButton::Fit.as_u8(), 13);
        assert_eq!(SpaceMouseButton::Undefined.as_u8(), 14);
    }

    #[test]
    fn test_button_try_from_covers_every_identifier() {
        for value in 0u8..=14 {
            let button = SpaceMouseButton::try_from(value).expect("valid identifier");
            assert_eq!(button.as_u8(), value);
        }
        assert_eq!(SpaceMouseButton::try_from(15), Err(15));
    }

    #[test]
    fn test_only_modifier_buttons_map_to_modifiers() {
        assert_eq!(SpaceMouseButton::Shift.modifier(), Some(ModifierKey::Shift));
        assert_eq!(SpaceMouseButton::Ctrl.modifier(), Some(ModifierKey::Ctrl));
        assert_eq!(SpaceMouseButton::Alt.modifier(), Some(ModifierKey::Alt));
        assert_eq!(SpaceMouseButton::Esc.modifier(), None);
        assert_eq!(SpaceMouseButton::Undefined.modifier(), None);
    }

    #[test]
    fn test_modifier_keys_add_remove_contains() {
        // Arrange
        let mut keys = ModifierKeys::empty();

        // Act
        keys.add(ModifierKey::Shift);
        keys.add(ModifierKey::Alt);
        keys.remove(ModifierKey::Shift);

        // Assert
        assert!(!keys.contains(ModifierKey::Shift));
        assert!(keys.contains(ModifierKey::Alt));
        assert_eq!(keys.bits(), ModifierKeys::ALT);
    }

    #[test]
    fn test_modifier_keys_from_bits_masks_unknown_bits() {
        let keys = ModifierKeys::from_bits(0xFF);
        assert_eq!(keys.bits(), 0b111);
    }

    #[test]
    fn test_modifier_keys_union() {
        let a = ModifierKeys::from_bits(ModifierKeys::SHIFT);
        let b = ModifierKeys::from_bits(ModifierKeys::CTRL);
        assert_eq!(a.union(b).bits(), 3);
        assert!(ModifierKeys::default().is_empty());
    }
}
