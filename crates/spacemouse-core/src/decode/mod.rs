//! Raw driver payload decoders.
//!
//! One sub-module per driver format:
//!
//! | Module | Platform | Input |
//! |--------|----------|-------|
//! | [`spnav`] | Linux | 32-byte spacenavd socket frames |
//! | [`connexion`] | macOS | `ConnexionDeviceState` messages |
//! | [`hid`] | Windows | Raw Input HID reports |
//!
//! The macOS and Windows drivers both report buttons as a bitmask of currently
//! held buttons, so they share [`ButtonMaskDecoder`] which turns successive
//! masks into press / release events.  All three share [`ModifierTracker`].

pub mod connexion;
pub mod hid;
pub mod spnav;

use thiserror::Error;
use tracing::trace;

use crate::event::{ButtonEvent, DeviceEvent, ModifierKeys, SpaceMouseButton};

/// Reasons a raw payload does not produce an event.
///
/// None of these are fatal: backends log them and drop the payload.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The payload is shorter than its format requires.
    #[error("truncated payload: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    /// A spacenavd frame carried an event type other than motion / press / release.
    #[error("unknown event type: {0}")]
    UnknownEventType(i32),

    /// A HID report id that is not one of the multi-axis controller reports.
    #[error("unknown HID report id: {0}")]
    UnknownReport(u8),

    /// A button message whose mask is identical to the previous one.
    #[error("button message without any changed button")]
    NoButtonChange,
}

// ── Modifier tracking ─────────────────────────────────────────────────────────

/// Tracks which modifier buttons on the device are currently held.
///
/// The modifier set is updated *before* the event is built, so the press of
/// SHIFT already carries SHIFT and its release no longer does.
#[derive(Debug, Default, Clone)]
pub struct ModifierTracker {
    held: ModifierKeys,
}

impl ModifierTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Modifiers currently held on the device.
    pub fn current(&self) -> ModifierKeys {
        self.held
    }

    /// Records a press and returns the event to emit.
    pub fn press(&mut self, button: SpaceMouseButton) -> ButtonEvent {
        if let Some(key) = button.modifier() {
            self.held.add(key);
        }
        ButtonEvent {
            button,
            modifiers: self.held,
        }
    }

    /// Records a release and returns the event to emit.
    pub fn release(&mut self, button: SpaceMouseButton) -> ButtonEvent {
        if let Some(key) = button.modifier() {
            self.held.remove(key);
        }
        ButtonEvent {
            button,
            modifiers: self.held,
        }
    }
}

// ── Bitmask buttons ───────────────────────────────────────────────────────────

/// Bit positions of the 3Dconnexion button mask, shared by the macOS client
/// framework and the Windows HID button report.
///
/// Bit 0 is the MENU button, which has no normalized identifier and therefore
/// is absent here.
pub const BUTTON_MASK_TABLE: &[(u32, SpaceMouseButton)] = &[
    (1 << 1, SpaceMouseButton::Fit),
    (1 << 2, SpaceMouseButton::Top),
    (1 << 4, SpaceMouseButton::Right),
    (1 << 5, SpaceMouseButton::Front),
    (1 << 8, SpaceMouseButton::RollCw),
    (1 << 12, SpaceMouseButton::Custom1),
    (1 << 13, SpaceMouseButton::Custom2),
    (1 << 14, SpaceMouseButton::Custom3),
    (1 << 15, SpaceMouseButton::Custom4),
    (1 << 22, SpaceMouseButton::Esc),
    (1 << 23, SpaceMouseButton::Alt),
    (1 << 24, SpaceMouseButton::Shift),
    (1 << 25, SpaceMouseButton::Ctrl),
    (1 << 26, SpaceMouseButton::LockRotation),
];

/// Maps a set of changed mask bits to a button.
///
/// Exactly one bit must be set and it must appear in [`BUTTON_MASK_TABLE`];
/// anything else is [`SpaceMouseButton::Undefined`].
pub fn button_for_mask(changed: u32) -> SpaceMouseButton {
    if changed.count_ones() != 1 {
        return SpaceMouseButton::Undefined;
    }
    BUTTON_MASK_TABLE
        .iter()
        .find(|(mask, _)| *mask == changed)
        .map(|(_, button)| *button)
        .unwrap_or(SpaceMouseButton::Undefined)
}

/// Turns successive "buttons currently held" masks into press / release events.
#[derive(Debug, Default, Clone)]
pub struct ButtonMaskDecoder {
    last: u32,
    modifiers: ModifierTracker,
}

impl ButtonMaskDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent mask seen.
    pub fn last_mask(&self) -> u32 {
        self.last
    }

    /// Diffs `buttons` against the previous mask.
    ///
    /// The changed bits are `last ^ buttons`; the event is a press if those
    /// bits are set in `buttons`, otherwise a release.
    ///
    /// # Errors
    ///
    /// [`DecodeError::NoButtonChange`] when the mask did not change.
    pub fn decode(&mut self, buttons: u32) -> Result<DeviceEvent, DecodeError> {
        let changed = self.last ^ buttons;
        if changed == 0 {
            return Err(DecodeError::NoButtonChange);
        }
        self.last = buttons;

        let button = button_for_mask(changed);
        let pressed = changed & buttons != 0;
        trace!(changed = format_args!("{changed:#010x}"), pressed, ?button, "button mask change");

        Ok(if pressed {
            DeviceEvent::ButtonPress(self.modifiers.press(button))
        } else {
            DeviceEvent::ButtonRelease(self.modifiers.release(button))
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::ModifierKey;

    #[test]
    fn test_tracker_press_shift_includes_shift() {
        // Arrange
        let mut tracker = ModifierTracker::new();

        // Act
        let event = tracker.press(SpaceMouseButton::Shift);

        // Assert
        assert!(event.modifiers.contains(ModifierKey::Shift));
        assert_eq!(tracker.current(), event.modifiers);
    }

    #[test]
    fn test_tracker_release_shift_excludes_shift() {
        let mut tracker = ModifierTracker::new();
        tracker.press(SpaceMouseButton::Shift);

        let event = tracker.release(SpaceMouseButton::Shift);

        assert!(!event.modifiers.contains(ModifierKey::Shift));
        assert!(tracker.current().is_empty());
    }

    #[test]
    fn test_tracker_non_modifier_carries_held_modifiers() {
        // Arrange
        let mut tracker = ModifierTracker::new();
        tracker.press(SpaceMouseButton::Ctrl);
        tracker.press(SpaceMouseButton::Alt);

        // Act
        let event = tracker.press(SpaceMouseButton::Top);

        // Assert
        assert_eq!(event.button, SpaceMouseButton::Top);
        assert_eq!(event.modifiers.bits(), ModifierKeys::CTRL | ModifierKeys::ALT);
    }

    #[test]
    fn test_button_for_mask_single_known_bit() {
        assert_eq!(button_for_mask(1 << 2), SpaceMouseButton::Top);
        assert_eq!(button_for_mask(1 << 26), SpaceMouseButton::LockRotation);
        assert_eq!(button_for_mask(1 << 1), SpaceMouseButton::Fit);
    }

    #[test]
    fn test_button_for_mask_menu_and_unknown_are_undefined() {
        assert_eq!(button_for_mask(1 << 0), SpaceMouseButton::Undefined);
        assert_eq!(button_for_mask(1 << 3), SpaceMouseButton::Undefined);
        assert_eq!(button_for_mask(1 << 31), SpaceMouseButton::Undefined);
    }

    #[test]
    fn test_button_for_mask_multi_bit_is_undefined() {
        assert_eq!(button_for_mask((1 << 2) | (1 << 4)), SpaceMouseButton::Undefined);
    }

    #[test]
    fn test_mask_decoder_press_then_release() {
        // Arrange
        let mut decoder = ButtonMaskDecoder::new();

        // Act
        let press = decoder.decode(1 << 4).unwrap();
        let release = decoder.decode(0).unwrap();

        // Assert
        assert_eq!(
            press,
            DeviceEvent::ButtonPress(ButtonEvent {
                button: SpaceMouseButton::Right,
                modifiers: ModifierKeys::empty(),
            })
        );
        assert_eq!(
            release,
            DeviceEvent::ButtonRelease(ButtonEvent {
                button: SpaceMouseButton::Right,
                modifiers: ModifierKeys::empty(),
            })
        );
    }

    #[test]
    fn test_mask_decoder_unchanged_mask_is_dropped() {
        let mut decoder = ButtonMaskDecoder::new();
        decoder.decode(1 << 5).unwrap();

        assert_eq!(decoder.decode(1 << 5), Err(DecodeError::NoButtonChange));
        assert_eq!(decoder.last_mask(), 1 << 5);
    }

    #[test]
    fn test_mask_decoder_shift_held_while_pressing_front() {
        // Arrange
        let mut decoder = ButtonMaskDecoder::new();
        decoder.decode(1 << 24).unwrap();

        // Act
        let event = decoder.decode((1 << 24) | (1 << 5)).unwrap();

        // Assert
        match event {
            DeviceEvent::ButtonPress(b) => {
                assert_eq!(b.button, SpaceMouseButton::Front);
                assert!(b.modifiers.contains(ModifierKey::Shift));
            }
            other => panic!("expected press, got {other:?}"),
        }
    }
}
