//! Decoder for 3DconnexionClient device-state messages (macOS).
//!
//! The vendor framework hands the client a `ConnexionDeviceState` struct for
//! every device report.  Only three fields matter here: the target client id,
//! the command, and either the six axis values or the held-buttons mask.  The
//! macOS backend copies those out of the C struct into a [`ConnexionState`]
//! so this decoder stays free of FFI.

use super::{ButtonMaskDecoder, DecodeError};
use crate::event::{DeviceEvent, MotionEvent};

/// `kConnexionCmdHandleButtons`: `buttons` holds the new mask.
pub const CMD_HANDLE_BUTTONS: u16 = 2;
/// `kConnexionCmdHandleAxis`: `axis` holds x y z rx ry rz.
pub const CMD_HANDLE_AXIS: u16 = 3;

/// The fields of a `ConnexionDeviceState` message the decoder needs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnexionState {
    /// Client the message is addressed to.
    pub client: u16,
    /// Command code (`kConnexionCmd*`).
    pub command: u16,
    /// Currently held buttons.
    pub buttons: u32,
    /// x, y, z, rx, ry, rz.
    pub axis: [i16; 6],
}

/// Stateful device-state decoder; remembers the last button mask.
#[derive(Debug, Default)]
pub struct ConnexionDecoder {
    buttons: ButtonMaskDecoder,
}

impl ConnexionDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes one device-state message.
    ///
    /// Returns `Ok(None)` for commands that carry no device event.
    ///
    /// # Errors
    ///
    /// [`DecodeError::NoButtonChange`] for a button message with an unchanged mask.
    pub fn decode(&mut self, state: &ConnexionState) -> Result<Option<DeviceEvent>, DecodeError> {
        match state.command {
            CMD_HANDLE_AXIS => {
                let a = state.axis.map(i32::from);
                Ok(Some(DeviceEvent::Motion(MotionEvent::from_axes(
                    a[0], a[1], a[2], a[3], a[4], a[5],
                ))))
            }
            CMD_HANDLE_BUTTONS => self.buttons.decode(state.buttons).map(Some),
            _ => Ok(None),
        }
    }

    /// Resets the button state, as after reconnecting to the framework.
    pub fn reset(&mut self) {
        self.buttons = ButtonMaskDecoder::new();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
