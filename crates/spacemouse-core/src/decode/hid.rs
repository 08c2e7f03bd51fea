//! Decoder for 3Dconnexion HID input reports (Windows Raw Input).
//!
//! The device enumerates as a HID "multi-axis controller" (usage page 0x01,
//! usage 0x08).  Raw Input delivers its input reports verbatim, first byte is
//! the report id:
//!
//! ```text
//! id 1: [tx:i16][ty:i16][tz:i16]                       (older devices)
//! id 1: [tx:i16][ty:i16][tz:i16][rx:i16][ry:i16][rz:i16] (newer devices)
//! id 2: [rx:i16][ry:i16][rz:i16]
//! id 3: [buttons: 1..4 bytes]
//! ```
//! All integers are little-endian.
//!
//! Older devices send translation and rotation in two separate reports.  Each
//! report still yields one motion event: the half that was not in the report
//! is taken from the last report that carried it.

use super::{ButtonMaskDecoder, DecodeError};
use crate::event::{DeviceEvent, MotionEvent};

pub const REPORT_TRANSLATION: u8 = 1;
pub const REPORT_ROTATION: u8 = 2;
pub const REPORT_BUTTONS: u8 = 3;

const AXES_LEN: usize = 6;

/// Stateful HID report decoder; caches the last axis halves and button mask.
#[derive(Debug, Default)]
pub struct HidReportDecoder {
    translation: [i32; 3],
    rotation: [i32; 3],
    buttons: ButtonMaskDecoder,
}

impl HidReportDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes one report including its leading report id.
    ///
    /// # Errors
    ///
    /// - [`DecodeError::Truncated`] when the report is shorter than its id requires.
    /// - [`DecodeError::UnknownReport`] for report ids other than 1, 2, 3.
    /// - [`DecodeError::NoButtonChange`] for a button report with an unchanged mask.
    pub fn decode(&mut self, report: &[u8]) -> Result<DeviceEvent, DecodeError> {
        let (&id, payload) = report.split_first().ok_or(DecodeError::Truncated {
            expected: 1,
            actual: 0,
        })?;

        match id {
            REPORT_TRANSLATION => {
                self.translation = read_axes(payload, report.len())?;
                if payload.len() >= 2 * AXES_LEN {
                    self.rotation = read_axes(&payload[AXES_LEN..], report.len())?;
                }
                Ok(self.motion())
            }
            REPORT_ROTATION => {
                self.rotation = read_axes(payload, report.len())?;
                Ok(self.motion())
            }
            REPORT_BUTTONS => {
                if payload.is_empty() {
                    return Err(DecodeError::Truncated {
                        expected: 2,
                        actual: report.len(),
                    });
                }
                let mut mask = [0u8; 4];
                let n = payload.len().min(4);
                mask[..n].copy_from_slice(&payload[..n]);
                self.buttons.decode(u32::from_le_bytes(mask))
            }
            other => Err(DecodeError::UnknownReport(other)),
        }
    }

    fn motion(&self) -> DeviceEvent {
        let [tx, ty, tz] = self.translation;
        let [rx, ry, rz] = self.rotation;
        DeviceEvent::Motion(MotionEvent::from_axes(tx, ty, tz, rx, ry, rz))
    }
}

fn read_axes(payload: &[u8], report_len: usize) -> Result<[i32; 3], DecodeError> {
    if payload.len() < AXES_LEN {
        return Err(DecodeError::Truncated {
            expected: report_len - payload.len() + AXES_LEN,
            actual: report_len,
        });
    }
    let axis = |i: usize| i32::from(i16::from_le_bytes([payload[2 * i], payload[2 * i + 1]]));
    Ok([axis(0), axis(1), axis(2)])
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::SpaceMouseButton;

    fn report(id: u8, values: &[i16]) -> Vec<u8> {
        let mut bytes = vec![id];
        for v in values {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        bytes
    }

    #[test]
    fn test_translation_report_copies_values() {
        // Arrange
        let mut decoder = HidReportDecoder::new();

        // Act
        let event = decoder.decode(&report(1, &[100, -50, 0])).unwrap();

        // Assert
        assert_eq!(
            event,
            DeviceEvent::Motion(MotionEvent::from_axes(100, -50, 0, 0, 0, 0))
        );
    }

    #[test]
    fn test_combined_report_carries_rotation() {
        let mut decoder = HidReportDecoder::new();

        let event = decoder.decode(&report(1, &[1, 2, 3, 0, 0, -9])).unwrap();

        assert_eq!(
            event,
            DeviceEvent::Motion(MotionEvent::from_axes(1, 2, 3, 0, 0, -9))
        );
    }

    #[test]
    fn test_split_reports_combine_with_last_half() {
        // Arrange
        let mut decoder = HidReportDecoder::new();

        // Act
        decoder.decode(&report(1, &[10, 20, 30])).unwrap();
        let rotation = decoder.decode(&report(2, &[0, 4, 0])).unwrap();
        let translation = decoder.decode(&report(1, &[11, 21, 31])).unwrap();

        // Assert
        assert_eq!(
            rotation,
            DeviceEvent::Motion(MotionEvent::from_axes(10, 20, 30, 0, 4, 0))
        );
        assert_eq!(
            translation,
            DeviceEvent::Motion(MotionEvent::from_axes(11, 21, 31, 0, 4, 0))
        );
    }

    #[test]
    fn test_button_report_uses_mask_table() {
        let mut decoder = HidReportDecoder::new();

        let press = decoder.decode(&[3, 0x04, 0, 0, 0]).unwrap();
        let release = decoder.decode(&[3, 0x00, 0, 0, 0]).unwrap();

        assert!(matches!(press, DeviceEvent::ButtonPress(b) if b.button == SpaceMouseButton::Top));
        assert!(matches!(release, DeviceEvent::ButtonRelease(b) if b.button == SpaceMouseButton::Top));
    }

    #[test]
    fn test_short_button_report_is_zero_extended() {
        let mut decoder = HidReportDecoder::new();

        // Two mask bytes: bit 12 = CUSTOM_1
        let event = decoder.decode(&[3, 0x00, 0x10]).unwrap();

        assert!(matches!(event, DeviceEvent::ButtonPress(b) if b.button == SpaceMouseButton::Custom1));
    }

    #[test]
    fn test_truncated_reports_are_errors() {
        let mut decoder = HidReportDecoder::new();

        assert_eq!(
            decoder.decode(&[]),
            Err(DecodeError::Truncated { expected: 1, actual: 0 })
        );
        assert_eq!(
            decoder.decode(&[1, 0, 0, 0]),
            Err(DecodeError::Truncated { expected: 7, actual: 4 })
        );
        assert_eq!(
            decoder.decode(&[3]),
            Err(DecodeError::Truncated { expected: 2, actual: 1 })
        );
    }

    #[test]
    fn test_unknown_report_id() {
        let mut decoder = HidReportDecoder::new();
        assert_eq!(decoder.decode(&[0x17, 0, 0]), Err(DecodeError::UnknownReport(0x17)));
    }
}
