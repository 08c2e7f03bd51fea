//! Decoder for the spacenavd UNIX-socket protocol (Linux).
//!
//! Wire format, one frame per event:
//! ```text
//! [type:i32][d0:i32][d1:i32][d2:i32][d3:i32][d4:i32][d5:i32][d6:i32]
//! ```
//! 32 bytes, native byte order (the daemon and the client always share a host).
//!
//! | type | meaning | payload |
//! |------|---------|---------|
//! | 0 | motion | `d0..d5` = x y z rx ry rz, `d6` = period in ms (ignored) |
//! | 1 | button press | `d0` = button number |
//! | 2 | button release | `d0` = button number |

use tracing::trace;

use super::{DecodeError, ModifierTracker};
use crate::event::{DeviceEvent, MotionEvent, SpaceMouseButton};

/// Size of one frame on the wire.
pub const FRAME_SIZE: usize = 32;
/// Number of `i32` words in one frame.
pub const FRAME_WORDS: usize = FRAME_SIZE / 4;

const EVENT_MOTION: i32 = 0;
const EVENT_PRESS: i32 = 1;
const EVENT_RELEASE: i32 = 2;

/// spacenavd button numbers of a SpaceMouse Wireless Pro.
///
/// Button 0 is MENU, which has no normalized identifier.
pub const SPNAV_BUTTON_TABLE: &[(i32, SpaceMouseButton)] = &[
    (1, SpaceMouseButton::Fit),
    (2, SpaceMouseButton::Top),
    (4, SpaceMouseButton::Right),
    (5, SpaceMouseButton::Front),
    (8, SpaceMouseButton::RollCw),
    (12, SpaceMouseButton::Custom1),
    (13, SpaceMouseButton::Custom2),
    (14, SpaceMouseButton::Custom3),
    (15, SpaceMouseButton::Custom4),
    (22, SpaceMouseButton::Esc),
    (23, SpaceMouseButton::Alt),
    (24, SpaceMouseButton::Shift),
    (25, SpaceMouseButton::Ctrl),
    (26, SpaceMouseButton::LockRotation),
];

/// Maps a spacenavd button number to a button; unknown numbers are `Undefined`.
pub fn button_for_code(code: i32) -> SpaceMouseButton {
    SPNAV_BUTTON_TABLE
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, button)| *button)
        .unwrap_or(SpaceMouseButton::Undefined)
}

/// Stateful spacenavd frame decoder.  Holds the device modifier state, so use
/// one instance per connection.
#[derive(Debug, Default)]
pub struct SpnavDecoder {
    modifiers: ModifierTracker,
}

impl SpnavDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes one frame that has already been split into words.
    ///
    /// # Errors
    ///
    /// [`DecodeError::UnknownEventType`] if `frame[0]` is not 0, 1 or 2.
    pub fn decode_frame(&mut self, frame: &[i32; FRAME_WORDS]) -> Result<DeviceEvent, DecodeError> {
        match frame[0] {
            EVENT_MOTION => Ok(DeviceEvent::Motion(MotionEvent::from_axes(
                frame[1], frame[2], frame[3], frame[4], frame[5], frame[6],
            ))),
            EVENT_PRESS => {
                let button = button_for_code(frame[1]);
                trace!(code = frame[1], ?button, "spnav press");
                Ok(DeviceEvent::ButtonPress(self.modifiers.press(button)))
            }
            EVENT_RELEASE => {
                let button = button_for_code(frame[1]);
                trace!(code = frame[1], ?button, "spnav release");
                Ok(DeviceEvent::ButtonRelease(self.modifiers.release(button)))
            }
            other => Err(DecodeError::UnknownEventType(other)),
        }
    }

    /// Decodes one frame from its raw bytes.
    ///
    /// Only the first [`FRAME_SIZE`] bytes are read.
    ///
    /// # Errors
    ///
    /// [`DecodeError::Truncated`] if fewer than [`FRAME_SIZE`] bytes are given,
    /// otherwise as [`SpnavDecoder::decode_frame`].
    pub fn decode_bytes(&mut self, bytes: &[u8]) -> Result<DeviceEvent, DecodeError> {
        let frame = words_from_bytes(bytes)?;
        self.decode_frame(&frame)
    }
}

fn words_from_bytes(bytes: &[u8]) -> Result<[i32; FRAME_WORDS], DecodeError> {
    if bytes.len() < FRAME_SIZE {
        return Err(DecodeError::Truncated {
            expected: FRAME_SIZE,
            actual: bytes.len(),
        });
    }
    let mut words = [0i32; FRAME_WORDS];
    for (word, chunk) in words.iter_mut().zip(bytes[..FRAME_SIZE].chunks_exact(4)) {
        *word = i32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    Ok(words)
}

/// Encodes a frame into its wire bytes.  Used by tests and the mock backend to
/// produce what spacenavd would send.
pub fn encode_frame(frame: &[i32; FRAME_WORDS]) -> [u8; FRAME_SIZE] {
    let mut bytes = [0u8; FRAME_SIZE];
    for (chunk, word) in bytes.chunks_exact_mut(4).zip(frame.iter()) {
        chunk.copy_from_slice(&word.to_ne_bytes());
    }
    bytes
}

// ── Stream reassembly ─────────────────────────────────────────────────────────

/// Accumulates bytes read from the socket and yields whole frames.
///
/// A stream read may return any number of bytes, including part of a frame.
/// Bytes are kept until a full [`FRAME_SIZE`] chunk is available.
#[derive(Debug, Default)]
pub struct SpnavFrameBuffer {
    pending: Vec<u8>,
}

impl SpnavFrameBuffer {
    pub fn new() -> Self {
        Self {
            pending: Vec::with_capacity(FRAME_SIZE * 4),
        }
    }

    /// Appends bytes just read from the stream.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    /// Removes and returns the next complete frame, if any.
    pub fn next_frame(&mut self) -> Option<[i32; FRAME_WORDS]> {
        if self.pending.len() < FRAME_SIZE {
            return None;
        }
        let frame = words_from_bytes(&self.pending[..FRAME_SIZE]).ok()?;
        self.pending.drain(..FRAME_SIZE);
        Some(frame)
    }

    /// Number of buffered bytes that do not yet form a frame.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
