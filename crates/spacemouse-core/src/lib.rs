//! # spacemouse-core
//!
//! Shared library for SpaceMouseTool containing the normalized 3D-mouse event
//! vocabulary and the decoders that turn raw driver payloads into it.
//!
//! This crate has zero dependencies on OS APIs, vendor SDKs, or threads.  The
//! platform backends in `spacemouse-daemon` hand it raw bytes / raw structs and
//! get back exactly one [`DeviceEvent`] (or a [`DecodeError`] to log and drop).
//!
//! # Architecture overview (for beginners)
//!
//! A 3D-mouse reports six axes at once: three translations (push/pull the cap)
//! and three rotations (twist/tilt the cap), plus a handful of buttons.  Every
//! operating system delivers those reports differently:
//!
//! - **Linux** – the `spacenavd` daemon writes fixed-size frames of eight
//!   integers to a UNIX socket.
//! - **macOS** – the 3Dconnexion client framework calls a C function with a
//!   `ConnexionDeviceState` struct on a thread it owns.
//! - **Windows** – the device shows up as a HID "multi-axis controller" and its
//!   reports arrive embedded in `WM_INPUT` window messages.
//!
//! This crate defines:
//!
//! - **`event`** – The normalized output: [`MotionEvent`], [`ButtonEvent`],
//!   [`SpaceMouseButton`], [`ModifierKeys`].  Identical on every platform.
//!
//! - **`decode`** – One decoder per driver format plus the shared pieces
//!   (button bit tables, modifier tracking).  Decoders never scale or rotate
//!   values: translation stays in raw device units, rotation is delivered as an
//!   angle plus a unit axis in the device frame (x right, y forward, z down).

pub mod decode;
pub mod event;

pub use decode::{
    connexion::ConnexionDecoder, hid::HidReportDecoder, spnav::SpnavDecoder, DecodeError,
    ModifierTracker,
};
pub use event::{ButtonEvent, DeviceEvent, ModifierKey, ModifierKeys, MotionEvent, SpaceMouseButton};
