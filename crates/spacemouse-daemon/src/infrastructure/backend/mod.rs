//! Platform device backends.
//!
//! Each OS exposes the 3D-mouse through a different driver model, so each has
//! its own [`DeviceBackend`]:
//!
//! | Module | OS | Kind | Driver interface |
//! |--------|----|------|------------------|
//! | `raw_input` | Windows | [`BackendKind::MessagePump`] | `RegisterRawInputDevices` + `WM_INPUT` |
//! | `connexion` | macOS | [`BackendKind::ClientCallback`] | 3DconnexionClient framework |
//! | `spnav` | Linux (any Unix) | [`BackendKind::BlockingRead`] | spacenavd UNIX socket |
//!
//! [`native_backend`] picks the right one once, at compile time.  The
//! [`mock::MockBackend`] and [`unsupported::UnsupportedBackend`] are always
//! compiled so tests on any platform can use them.
//!
//! # Contract
//!
//! The [`Daemon`](crate::Daemon) serializes every call into a backend behind
//! its own mutex, always closes the session's dispatcher before calling
//! [`DeviceBackend::close`], and never calls `open` twice without `close`.

use std::sync::Arc;

use spacemouse_core::DeviceEvent;

use crate::application::daemon::DaemonError;
use crate::application::dispatch::Dispatcher;
use crate::infrastructure::storage::config::DaemonConfig;

pub mod mock;
pub mod unsupported;

#[cfg(all(target_os = "macos", feature = "lib3dx"))]
pub mod connexion;
#[cfg(target_os = "windows")]
pub mod raw_input;
#[cfg(unix)]
pub mod spnav;

/// How a backend receives driver events.  Fixed for the life of a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Events arrive as window messages the host forwards on the UI thread.
    MessagePump,
    /// A vendor library calls back on a thread it owns.
    ClientCallback,
    /// A daemon-owned worker thread blocks on the device channel.
    BlockingRead,
    /// Test double.
    Mock,
    /// No backend for this platform; never delivers events.
    Unsupported,
}

/// Opaque native window handle (an `HWND` on Windows).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowHandle(pub isize);

/// One native window message as the host's message pump sees it.
///
/// Field meaning follows the Win32 `MSG` layout; other platforms never
/// produce these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeMessage {
    pub hwnd: isize,
    pub message: u32,
    pub wparam: usize,
    pub lparam: isize,
}

/// Win32 `WM_INPUT`.
pub const WM_INPUT: u32 = 0x00FF;
/// Win32 `WM_INPUT_DEVICE_CHANGE`; `wparam` is one of the `GIDC_*` values.
pub const WM_INPUT_DEVICE_CHANGE: u32 = 0x00FE;
pub const GIDC_ARRIVAL: usize = 1;
pub const GIDC_REMOVAL: usize = 2;

/// Result of offering a native message to a backend.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeOutcome {
    /// The message is not a device message; the host handles it as usual.
    NotMine,
    /// The message was a device message.  The decoded events, possibly none,
    /// are dispatched by the daemon after it releases its lock.
    Consumed(Vec<DeviceEvent>),
    /// The last device went away.  The daemon reports connection loss.
    DeviceRemoved,
}

/// OS-facing half of a daemon session.
pub trait DeviceBackend: Send {
    fn kind(&self) -> BackendKind;

    /// Opens the device channel and begins delivering events to `dispatcher`.
    ///
    /// # Errors
    ///
    /// - [`DaemonError::DeviceUnavailable`] if the driver or service cannot be reached.
    /// - [`DaemonError::AlreadyRunning`] if another session holds the resource.
    /// - [`DaemonError::UnsupportedPlatform`] from the unsupported backend.
    fn open(&mut self, dispatcher: Arc<Dispatcher>) -> Result<(), DaemonError>;

    /// Stops delivery and releases every OS handle.  Idempotent.
    fn close(&mut self);

    /// `true` while open and the device channel has not been lost.
    fn is_alive(&self) -> bool;

    /// Stores the host window that receives device messages.
    ///
    /// # Errors
    ///
    /// [`DaemonError::WindowHandleRejected`] if the handle is unusable.
    fn bind_window_handle(&mut self, _handle: WindowHandle) -> Result<(), DaemonError> {
        Ok(())
    }

    /// Decodes a native message.  Only the message-pump backend consumes any.
    fn translate_native_message(&mut self, _message: &NativeMessage) -> NativeOutcome {
        NativeOutcome::NotMine
    }
}

/// Builds the backend for the platform this binary was compiled for.
#[cfg(target_os = "windows")]
pub fn native_backend(_config: &DaemonConfig) -> Box<dyn DeviceBackend> {
    Box::new(raw_input::RawInputBackend::new())
}

/// Builds the backend for the platform this binary was compiled for.
#[cfg(all(target_os = "macos", feature = "lib3dx"))]
pub fn native_backend(config: &DaemonConfig) -> Box<dyn DeviceBackend> {
    Box::new(connexion::ConnexionBackend::new(&config.client_name))
}

/// Builds the backend for the platform this binary was compiled for.
#[cfg(all(target_os = "macos", not(feature = "lib3dx")))]
pub fn native_backend(_config: &DaemonConfig) -> Box<dyn DeviceBackend> {
    Box::new(unsupported::UnsupportedBackend::new(
        "built without the 3DconnexionClient framework (feature `lib3dx`)",
    ))
}

/// Builds the backend for the platform this binary was compiled for.
#[cfg(all(unix, not(target_os = "macos")))]
pub fn native_backend(config: &DaemonConfig) -> Box<dyn DeviceBackend> {
    Box::new(spnav::SpnavBackend::new(spnav::SpnavSettings::resolve(config)))
}

/// Builds the backend for the platform this binary was compiled for.
#[cfg(not(any(unix, target_os = "windows")))]
pub fn native_backend(_config: &DaemonConfig) -> Box<dyn DeviceBackend> {
    Box::new(unsupported::UnsupportedBackend::new(format!(
        "no 3D-mouse backend for {}",
        std::env::consts::OS
    )))
}
