//! spacemouse-daemon library entry point.
//!
//! The daemon owns the connection to the 3D-mouse driver, decodes what the
//! driver delivers with the decoders from `spacemouse_core`, and calls the
//! host's callbacks.
//!
//! # Layers
//!
//! - **`application`** – [`Daemon`] (start / stop / window binding / native
//!   message feeding) and the per-session callback [`Dispatcher`].
//! - **`infrastructure`** – the OS-facing [`DeviceBackend`] implementations,
//!   the process-wide resource claim, and TOML configuration.
//!
//! # Which thread runs my callbacks?
//!
//! | Backend | Platform | Callback thread |
//! |---------|----------|-----------------|
//! | message pump (Raw Input) | Windows | the UI thread that calls [`Daemon::feed_native_message`] |
//! | client callback (3DconnexionClient) | macOS | a thread owned by the vendor framework |
//! | blocking read (spacenavd) | Linux | the daemon's `spacemouse-spnav` worker |
//!
//! The daemon does not marshal anything back to the UI thread.  If the code
//! behind the callbacks is not safe to run off the UI thread, the host must
//! synchronize it.
//!
//! [`DeviceBackend`]: infrastructure::backend::DeviceBackend

pub mod application;
pub mod infrastructure;

pub use application::daemon::{Daemon, DaemonError, DaemonState};
pub use application::dispatch::{CallbackSet, Dispatcher};
pub use infrastructure::backend::{BackendKind, NativeMessage, WindowHandle};
