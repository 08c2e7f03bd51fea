//! Daemon lifecycle manager.
//!
//! A [`Daemon`] is an explicitly constructed object owning one
//! [`DeviceBackend`].  The host creates it once, calls [`Daemon::start`] when
//! the application is ready and [`Daemon::stop`] at teardown.
//!
//! # Sessions
//!
//! Every successful `start` begins a *session*: the backend is opened with a
//! fresh [`Dispatcher`] wrapping the host's callbacks.  A session ends when
//! `stop` is called or, for backends with their own event source, when the
//! device connection is lost.  A lost session stays in place (state
//! [`DaemonState::ConnectionLost`]) until the next `start` reaps it.
//!
//! # Locking
//!
//! All operations take `&self` and serialize on one mutex, so `start` and
//! `stop` may race from different threads.  Callbacks never run while that
//! mutex is held:
//!
//! - `stop` closes the dispatcher *before* taking the lock for the backend
//!   close, so a callback that is still running may itself call `stop`.
//! - `feed_native_message` decodes under the lock and dispatches after
//!   releasing it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use spacemouse_core::DeviceEvent;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::dispatch::{CallbackSet, Dispatcher};
use crate::infrastructure::backend::{
    native_backend, BackendKind, DeviceBackend, NativeMessage, NativeOutcome, WindowHandle,
};
use crate::infrastructure::storage::config::DaemonConfig;

/// Errors returned by daemon operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DaemonError {
    /// The platform driver or service could not be reached.
    #[error("3D-mouse driver unavailable: {0}")]
    DeviceUnavailable(String),

    /// A session is already running (in this daemon or, for the same device
    /// resource, in another daemon of this process).
    #[error("3D-mouse daemon is already running")]
    AlreadyRunning,

    /// The device connection ended during a session.
    #[error("3D-mouse connection lost")]
    ConnectionLost,

    /// No backend exists for this platform.
    #[error("no 3D-mouse support on this platform: {0}")]
    UnsupportedPlatform(String),

    /// The window handle given to `bind_window_handle` cannot be used.
    #[error("window handle rejected: {0}")]
    WindowHandleRejected(String),
}

/// Observable daemon state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonState {
    Stopped,
    Running,
    /// The last session lost its device; `start` may be called again.
    ConnectionLost,
}

struct Inner {
    backend: Box<dyn DeviceBackend>,
    session: Option<Arc<Dispatcher>>,
}

/// The device daemon.
pub struct Daemon {
    kind: BackendKind,
    inner: Mutex<Inner>,
}

impl Daemon {
    /// Creates a daemon with the native backend for this platform.
    pub fn new(config: &DaemonConfig) -> Self {
        Self::with_backend(native_backend(config))
    }

    /// Creates a daemon around an explicit backend.
    pub fn with_backend(backend: Box<dyn DeviceBackend>) -> Self {
        Self {
            kind: backend.kind(),
            inner: Mutex::new(Inner {
                backend,
                session: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Opens the device and begins delivering events to `callbacks`.
    ///
    /// A session whose connection was lost, or that a concurrent `stop` has
    /// already closed, is reaped first.
    ///
    /// # Errors
    ///
    /// - [`DaemonError::AlreadyRunning`] if a live session exists; it is left
    ///   untouched.
    /// - [`DaemonError::DeviceUnavailable`] if the driver cannot be reached.
    /// - [`DaemonError::UnsupportedPlatform`] if there is no backend.
    pub fn start(&self, callbacks: CallbackSet) -> Result<(), DaemonError> {
        let mut inner = self.lock();

        if let Some(current) = inner.session.take() {
            if current.is_open() && inner.backend.is_alive() {
                inner.session = Some(current);
                warn!("start() called while the 3D-mouse daemon is running");
                return Err(DaemonError::AlreadyRunning);
            }
            info!("reaping previous 3D-mouse session");
            current.close();
            inner.backend.close();
        }

        let dispatcher = Arc::new(Dispatcher::new(callbacks));
        match inner.backend.open(Arc::clone(&dispatcher)) {
            Ok(()) => {
                inner.session = Some(dispatcher);
                info!(backend = ?self.kind, "3D-mouse daemon started");
                Ok(())
            }
            Err(e) => {
                dispatcher.close();
                info!(backend = ?self.kind, "3D-mouse daemon not started: {e}");
                Err(e)
            }
        }
    }

    /// Stops the running session.  A no-op when nothing is running.
    ///
    /// When this returns, no callback of the stopped session is running or
    /// will run, unless `stop` was called from inside one of those callbacks.
    pub fn stop(&self) {
        let Some(dispatcher) = self.lock().session.clone() else {
            debug!("stop() called while the 3D-mouse daemon is not running");
            return;
        };

        // Without the daemon lock: in-flight callbacks may call back into us.
        dispatcher.close();

        let mut inner = self.lock();
        match inner.session.as_ref() {
            Some(current) if Arc::ptr_eq(current, &dispatcher) => {
                inner.session = None;
                inner.backend.close();
                info!(delivered = dispatcher.delivered(), "3D-mouse daemon stopped");
            }
            // A concurrent stop or start already reaped this session.
            _ => debug!("3D-mouse session already closed"),
        }
    }

    /// Binds the host window that receives device messages.
    ///
    /// Only the message-pump backend uses it: if a session is running, raw
    /// input is registered for the window right away, otherwise on the next
    /// `start`.  Other backends accept and ignore the handle.
    ///
    /// # Errors
    ///
    /// [`DaemonError::WindowHandleRejected`] if the handle is null or
    /// registration fails.
    pub fn bind_window_handle(&self, handle: WindowHandle) -> Result<(), DaemonError> {
        let result = self.lock().backend.bind_window_handle(handle);
        match &result {
            Ok(()) => debug!(hwnd = handle.0, "window handle bound"),
            Err(e) => warn!(hwnd = handle.0, "window handle not bound: {e}"),
        }
        result
    }

    /// Offers one native window message to the daemon.
    ///
    /// Returns `true` if the message was a device message and has been
    /// handled.  Always `false` when stopped or on backends that do not use
    /// window messages.
    pub fn feed_native_message(&self, message: &NativeMessage) -> bool {
        let (dispatcher, events): (Arc<Dispatcher>, Vec<DeviceEvent>) = {
            let mut inner = self.lock();
            let Some(dispatcher) = inner.session.clone() else {
                return false;
            };
            match inner.backend.translate_native_message(message) {
                NativeOutcome::NotMine => return false,
                NativeOutcome::Consumed(events) => (dispatcher, events),
                NativeOutcome::DeviceRemoved => {
                    drop(inner);
                    dispatcher.notify_connection_lost();
                    return true;
                }
            }
        };

        for event in events {
            dispatcher.dispatch(event);
        }
        true
    }

    /// `true` while a session is running and its device is connected.
    pub fn is_running(&self) -> bool {
        self.state() == DaemonState::Running
    }

    pub fn state(&self) -> DaemonState {
        let inner = self.lock();
        match &inner.session {
            None => DaemonState::Stopped,
            Some(d) if d.is_open() && inner.backend.is_alive() => DaemonState::Running,
            Some(d) if d.is_open() => DaemonState::ConnectionLost,
            Some(_) => DaemonState::Stopped,
        }
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.kind
    }
}

impl Drop for Daemon {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for Daemon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Daemon")
            .field("kind", &self.kind)
            .field("state", &self.state())
            .finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
