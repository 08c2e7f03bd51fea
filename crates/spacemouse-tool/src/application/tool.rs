//! Plugin glue between the host application, the daemon and the controller.
//!
//! The host calls [`SpaceMouseTool::on_engine_created`] once its main window
//! exists and [`SpaceMouseTool::on_application_shutdown`] at teardown.  A
//! missing or unreachable device never surfaces as an error to the host; the
//! tool logs it and stays idle.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use spacemouse_daemon::infrastructure::storage::config::ControllerConfig;
use spacemouse_daemon::{BackendKind, CallbackSet, Daemon, NativeMessage, WindowHandle};
use tracing::{info, warn};

use super::camera_controller::{CameraController, ControllerSettings};
use crate::infrastructure::host::SceneHost;

type SharedController<H> = Arc<Mutex<CameraController<H>>>;

fn lock<H: SceneHost>(controller: &Mutex<CameraController<H>>) -> MutexGuard<'_, CameraController<H>> {
    controller.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The 3D-mouse extension of one host application.
pub struct SpaceMouseTool<H: SceneHost + Send + 'static> {
    daemon: Daemon,
    controller: SharedController<H>,
}

impl<H: SceneHost + Send + 'static> SpaceMouseTool<H> {
    pub fn new(daemon: Daemon, host: H, config: &ControllerConfig) -> Self {
        // Only spacenavd leaves the lock-rotation button to the application.
        let toggles_rotation_lock = daemon.backend_kind() == BackendKind::BlockingRead;
        let mut controller =
            CameraController::new(host, ControllerSettings::from(config), toggles_rotation_lock);
        controller.set_constrained_orbit(config.constrained_orbit);
        Self {
            daemon,
            controller: Arc::new(Mutex::new(controller)),
        }
    }

    /// Starts the daemon and, if given, binds the host's main window.
    ///
    /// Returns `true` if the device daemon is running and can receive events.
    /// When only the window binding fails the daemon keeps running, so a later
    /// `Daemon::bind_window_handle` can still succeed, but `false` is returned.
    pub fn on_engine_created(&self, window: Option<WindowHandle>) -> bool {
        if let Err(e) = self.daemon.start(self.callbacks()) {
            warn!("3D mouse not available: {e}");
            return false;
        }
        if let Some(handle) = window {
            if let Err(e) = self.daemon.bind_window_handle(handle) {
                warn!("3D mouse running without input, window binding failed: {e}");
                return false;
            }
        }
        info!(backend = ?self.daemon.backend_kind(), "space mouse tool initialized");
        true
    }

    pub fn on_application_shutdown(&self) {
        self.daemon.stop();
    }

    /// Switches between free and constrained orbit; returns `true` when
    /// constrained orbit is now active.
    pub fn toggle_orbit(&self) -> bool {
        lock(&self.controller).toggle_orbit()
    }

    /// Forwards a native window message from the host's event filter.
    pub fn feed_native_message(&self, message: &NativeMessage) -> bool {
        self.daemon.feed_native_message(message)
    }

    pub fn controller(&self) -> SharedController<H> {
        Arc::clone(&self.controller)
    }

    pub fn daemon(&self) -> &Daemon {
        &self.daemon
    }

    fn callbacks(&self) -> CallbackSet {
        let (motion, press, release) = (
            Arc::clone(&self.controller),
            Arc::clone(&self.controller),
            Arc::clone(&self.controller),
        );
        CallbackSet::new(
            move |event| lock(&motion).on_motion(event),
            move |event| lock(&press).on_button_press(event),
            move |event| lock(&release).on_button_release(event),
        )
        .with_connection_lost(|| info!("3D mouse disconnected; restart the application to reconnect"))
    }
}

impl<H: SceneHost + Send + 'static> Drop for SpaceMouseTool<H> {
    fn drop(&mut self) {
        self.daemon.stop();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
