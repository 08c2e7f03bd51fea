//! Mock backend for testing.
//!
//! Lets tests drive a [`Daemon`](crate::Daemon) without a device: inject
//! decoded events or raw spacenavd frames, queue HID reports for
//! `feed_native_message`, make `open` fail, and simulate the device going away.
//!
//! `MockBackend` is a cheap handle around shared state, so a test keeps one
//! clone while the daemon owns the other.

use std::sync::{Arc, Mutex, PoisonError};

use spacemouse_core::{DecodeError, DeviceEvent, HidReportDecoder, SpnavDecoder};

use super::{
    BackendKind, DeviceBackend, NativeMessage, NativeOutcome, WindowHandle, GIDC_REMOVAL, WM_INPUT,
    WM_INPUT_DEVICE_CHANGE,
};
use crate::application::daemon::DaemonError;
use crate::application::dispatch::Dispatcher;

#[derive(Default)]
struct MockState {
    dispatcher: Option<Arc<Dispatcher>>,
    alive: bool,
    fail_next_open: Option<DaemonError>,
    open_count: usize,
    close_count: usize,
    window: Option<WindowHandle>,
    native_reports: Vec<Vec<u8>>,
    spnav: SpnavDecoder,
    hid: HidReportDecoder,
}

/// A [`DeviceBackend`] whose device is the test itself.
#[derive(Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Delivers `event` as if the device had produced it, on the calling thread.
    ///
    /// Returns `false` if no session is open or the gate discarded it.
    pub fn inject(&self, event: DeviceEvent) -> bool {
        // Released before dispatching: a callback may stop the daemon, which
        // closes this backend.
        let dispatcher = {
            let state = self.lock();
            if !state.alive {
                return false;
            }
            state.dispatcher.clone()
        };
        dispatcher.is_some_and(|d| d.dispatch(event))
    }

    /// Decodes a raw spacenavd frame with the session's decoder and delivers it.
    ///
    /// # Errors
    ///
    /// Any [`DecodeError`] from the spacenavd decoder; nothing is delivered then.
    pub fn inject_raw_spnav(&self, bytes: &[u8]) -> Result<bool, DecodeError> {
        let event = self.lock().spnav.decode_bytes(bytes)?;
        Ok(self.inject(event))
    }

    /// Queues a HID report; the next `WM_INPUT` fed to the daemon decodes it.
    pub fn queue_native_report(&self, report: Vec<u8>) {
        self.lock().native_reports.push(report);
    }

    /// Makes the next `open` fail with `error`.
    pub fn fail_next_open(&self, error: DaemonError) {
        self.lock().fail_next_open = Some(error);
    }

    /// Marks the device as gone and notifies the session once.
    pub fn simulate_connection_lost(&self) -> bool {
        let dispatcher = {
            let mut state = self.lock();
            state.alive = false;
            state.dispatcher.clone()
        };
        dispatcher.is_some_and(|d| d.notify_connection_lost())
    }

    pub fn open_count(&self) -> usize {
        self.lock().open_count
    }

    pub fn close_count(&self) -> usize {
        self.lock().close_count
    }

    pub fn bound_window(&self) -> Option<WindowHandle> {
        self.lock().window
    }

    /// Returns `true` while a session's dispatcher is attached.
    pub fn has_session(&self) -> bool {
        self.lock().dispatcher.is_some()
    }
}

impl DeviceBackend for MockBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Mock
    }

    fn open(&mut self, dispatcher: Arc<Dispatcher>) -> Result<(), DaemonError> {
        let mut state = self.lock();
        if let Some(error) = state.fail_next_open.take() {
            return Err(error);
        }
        state.open_count += 1;
        state.alive = true;
        state.dispatcher = Some(dispatcher);
        state.spnav = SpnavDecoder::new();
        state.hid = HidReportDecoder::new();
        Ok(())
    }

    fn close(&mut self) {
        let mut state = self.lock();
        if state.dispatcher.take().is_some() {
            state.close_count += 1;
        }
        state.alive = false;
    }

    fn is_alive(&self) -> bool {
        self.lock().alive
    }

    fn bind_window_handle(&mut self, handle: WindowHandle) -> Result<(), DaemonError> {
        if handle.0 == 0 {
            return Err(DaemonError::WindowHandleRejected("null window handle".to_string()));
        }
        self.lock().window = Some(handle);
        Ok(())
    }

    fn translate_native_message(&mut self, message: &NativeMessage) -> NativeOutcome {
        let mut state = self.lock();
        if message.message == WM_INPUT_DEVICE_CHANGE && message.wparam == GIDC_REMOVAL && state.alive {
            state.alive = false;
            return NativeOutcome::DeviceRemoved;
        }
        if message.message != WM_INPUT {
            return NativeOutcome::NotMine;
        }
        if state.native_reports.is_empty() {
            return NativeOutcome::NotMine;
        }
        let report = state.native_reports.remove(0);
        NativeOutcome::Consumed(state.hid.decode(&report).ok().into_iter().collect())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
