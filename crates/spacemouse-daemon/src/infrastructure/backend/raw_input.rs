//! Message-pump backend using Windows Raw Input.
//!
//! 3Dconnexion devices enumerate as HID multi-axis controllers (usage page
//! 0x01, usage 0x08).  Registering that usage for the host window with
//! `RIDEV_INPUTSINK` makes Windows post a `WM_INPUT` message for every device
//! report, even while the window is in the background.  `RIDEV_DEVNOTIFY`
//! adds `WM_INPUT_DEVICE_CHANGE` for arrival and removal of such devices; when
//! the last one is removed the session reports connection loss.
//!
//! There is no daemon thread: the host's message pump forwards every message
//! to `Daemon::feed_native_message`, which calls
//! [`DeviceBackend::translate_native_message`] on the UI thread.  Callbacks
//! therefore run on the UI thread and must not block.
//!
//! # Safety
//!
//! This module uses `unsafe` code exclusively for Windows API FFI calls.
//! All `unsafe` blocks are annotated with `// SAFETY:` comments.

#![cfg(target_os = "windows")]

use std::collections::HashSet;
use std::ffi::c_void;
use std::mem::size_of;
use std::ptr;
use std::sync::Arc;

use spacemouse_core::{DeviceEvent, HidReportDecoder};
use tracing::{debug, info, warn};
use windows::Win32::Foundation::HWND;
use windows::Win32::UI::Input::{
    GetRawInputData, RegisterRawInputDevices, HRAWINPUT, RAWINPUTDEVICE, RAWINPUTHEADER,
    RIDEV_DEVNOTIFY, RIDEV_INPUTSINK, RIDEV_REMOVE, RID_INPUT, RIM_TYPEHID,
};

use super::{
    BackendKind, DeviceBackend, NativeMessage, NativeOutcome, WindowHandle, GIDC_ARRIVAL,
    GIDC_REMOVAL, WM_INPUT, WM_INPUT_DEVICE_CHANGE,
};
use crate::application::daemon::DaemonError;
use crate::application::dispatch::Dispatcher;
use crate::infrastructure::claim::{ResourceClaim, RAW_INPUT};

const USAGE_PAGE_GENERIC_DESKTOP: u16 = 0x01;
const USAGE_MULTI_AXIS_CONTROLLER: u16 = 0x08;

/// Raw Input backend.
pub struct RawInputBackend {
    hwnd: Option<isize>,
    registered: bool,
    claim: Option<ResourceClaim>,
    decoder: HidReportDecoder,
    /// Raw input handles of the multi-axis devices seen this session.
    devices: HashSet<isize>,
    device_lost: bool,
}

impl RawInputBackend {
    pub fn new() -> Self {
        Self {
            hwnd: None,
            registered: false,
            claim: None,
            decoder: HidReportDecoder::new(),
            devices: HashSet::new(),
            device_lost: false,
        }
    }

    fn is_open(&self) -> bool {
        self.claim.is_some()
    }

    fn register(&mut self, hwnd: isize) -> Result<(), String> {
        let device = RAWINPUTDEVICE {
            usUsagePage: USAGE_PAGE_GENERIC_DESKTOP,
            usUsage: USAGE_MULTI_AXIS_CONTROLLER,
            dwFlags: RIDEV_INPUTSINK | RIDEV_DEVNOTIFY,
            hwndTarget: HWND(hwnd as *mut c_void),
        };
        // SAFETY: `device` is fully initialized and the size argument matches
        // the element type of the slice.
        unsafe { RegisterRawInputDevices(&[device], size_of::<RAWINPUTDEVICE>() as u32) }
            .map_err(|e| format!("RegisterRawInputDevices failed: {e}"))?;
        self.registered = true;
        info!(hwnd, "raw input registered for multi-axis controllers");
        Ok(())
    }

    fn unregister(&mut self) {
        if !self.registered {
            return;
        }
        let device = RAWINPUTDEVICE {
            usUsagePage: USAGE_PAGE_GENERIC_DESKTOP,
            usUsage: USAGE_MULTI_AXIS_CONTROLLER,
            dwFlags: RIDEV_REMOVE,
            // RIDEV_REMOVE requires a null target window.
            hwndTarget: HWND::default(),
        };
        // SAFETY: as in `register`.
        if let Err(e) = unsafe { RegisterRawInputDevices(&[device], size_of::<RAWINPUTDEVICE>() as u32) } {
            warn!("failed to unregister raw input: {e}");
        }
        self.registered = false;
    }

    /// Maps a `WM_INPUT_DEVICE_CHANGE` notification.
    ///
    /// Windows only notifies about devices of the registered usage, so every
    /// notification concerns a multi-axis controller.
    fn on_device_change(&mut self, change: usize, device: isize) -> NativeOutcome {
        match change {
            GIDC_ARRIVAL => {
                if self.devices.insert(device) {
                    info!(device, "multi-axis device attached");
                }
                NativeOutcome::Consumed(Vec::new())
            }
            GIDC_REMOVAL => {
                self.devices.remove(&device);
                if !self.devices.is_empty() || self.device_lost {
                    debug!(device, "multi-axis device detached");
                    return NativeOutcome::Consumed(Vec::new());
                }
                self.device_lost = true;
                NativeOutcome::DeviceRemoved
            }
            _ => NativeOutcome::NotMine,
        }
    }
}

impl Default for RawInputBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceBackend for RawInputBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::MessagePump
    }

    fn open(&mut self, _dispatcher: Arc<Dispatcher>) -> Result<(), DaemonError> {
        // Events are dispatched by the daemon from feed_native_message.
        if self.is_open() {
            return Err(DaemonError::AlreadyRunning);
        }
        let claim = ResourceClaim::acquire(RAW_INPUT).ok_or(DaemonError::AlreadyRunning)?;
        self.decoder = HidReportDecoder::new();
        self.devices.clear();
        self.device_lost = false;

        match self.hwnd {
            Some(hwnd) => self.register(hwnd).map_err(DaemonError::DeviceUnavailable)?,
            None => debug!("raw input backend opened without a window; waiting for bind_window_handle"),
        }
        self.claim = Some(claim);
        Ok(())
    }

    fn close(&mut self) {
        self.unregister();
        if self.claim.take().is_some() {
            debug!("raw input backend closed");
        }
    }

    fn is_alive(&self) -> bool {
        self.is_open() && !self.device_lost
    }

    fn bind_window_handle(&mut self, handle: WindowHandle) -> Result<(), DaemonError> {
        if handle.0 == 0 {
            return Err(DaemonError::WindowHandleRejected("null window handle".to_string()));
        }
        if self.hwnd == Some(handle.0) && self.registered {
            return Ok(());
        }
        self.unregister();
        self.hwnd = Some(handle.0);
        if self.is_open() {
            self.register(handle.0).map_err(DaemonError::WindowHandleRejected)?;
        }
        Ok(())
    }

    fn translate_native_message(&mut self, message: &NativeMessage) -> NativeOutcome {
        if !self.registered {
            return NativeOutcome::NotMine;
        }
        if message.message == WM_INPUT_DEVICE_CHANGE {
            return self.on_device_change(message.wparam, message.lparam);
        }
        if message.message != WM_INPUT {
            return NativeOutcome::NotMine;
        }
        let Some(raw) = read_raw_input(message.lparam) else {
            return NativeOutcome::NotMine;
        };
        if let Some(device) = source_device(&raw) {
            self.devices.insert(device);
        }
        let Some(reports) = hid_reports(&raw, size_of::<RAWINPUTHEADER>()) else {
            return NativeOutcome::NotMine;
        };

        let mut events: Vec<DeviceEvent> = Vec::with_capacity(reports.len());
        for report in reports {
            match self.decoder.decode(report) {
                Ok(event) => events.push(event),
                Err(e) => debug!("dropping HID report: {e}"),
            }
        }
        NativeOutcome::Consumed(events)
    }
}

impl Drop for RawInputBackend {
    fn drop(&mut self) {
        self.close();
    }
}

/// Copies the `RAWINPUT` block referenced by a `WM_INPUT` lParam.
fn read_raw_input(lparam: isize) -> Option<Vec<u8>> {
    let handle = HRAWINPUT(lparam as *mut c_void);
    let header_size = size_of::<RAWINPUTHEADER>() as u32;
    let mut size = 0u32;

    // SAFETY: a `None` data pointer only queries the required buffer size.
    let rc = unsafe { GetRawInputData(handle, RID_INPUT, None, &mut size, header_size) };
    if rc == u32::MAX || size == 0 {
        return None;
    }

    let mut buf = vec![0u8; size as usize];
    // SAFETY: `buf` provides exactly `size` writable bytes.
    let copied = unsafe {
        GetRawInputData(
            handle,
            RID_INPUT,
            Some(buf.as_mut_ptr().cast()),
            &mut size,
            header_size,
        )
    };
    if copied == u32::MAX {
        return None;
    }
    buf.truncate(copied as usize);
    Some(buf)
}

/// Device handle from the header of a `RAWINPUT` block.
fn source_device(raw: &[u8]) -> Option<isize> {
    if raw.len() < size_of::<RAWINPUTHEADER>() {
        return None;
    }
    // SAFETY: the length check covers the whole header; `read_unaligned`
    // accepts the byte buffer's alignment.
    let header: RAWINPUTHEADER = unsafe { ptr::read_unaligned(raw.as_ptr().cast()) };
    Some(header.hDevice.0 as isize)
}

/// Splits a `RAWINPUT` block of type HID into its reports.
///
/// Layout after the header: `[dwSizeHid:u32][dwCount:u32][dwCount × dwSizeHid bytes]`.
/// Returns `None` for non-HID input or a block too short for what it claims.
fn hid_reports(raw: &[u8], header_size: usize) -> Option<Vec<&[u8]>> {
    let read_u32 = |at: usize| -> Option<u32> {
        raw.get(at..at + 4)
            .map(|b| u32::from_ne_bytes([b[0], b[1], b[2], b[3]]))
    };

    if read_u32(0)? != RIM_TYPEHID.0 {
        return None;
    }
    let size_hid = read_u32(header_size)? as usize;
    let count = read_u32(header_size + 4)? as usize;
    let data = raw.get(header_size + 8..)?;
    if size_hid == 0 || data.len() < size_hid.checked_mul(count)? {
        return None;
    }
    Some(data.chunks_exact(size_hid).take(count).collect())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_block(kind: u32, size_hid: u32, reports: &[&[u8]]) -> Vec<u8> {
        let header = size_of::<RAWINPUTHEADER>();
        let mut raw = vec![0u8; header];
        raw[..4].copy_from_slice(&kind.to_ne_bytes());
        raw.extend_from_slice(&size_hid.to_ne_bytes());
        raw.extend_from_slice(&(reports.len() as u32).to_ne_bytes());
        for r in reports {
            raw.extend_from_slice(r);
        }
        raw
    }

    #[test]
    fn test_hid_reports_splits_multiple_reports() {
        // Arrange
        let raw = raw_block(RIM_TYPEHID.0, 4, &[&[3, 4, 0, 0], &[3, 0, 0, 0]]);

        // Act
        let reports = hid_reports(&raw, size_of::<RAWINPUTHEADER>()).expect("hid");

        // Assert
        assert_eq!(reports, vec![&[3u8, 4, 0, 0][..], &[3u8, 0, 0, 0][..]]);
    }

    #[test]
    fn test_hid_reports_rejects_keyboard_input() {
        let raw = raw_block(1, 4, &[&[0, 0, 0, 0]]);
        assert!(hid_reports(&raw, size_of::<RAWINPUTHEADER>()).is_none());
    }

    #[test]
    fn test_hid_reports_rejects_short_block() {
        let mut raw = raw_block(RIM_TYPEHID.0, 7, &[&[1, 0, 0, 0, 0, 0, 0]]);
        raw.truncate(raw.len() - 2);
        assert!(hid_reports(&raw, size_of::<RAWINPUTHEADER>()).is_none());
    }

    #[test]
    fn test_bind_null_handle_is_rejected() {
        let mut backend = RawInputBackend::new();
        assert!(matches!(
            backend.bind_window_handle(WindowHandle(0)),
            Err(DaemonError::WindowHandleRejected(_))
        ));
    }

    #[test]
    fn test_removal_of_last_device_is_reported_once() {
        // Arrange
        let mut backend = RawInputBackend::new();
        backend.on_device_change(GIDC_ARRIVAL, 0x10);
        backend.on_device_change(GIDC_ARRIVAL, 0x20);

        // Act
        let first = backend.on_device_change(GIDC_REMOVAL, 0x10);
        let last = backend.on_device_change(GIDC_REMOVAL, 0x20);
        let again = backend.on_device_change(GIDC_REMOVAL, 0x20);

        // Assert
        assert_eq!(first, NativeOutcome::Consumed(Vec::new()));
        assert_eq!(last, NativeOutcome::DeviceRemoved);
        assert_eq!(again, NativeOutcome::Consumed(Vec::new()));
        assert!(backend.device_lost);
    }

    #[test]
    fn test_unknown_device_change_is_not_consumed() {
        let mut backend = RawInputBackend::new();
        assert_eq!(backend.on_device_change(7, 0x10), NativeOutcome::NotMine);
    }

    #[test]
    fn test_source_device_reads_header_handle() {
        let header = RAWINPUTHEADER {
            hDevice: windows::Win32::Foundation::HANDLE(0x4242 as *mut c_void),
            ..Default::default()
        };
        let mut raw = vec![0u8; size_of::<RAWINPUTHEADER>()];
        // SAFETY: `raw` has exactly the size of the header.
        unsafe {
            ptr::copy_nonoverlapping(
                (&header as *const RAWINPUTHEADER).cast::<u8>(),
                raw.as_mut_ptr(),
                raw.len(),
            )
        };

        assert_eq!(source_device(&raw), Some(0x4242));
        assert_eq!(source_device(&raw[..4]), None);
    }

    #[test]
    fn test_messages_before_registration_are_not_consumed() {
        let mut backend = RawInputBackend::new();
        let msg = NativeMessage {
            hwnd: 1,
            message: WM_INPUT,
            wparam: 0,
            lparam: 0,
        };
        assert_eq!(backend.translate_native_message(&msg), NativeOutcome::NotMine);

        let removal = NativeMessage {
            message: WM_INPUT_DEVICE_CHANGE,
            wparam: GIDC_REMOVAL,
            ..msg
        };
        assert_eq!(backend.translate_native_message(&removal), NativeOutcome::NotMine);
    }
}
