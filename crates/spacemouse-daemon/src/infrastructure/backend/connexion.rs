//! Client-callback backend using the 3DconnexionClient framework (macOS).
//!
//! The vendor framework owns the event thread.  We install three C handlers
//! (message, device added, device removed) and register as a client; the
//! framework then calls the message handler with a `ConnexionDeviceState` for
//! every device report addressed to our client id.
//!
//! The C handlers carry no user pointer, so the active session lives in one
//! private static slot.  The `CONNEXION_CLIENT` resource claim guarantees at
//! most one backend in the process fills that slot at a time.
//!
//! Handlers decode under the slot lock and dispatch after releasing it, so a
//! callback that stops the daemon never waits on the slot.
//!
//! # Safety
//!
//! `unsafe` is used only for the framework FFI calls and for reading the
//! device-state struct the framework passes to the message handler.

#![cfg(all(target_os = "macos", feature = "lib3dx"))]

use std::ffi::c_void;
use std::ptr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use spacemouse_core::decode::connexion::ConnexionState;
use spacemouse_core::ConnexionDecoder;
use tracing::{debug, info, warn};

use super::{BackendKind, DeviceBackend};
use crate::application::daemon::DaemonError;
use crate::application::dispatch::Dispatcher;
use crate::infrastructure::claim::{ResourceClaim, CONNEXION_CLIENT};

#[allow(non_snake_case)]
mod ffi {
    use std::ffi::c_void;

    /// `kConnexionClientWildcard`: receive events whichever app has focus.
    pub const CLIENT_WILDCARD: u32 = 0x2A2A_2A2A;
    /// `kConnexionClientModeTakeOver`
    pub const CLIENT_MODE_TAKE_OVER: u16 = 1;
    /// `kConnexionMaskAll`
    pub const MASK_ALL: u32 = 0x3FFF;
    /// `kConnexionMsgDeviceState` ('3dSR')
    pub const MSG_DEVICE_STATE: u32 = 0x3364_5352;

    /// `ConnexionDeviceState` as laid out by the framework headers.
    #[repr(C, packed(2))]
    #[derive(Clone, Copy)]
    pub struct ConnexionDeviceState {
        pub version: u16,
        pub client: u16,
        pub command: u16,
        pub param: i16,
        pub value: i32,
        pub time: u64,
        pub report: [u8; 8],
        pub buttons8: u16,
        pub axis: [i16; 6],
        pub address: u16,
        pub buttons: u32,
    }

    pub type MessageHandler = extern "C" fn(u32, u32, *mut c_void);
    pub type AddedHandler = extern "C" fn(u32);
    pub type RemovedHandler = extern "C" fn(u32);

    #[link(name = "3DconnexionClient", kind = "framework")]
    extern "C" {
        pub fn SetConnexionHandlers(
            message_handler: MessageHandler,
            added_handler: Option<AddedHandler>,
            removed_handler: Option<RemovedHandler>,
            use_separate_thread: bool,
        ) -> i16;
        pub fn CleanupConnexionHandlers();
        pub fn RegisterConnexionClient(signature: u32, name: *const u8, mode: u16, mask: u32) -> u16;
        pub fn UnregisterConnexionClient(client_id: u16);
    }
}

// ── Session slot ──────────────────────────────────────────────────────────────

struct SlotState {
    /// 0 until registration returns; messages are ignored until then.
    client_id: u16,
    decoder: ConnexionDecoder,
    dispatcher: Arc<Dispatcher>,
    alive: Arc<AtomicBool>,
}

static SLOT: Mutex<Option<SlotState>> = Mutex::new(None);

fn lock_slot() -> MutexGuard<'static, Option<SlotState>> {
    SLOT.lock().unwrap_or_else(PoisonError::into_inner)
}

extern "C" fn on_message(_product_id: u32, message_type: u32, argument: *mut c_void) {
    if message_type != ffi::MSG_DEVICE_STATE || argument.is_null() {
        return;
    }
    // SAFETY: for `kConnexionMsgDeviceState` the framework passes a pointer to
    // a `ConnexionDeviceState` valid for the duration of this call.  The struct
    // is packed, so it is copied out with an unaligned read.
    let raw = unsafe { ptr::read_unaligned(argument as *const ffi::ConnexionDeviceState) };
    let state = ConnexionState {
        client: raw.client,
        command: raw.command,
        buttons: raw.buttons,
        axis: raw.axis,
    };

    let (dispatcher, event) = {
        let mut slot = lock_slot();
        let Some(session) = slot.as_mut() else {
            return;
        };
        // Messages addressed to other clients are not ours to read.
        if session.client_id == 0 || state.client != session.client_id {
            return;
        }
        match session.decoder.decode(&state) {
            Ok(Some(event)) => (Arc::clone(&session.dispatcher), event),
            Ok(None) => return,
            Err(e) => {
                debug!("dropping device-state message: {e}");
                return;
            }
        }
    };
    dispatcher.dispatch(event);
}

extern "C" fn on_device_added(product_id: u32) {
    info!(product_id, "3Dconnexion device added");
}

extern "C" fn on_device_removed(product_id: u32) {
    let dispatcher = {
        let slot = lock_slot();
        let Some(session) = slot.as_ref() else {
            return;
        };
        session.alive.store(false, Ordering::Release);
        Arc::clone(&session.dispatcher)
    };
    info!(product_id, "3Dconnexion device removed");
    dispatcher.notify_connection_lost();
}

// ── Backend ───────────────────────────────────────────────────────────────────

/// 3DconnexionClient backend.
pub struct ConnexionBackend {
    /// Client name as a Pascal string (length byte first).
    client_name: Vec<u8>,
    client_id: u16,
    claim: Option<ResourceClaim>,
    alive: Arc<AtomicBool>,
}

impl ConnexionBackend {
    pub fn new(client_name: &str) -> Self {
        Self {
            client_name: pascal_string(client_name),
            client_id: 0,
            claim: None,
            alive: Arc::new(AtomicBool::new(false)),
        }
    }

    fn teardown(&mut self) {
        if self.client_id != 0 {
            // SAFETY: `client_id` was returned by `RegisterConnexionClient` and
            // has not been unregistered yet.
            unsafe { ffi::UnregisterConnexionClient(self.client_id) };
            self.client_id = 0;
        }
        *lock_slot() = None;
        // SAFETY: handlers were installed by `open`; cleanup is valid even if
        // registration failed afterwards.
        unsafe { ffi::CleanupConnexionHandlers() };
        self.alive.store(false, Ordering::Release);
    }
}

impl DeviceBackend for ConnexionBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::ClientCallback
    }

    fn open(&mut self, dispatcher: Arc<Dispatcher>) -> Result<(), DaemonError> {
        if self.claim.is_some() {
            return Err(DaemonError::AlreadyRunning);
        }
        let claim = ResourceClaim::acquire(CONNEXION_CLIENT).ok_or(DaemonError::AlreadyRunning)?;

        self.alive = Arc::new(AtomicBool::new(true));
        *lock_slot() = Some(SlotState {
            client_id: 0,
            decoder: ConnexionDecoder::new(),
            dispatcher,
            alive: Arc::clone(&self.alive),
        });

        // SAFETY: the handlers are `'static` functions that stay valid until
        // `CleanupConnexionHandlers`.
        let rc = unsafe {
            ffi::SetConnexionHandlers(on_message, Some(on_device_added), Some(on_device_removed), true)
        };
        if rc != 0 {
            *lock_slot() = None;
            self.alive.store(false, Ordering::Release);
            return Err(DaemonError::DeviceUnavailable(format!(
                "3DconnexionClient driver not available (SetConnexionHandlers returned {rc})"
            )));
        }

        // SAFETY: `client_name` is a valid Pascal string owned by `self` for
        // the duration of the call.
        let client_id = unsafe {
            ffi::RegisterConnexionClient(
                ffi::CLIENT_WILDCARD,
                self.client_name.as_ptr(),
                ffi::CLIENT_MODE_TAKE_OVER,
                ffi::MASK_ALL,
            )
        };
        if client_id == 0 {
            self.teardown();
            return Err(DaemonError::DeviceUnavailable(
                "RegisterConnexionClient returned no client id".to_string(),
            ));
        }

        self.client_id = client_id;
        if let Some(session) = lock_slot().as_mut() {
            session.client_id = client_id;
        }
        self.claim = Some(claim);
        info!(client_id, "registered with 3DconnexionClient");
        Ok(())
    }

    fn close(&mut self) {
        if self.claim.is_none() {
            return;
        }
        self.teardown();
        self.claim = None;
        debug!("3DconnexionClient backend closed");
    }

    fn is_alive(&self) -> bool {
        self.claim.is_some() && self.alive.load(Ordering::Acquire)
    }
}

impl Drop for ConnexionBackend {
    fn drop(&mut self) {
        self.close();
    }
}

/// Encodes `name` as a Pascal string, truncated to 255 bytes.
fn pascal_string(name: &str) -> Vec<u8> {
    let bytes = &name.as_bytes()[..name.len().min(u8::MAX as usize)];
    let mut out = Vec::with_capacity(bytes.len() + 1);
    out.push(bytes.len() as u8);
    out.extend_from_slice(bytes);
    if bytes.len() < name.len() {
        warn!("3DconnexionClient name truncated to 255 bytes");
    }
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pascal_string_prefixes_length() {
        assert_eq!(pascal_string("Tool"), vec![4, b'T', b'o', b'o', b'l']);
    }

    #[test]
    fn test_pascal_string_truncates_long_names() {
        let long = "x".repeat(300);
        let encoded = pascal_string(&long);
        assert_eq!(encoded[0], 255);
        assert_eq!(encoded.len(), 256);
    }

    #[test]
    fn test_device_state_layout_matches_framework() {
        // 2+2+2+2+4+8+8+2+12+2+4 with 2-byte packing
        assert_eq!(std::mem::size_of::<ffi::ConnexionDeviceState>(), 48);
    }

    #[test]
    fn test_message_without_session_is_ignored() {
        let mut raw = ffi::ConnexionDeviceState {
            version: 0,
            client: 1,
            command: 3,
            param: 0,
            value: 0,
            time: 0,
            report: [0; 8],
            buttons8: 0,
            axis: [1, 2, 3, 4, 5, 6],
            address: 0,
            buttons: 0,
        };
        // Must neither crash nor deliver.
        on_message(0, ffi::MSG_DEVICE_STATE, ptr::addr_of_mut!(raw).cast());
        on_message(0, 0, ptr::null_mut());
    }
}
