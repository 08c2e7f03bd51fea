//! Callback dispatch.
//!
//! The host hands the daemon a [`CallbackSet`] at start.  Every session wraps
//! it in a fresh [`Dispatcher`], which backends call with each decoded event.
//!
//! # Delivery guarantees
//!
//! - Each decoded event invokes exactly one callback, synchronously, on the
//!   thread that decoded it.  Nothing is queued, merged or dropped on the way.
//! - Events decoded on one thread are delivered in the order they were decoded.
//!   There is no ordering between threads.
//! - Once [`Dispatcher::close`] has returned, no callback runs for that session.
//!
//! # How the gate works (for beginners)
//!
//! A dispatcher has an `open` flag and a reader/writer lock.  Every delivery
//! takes a *read* lock for the duration of the callback, so any number of
//! deliveries can run at the same time.  `close` first clears the flag, so no
//! new delivery starts, then takes the *write* lock, which only succeeds once
//! every running callback has returned.
//!
//! A callback may itself call `Daemon::stop`.  Waiting for the write lock from
//! inside a callback would wait for ourselves forever, so every thread keeps a
//! stack of the dispatchers it is currently delivering for.  `close` skips the
//! wait only when its own dispatcher is on that stack; a callback of one
//! session that stops another session still waits for the other one.

use std::cell::RefCell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use spacemouse_core::{ButtonEvent, DeviceEvent, MotionEvent};
use tracing::{debug, error, warn};

/// Host callback for motion samples.
pub type MotionCallback = Arc<dyn Fn(MotionEvent) + Send + Sync>;
/// Host callback for button presses or releases.
pub type ButtonCallback = Arc<dyn Fn(ButtonEvent) + Send + Sync>;
/// Host callback for the one-time connection-lost notification.
pub type ConnectionLostCallback = Arc<dyn Fn() + Send + Sync>;

thread_local! {
    // Addresses of the dispatchers whose callbacks run on this thread, innermost last.
    static ACTIVE_DISPATCHERS: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

/// The callbacks the host registers at start.
///
/// The daemon only holds shared references; it never mutates them and never
/// calls them after the session that received them is stopped.
#[derive(Clone)]
pub struct CallbackSet {
    pub on_motion: MotionCallback,
    pub on_button_press: ButtonCallback,
    pub on_button_release: ButtonCallback,
    pub on_connection_lost: Option<ConnectionLostCallback>,
}

impl CallbackSet {
    /// Builds a set from the three mandatory callbacks.
    pub fn new(
        on_motion: impl Fn(MotionEvent) + Send + Sync + 'static,
        on_button_press: impl Fn(ButtonEvent) + Send + Sync + 'static,
        on_button_release: impl Fn(ButtonEvent) + Send + Sync + 'static,
    ) -> Self {
        Self {
            on_motion: Arc::new(on_motion),
            on_button_press: Arc::new(on_button_press),
            on_button_release: Arc::new(on_button_release),
            on_connection_lost: None,
        }
    }

    /// Adds the optional connection-lost callback.
    pub fn with_connection_lost(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_connection_lost = Some(Arc::new(callback));
        self
    }
}

impl fmt::Debug for CallbackSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackSet")
            .field("on_connection_lost", &self.on_connection_lost.is_some())
            .finish_non_exhaustive()
    }
}

/// Per-session delivery gate.
pub struct Dispatcher {
    callbacks: CallbackSet,
    open: AtomicBool,
    gate: RwLock<()>,
    lost_notified: AtomicBool,
    delivered: AtomicU64,
}

impl Dispatcher {
    pub fn new(callbacks: CallbackSet) -> Self {
        Self {
            callbacks,
            open: AtomicBool::new(true),
            gate: RwLock::new(()),
            lost_notified: AtomicBool::new(false),
            delivered: AtomicU64::new(0),
        }
    }

    /// Delivers one event to the matching callback.
    ///
    /// Returns `false` if the gate is closed and the event was discarded.
    pub fn dispatch(&self, event: DeviceEvent) -> bool {
        self.deliver(|| match event {
            DeviceEvent::Motion(motion) => (self.callbacks.on_motion)(motion),
            DeviceEvent::ButtonPress(button) => (self.callbacks.on_button_press)(button),
            DeviceEvent::ButtonRelease(button) => (self.callbacks.on_button_release)(button),
        })
    }

    /// Reports that the device connection ended on its own.
    ///
    /// Logs once and fires the optional host callback once per session.
    /// Returns `true` only for the call that actually notified.
    pub fn notify_connection_lost(&self) -> bool {
        if self.lost_notified.swap(true, Ordering::AcqRel) {
            return false;
        }
        if !self.is_open() {
            debug!("connection ended after the session was stopped");
            return false;
        }
        warn!("3D-mouse connection lost; call start() again to reconnect");
        match self.callbacks.on_connection_lost.clone() {
            Some(callback) => self.deliver(move || callback()),
            None => true,
        }
    }

    /// Closes the gate.
    ///
    /// After this returns no callback of this session is running or will run,
    /// except when called from inside one of its own callbacks, where the
    /// running callbacks cannot be waited for.
    pub fn close(&self) {
        self.open.store(false, Ordering::Release);
        if self.is_delivering_here() {
            debug!("dispatcher closed from inside a callback; not waiting for in-flight callbacks");
            return;
        }
        drop(self.gate.write().unwrap_or_else(PoisonError::into_inner));
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Number of callbacks invoked so far in this session.
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Returns `true` when the current thread is running a daemon callback of
    /// any session.
    pub fn in_callback() -> bool {
        ACTIVE_DISPATCHERS.with(|stack| !stack.borrow().is_empty())
    }

    fn key(&self) -> usize {
        self as *const Self as usize
    }

    /// `true` when this thread is inside one of this dispatcher's callbacks.
    fn is_delivering_here(&self) -> bool {
        let key = self.key();
        ACTIVE_DISPATCHERS.with(|stack| stack.borrow().contains(&key))
    }

    fn deliver(&self, invoke: impl FnOnce()) -> bool {
        if !self.is_open() {
            return false;
        }

        let nested = self.is_delivering_here();
        // A nested delivery already runs under this thread's read lock;
        // taking it again could deadlock behind a waiting close().
        let _guard = if nested {
            None
        } else {
            Some(self.gate.read().unwrap_or_else(PoisonError::into_inner))
        };
        if !self.is_open() {
            return false;
        }

        ACTIVE_DISPATCHERS.with(|stack| stack.borrow_mut().push(self.key()));
        let outcome = panic::catch_unwind(AssertUnwindSafe(invoke));
        ACTIVE_DISPATCHERS.with(|stack| {
            stack.borrow_mut().pop();
        });

        self.delivered.fetch_add(1, Ordering::Relaxed);
        if let Err(payload) = outcome {
            error!("3D-mouse callback panicked: {}", panic_message(payload.as_ref()));
        }
        true
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("open", &self.is_open())
            .field("delivered", &self.delivered())
            .field("lost_notified", &self.lost_notified.load(Ordering::Relaxed))
            .finish()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string panic payload>")
}

// ── Tests ─────────────────────────────────────────────────────────────────────
