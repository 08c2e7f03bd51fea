//! Blocking-read backend for the spacenavd UNIX socket (Linux).
//!
//! spacenavd is the open-source 3D-mouse driver daemon.  Clients connect to
//! its UNIX socket and receive one 32-byte frame per device event (see
//! `spacemouse_core::decode::spnav` for the layout).
//!
//! The backend owns one worker thread, `spacemouse-spnav`, which:
//!
//! 1. Reads from the socket with a bounded read timeout (default 100 ms).
//! 2. Reassembles whole frames, decodes them and dispatches each event.
//! 3. On each timeout checks the stop flag, so `close` never waits longer
//!    than one timeout.
//!
//! `close` additionally shuts the socket down, which wakes a blocked read
//! immediately.
//!
//! # Connection loss
//!
//! If spacenavd exits or the socket errors, the worker drops the socket and
//! its resource claim, marks the session dead, logs once and notifies the
//! host once, then exits.  Nothing reconnects automatically; the host may call
//! `start` again.

use std::io::{ErrorKind, Read};
use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use spacemouse_core::decode::spnav::{SpnavFrameBuffer, FRAME_SIZE};
use spacemouse_core::SpnavDecoder;
use tracing::{debug, error, info, warn};

use super::{BackendKind, DeviceBackend};
use crate::application::daemon::DaemonError;
use crate::application::dispatch::Dispatcher;
use crate::infrastructure::claim::ResourceClaim;
use crate::infrastructure::storage::config::DaemonConfig;

/// Socket spacenavd listens on unless configured otherwise.
pub const DEFAULT_SOCKET_PATH: &str = "/var/run/spnav.sock";
/// Environment variable overriding the socket path.
pub const SOCKET_ENV_VAR: &str = "SPNAV_SOCKET";

/// Connection settings for [`SpnavBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpnavSettings {
    pub socket_path: PathBuf,
    pub read_timeout: Duration,
}

impl SpnavSettings {
    /// Socket path from the config, then `SPNAV_SOCKET`, then the default.
    pub fn resolve(config: &DaemonConfig) -> Self {
        let socket_path = config
            .socket_path
            .clone()
            .or_else(|| std::env::var_os(SOCKET_ENV_VAR).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SOCKET_PATH));
        Self {
            socket_path,
            read_timeout: Duration::from_millis(config.read_timeout_ms.max(1)),
        }
    }
}

impl Default for SpnavSettings {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            read_timeout: Duration::from_millis(100),
        }
    }
}

struct Worker {
    handle: JoinHandle<()>,
    stop: Arc<AtomicBool>,
    alive: Arc<AtomicBool>,
    /// Clone of the worker's socket, used only to shut it down.
    shutdown: UnixStream,
}

/// spacenavd client backend.
pub struct SpnavBackend {
    settings: SpnavSettings,
    worker: Option<Worker>,
}

impl SpnavBackend {
    pub fn new(settings: SpnavSettings) -> Self {
        Self {
            settings,
            worker: None,
        }
    }

    pub fn settings(&self) -> &SpnavSettings {
        &self.settings
    }
}

impl DeviceBackend for SpnavBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::BlockingRead
    }

    fn open(&mut self, dispatcher: Arc<Dispatcher>) -> Result<(), DaemonError> {
        if self.worker.is_some() {
            return Err(DaemonError::AlreadyRunning);
        }

        let path = &self.settings.socket_path;
        let claim = ResourceClaim::acquire(path.display().to_string())
            .ok_or(DaemonError::AlreadyRunning)?;

        let unavailable = |what: &str, e: std::io::Error| {
            DaemonError::DeviceUnavailable(format!("{what} {}: {e}", path.display()))
        };
        let stream = UnixStream::connect(path)
            .map_err(|e| unavailable("cannot connect to spacenavd at", e))?;
        stream
            .set_read_timeout(Some(self.settings.read_timeout))
            .map_err(|e| unavailable("cannot set read timeout on", e))?;
        let shutdown = stream
            .try_clone()
            .map_err(|e| unavailable("cannot clone socket", e))?;

        let stop = Arc::new(AtomicBool::new(false));
        let alive = Arc::new(AtomicBool::new(true));
        let handle = {
            let (stop, alive) = (Arc::clone(&stop), Arc::clone(&alive));
            thread::Builder::new()
                .name("spacemouse-spnav".to_string())
                .spawn(move || read_loop(stream, claim, &dispatcher, &stop, &alive))
                .map_err(|e| DaemonError::DeviceUnavailable(format!("cannot spawn worker: {e}")))?
        };

        info!(socket = %path.display(), "connected to spacenavd");
        self.worker = Some(Worker {
            handle,
            stop,
            alive,
            shutdown,
        });
        Ok(())
    }

    fn close(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        worker.stop.store(true, Ordering::Release);
        // Wakes a read blocked in the worker; fails harmlessly if the worker
        // already dropped its end.
        let _ = worker.shutdown.shutdown(Shutdown::Both);

        if worker.handle.thread().id() == thread::current().id() {
            debug!("spnav backend closed from its own worker; not joining");
            return;
        }
        if worker.handle.join().is_err() {
            error!("spnav worker thread panicked");
        }
        debug!("spnav worker joined");
    }

    fn is_alive(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|w| w.alive.load(Ordering::Acquire))
    }
}

impl Drop for SpnavBackend {
    fn drop(&mut self) {
        self.close();
    }
}

/// The receive loop executed on the worker thread.
fn read_loop(
    mut stream: UnixStream,
    claim: ResourceClaim,
    dispatcher: &Dispatcher,
    stop: &AtomicBool,
    alive: &AtomicBool,
) {
    let mut decoder = SpnavDecoder::new();
    let mut frames = SpnavFrameBuffer::new();
    let mut buf = [0u8; FRAME_SIZE * 8];
    let mut lost: Option<String> = None;

    while !stop.load(Ordering::Acquire) {
        let n = match stream.read(&mut buf) {
            Ok(0) => {
                lost = Some("spacenavd closed the connection".to_string());
                break;
            }
            Ok(n) => n,
            Err(e) if is_timeout_error(&e) || e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                lost = Some(format!("spacenavd socket error: {e}"));
                break;
            }
        };

        frames.extend(&buf[..n]);
        while let Some(frame) = frames.next_frame() {
            match decoder.decode_frame(&frame) {
                Ok(event) => {
                    dispatcher.dispatch(event);
                }
                Err(e) => debug!("dropping spnav frame: {e}"),
            }
        }
    }

    // Released before notifying, so the host may start a new session from
    // inside the connection-lost callback.
    drop(stream);
    drop(claim);
    alive.store(false, Ordering::Release);

    // A shutdown from close() also ends the read with EOF; only an
    // unrequested end counts as a lost connection.
    match lost {
        Some(reason) if !stop.load(Ordering::Acquire) => {
            warn!("{reason}");
            dispatcher.notify_connection_lost();
        }
        _ => info!("spnav worker stopped"),
    }
}

/// Returns `true` for OS timeout / would-block errors that should be retried.
fn is_timeout_error(e: &std::io::Error) -> bool {
    matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
