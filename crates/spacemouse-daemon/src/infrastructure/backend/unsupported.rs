//! Backend for platforms without 3D-mouse support.
//!
//! `open` always fails with [`DaemonError::UnsupportedPlatform`]; the host logs
//! it and carries on without 3D-mouse input.

use std::sync::Arc;

use super::{BackendKind, DeviceBackend};
use crate::application::daemon::DaemonError;
use crate::application::dispatch::Dispatcher;

#[derive(Debug, Clone)]
pub struct UnsupportedBackend {
    reason: String,
}

impl UnsupportedBackend {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl DeviceBackend for UnsupportedBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Unsupported
    }

    fn open(&mut self, _dispatcher: Arc<Dispatcher>) -> Result<(), DaemonError> {
        Err(DaemonError::UnsupportedPlatform(self.reason.clone()))
    }

    fn close(&mut self) {}

    fn is_alive(&self) -> bool {
        false
    }
}
