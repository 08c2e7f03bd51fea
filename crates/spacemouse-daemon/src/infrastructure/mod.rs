//! Infrastructure layer of the device daemon.
//!
//! Contains the OS-facing adapters: one device backend per driver model, the
//! process-wide resource claims those backends take, and file-system storage
//! for the TOML configuration.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `spacemouse_core`; the application layer only reaches it through the
//! `DeviceBackend` trait and `native_backend`.

pub mod backend;
pub mod claim;
pub mod storage;
