//! Application layer of the device daemon.
//!
//! # Sub-modules
//!
//! - **`daemon`** – The lifecycle manager.  Owns one backend, starts and stops
//!   sessions, and guarantees that a device handle is never open without an
//!   owner or closed twice.
//!
//! - **`dispatch`** – The callback contract.  One [`dispatch::Dispatcher`] per
//!   session delivers decoded events to the host's callbacks and acts as the
//!   gate that `stop` closes.
//!
//! Neither module makes OS calls; everything platform-specific sits behind the
//! `DeviceBackend` trait in the infrastructure layer.

pub mod daemon;
pub mod dispatch;
