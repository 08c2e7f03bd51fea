//! spacemouse-tool library entry point.
//!
//! The consumer side of the 3D-mouse daemon: a camera controller that turns
//! device events into camera motion for a slicer-style host application.
//!
//! # Layers
//!
//! - **`application`** – [`CameraController`] (free and constrained orbit,
//!   preset views, fit-to-selection) and the [`SpaceMouseTool`] plugin glue.
//! - **`infrastructure`** – the host surface the controller drives
//!   ([`SceneHost`], [`HostCamera`]) and an in-memory headless host.

pub mod application;
pub mod infrastructure;

pub use application::camera_controller::{CameraController, ControllerSettings};
pub use application::tool::SpaceMouseTool;
pub use infrastructure::host::{BoundingBox, HostCamera, PresetRotation, SceneHost};
