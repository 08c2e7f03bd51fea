pub mod camera_controller;
pub mod tool;
