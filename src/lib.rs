//! Immersive 360° video view.
//!
//! An equirectangular video is painted onto the inside of a sphere and a
//! camera at the sphere's centre follows the device's motion sensor.

pub mod camera;
pub mod config;
pub mod gaze;
pub mod media;
pub mod mesh;
pub mod scene;
pub mod sensor;
pub mod video;
pub mod view;

pub use gaze::{map_gaze, AttitudeSample, ScreenRotation, ScreenRotationSource, SharedScreenRotation};
pub use view::{Video360View, ViewError, ViewFrame, ViewOptions, ViewServices};
