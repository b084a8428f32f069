//! Core types and utilities shared by the terrain engine

pub mod types;
pub mod error;
pub mod logging;
pub mod camera;

pub use types::*;
pub use error::Error;
pub use camera::Camera;
