//! clod-terrain - Continuous level-of-detail terrain meshing
//!
//! Regular height grids are triangulated with a binary triangle tree that
//! is refined every frame against the camera and a triangle budget.

pub mod core;
pub mod math;
pub mod terrain;
pub mod clod;
