//! Height data consumed by the CLOD engine

pub mod height_grid;
pub use height_grid::{HeightGrid, HeightSource};

pub mod generator;
pub use generator::{TerrainGenerator, TerrainParams};
