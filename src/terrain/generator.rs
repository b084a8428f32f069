//! Noise-based procedural height grids

use noise::{Fbm, MultiFractal, NoiseFn, Perlin};
use rayon::prelude::*;

use super::height_grid::HeightGrid;

/// Parameters controlling terrain generation
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct TerrainParams {
    pub seed: u32,
    pub scale: f32,        // Horizontal scale (larger = smoother)
    pub height_scale: f32, // Vertical scale (max height)
    pub octaves: u32,      // FBM octaves (detail levels)
    pub persistence: f32,  // FBM persistence (0.5 typical)
    pub lacunarity: f32,   // FBM lacunarity (2.0 typical)
}

impl Default for TerrainParams {
    fn default() -> Self {
        Self {
            seed: 12345,
            scale: 100.0,
            height_scale: 64.0,
            octaves: 4,
            persistence: 0.5,
            lacunarity: 2.0,
        }
    }
}

/// Procedural terrain generator using fractal Brownian motion (FBM)
pub struct TerrainGenerator {
    params: TerrainParams,
    noise: Fbm<Perlin>,
}

impl TerrainGenerator {
    /// Create a new terrain generator with the given parameters
    pub fn new(params: TerrainParams) -> Self {
        let noise = Fbm::<Perlin>::new(params.seed)
            .set_octaves(params.octaves as usize)
            .set_persistence(params.persistence as f64)
            .set_lacunarity(params.lacunarity as f64);

        Self { params, noise }
    }

    /// Get terrain parameters
    pub fn params(&self) -> &TerrainParams {
        &self.params
    }

    /// Get terrain height at world position (x, z)
    pub fn height_at(&self, x: f32, z: f32) -> f32 {
        // Sample noise in normalized coordinates
        let nx = (x / self.params.scale) as f64;
        let nz = (z / self.params.scale) as f64;

        // Get noise value in range [-1, 1]
        let noise_value = self.noise.get([nx, nz]);

        // Map to height range [0, height_scale]
        let normalized = ((noise_value + 1.0) / 2.0).clamp(0.0, 1.0);
        (normalized * self.params.height_scale as f64) as f32
    }

    /// Sample a square grid of `(1 << n) + 1` heights, `spacing` world units apart.
    ///
    /// Rows are filled in parallel.
    pub fn generate_grid(&self, n: u32, spacing: f32) -> HeightGrid {
        let dim = (1usize << n) + 1;
        let mut heights = vec![0.0; dim * dim];

        heights
            .par_chunks_mut(dim)
            .enumerate()
            .for_each(|(row, samples)| {
                for (col, sample) in samples.iter_mut().enumerate() {
                    *sample = self.height_at(col as f32 * spacing, row as f32 * spacing);
                }
            });

        log::debug!("Generated {}x{} height grid (seed {})", dim, dim, self.params.seed);
        HeightGrid::from_vec(dim, dim, heights)
    }
}
