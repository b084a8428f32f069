//! Grid layout and world-space placement of height samples
//!
//! Vertices are addressed by a single linear grid index,
//! `index = row * dim + col`, exactly as the height array is stored. Triangle
//! corners are passed down the recursion as indices and only turned into
//! world positions when a frustum test, distance test, or emitted vertex
//! needs one.
//!
//! Columns advance east (+X). Rows advance north, which is -Z in world space.

use std::f32::consts::FRAC_1_SQRT_2;

use crate::core::error::Error;
use crate::core::types::{Result, Vec3};
use crate::math::Aabb;
use crate::terrain::HeightSource;

/// Largest supported grid power; `(1 << 14) + 1` samples per side.
pub const MAX_GRID_POWER: u32 = 14;

/// Returns `n` when `dim == (1 << n) + 1` for some `n >= 1`.
pub fn power_of_two_plus_one(dim: usize) -> Option<u32> {
    if dim < 3 || !(dim - 1).is_power_of_two() {
        return None;
    }
    Some((dim - 1).trailing_zeros())
}

/// World-space placement of a height grid
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GridExtents {
    /// World X of column 0
    pub left: f32,
    /// World Z of row 0
    pub south: f32,
    /// Extent along +X
    pub width: f32,
    /// Extent along -Z
    pub depth: f32,
}

impl GridExtents {
    pub fn new(left: f32, south: f32, width: f32, depth: f32) -> Self {
        Self { left, south, width, depth }
    }

    /// Extents for a grid of `dim` samples placed `spacing` apart, with
    /// column 0 / row 0 at the world origin
    pub fn from_spacing(dim: usize, spacing: f32) -> Self {
        let size = (dim.saturating_sub(1)) as f32 * spacing;
        Self::new(0.0, 0.0, size, size)
    }

    fn is_empty(&self) -> bool {
        self.width.abs() < 1e-6 || self.depth.abs() < 1e-6
    }
}

/// Altitude and surface normal at a world XZ location
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceSample {
    pub altitude: f32,
    pub normal: Vec3,
}

/// Grid dimensions, height samples, and the lookup tables used to place them
#[derive(Clone, Debug)]
pub struct GridGeometry {
    n: u32,
    dim: usize,
    levels: u32,
    heights: Vec<f32>,
    min_height: f32,
    max_height: f32,
    extents: GridExtents,
    step_x: f32,
    step_z: f32,
    x_lookup: Vec<f32>,
    z_lookup: Vec<f32>,
    /// Hypotenuse length per bintree level (1-based, level 2 = whole diagonal)
    hypotenuse: Vec<f32>,
    vertical_exag: f32,
}

impl GridGeometry {
    /// Validate a height source and copy its samples.
    pub fn from_source<S>(source: &S, extents: GridExtents, vertical_exag: f32) -> Result<Self>
    where
        S: HeightSource + ?Sized,
    {
        if extents.is_empty() {
            return Err(Error::EmptyExtents);
        }

        let (cols, rows) = source.size();
        if cols != rows {
            return Err(Error::NotSquare { cols, rows });
        }
        let n = power_of_two_plus_one(cols).ok_or(Error::NotPowerOfTwoPlusOne(cols))?;
        if n > MAX_GRID_POWER {
            return Err(Error::TooLarge(cols));
        }

        let dim = cols;
        let mut heights = Vec::with_capacity(dim * dim);
        let mut min_height = f32::INFINITY;
        let mut max_height = f32::NEG_INFINITY;
        for row in 0..dim {
            for col in 0..dim {
                let h = source.height(col, row);
                min_height = min_height.min(h);
                max_height = max_height.max(h);
                heights.push(h);
            }
        }

        let step_x = extents.width / (dim - 1) as f32;
        let step_z = extents.depth / (dim - 1) as f32;
        let x_lookup = (0..dim).map(|i| extents.left + i as f32 * step_x).collect();
        let z_lookup = (0..dim).map(|i| extents.south - i as f32 * step_z).collect();

        // the triangle bintree has (2n + 2) levels, numbered from 1
        let levels = 2 * n + 2;
        let diagonal = (extents.width * extents.width + extents.depth * extents.depth).sqrt();
        let hypotenuse = (0..=levels)
            .map(|level| diagonal * FRAC_1_SQRT_2.powi(level as i32 - 2))
            .collect();

        Ok(Self {
            n,
            dim,
            levels,
            heights,
            min_height,
            max_height,
            extents,
            step_x,
            step_z,
            x_lookup,
            z_lookup,
            hypotenuse,
            vertical_exag,
        })
    }

    /// The power of two defining the grid
    pub fn n(&self) -> u32 {
        self.n
    }

    /// Samples per side
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of levels in the triangle bintree
    pub fn levels(&self) -> u32 {
        self.levels
    }

    pub fn extents(&self) -> GridExtents {
        self.extents
    }

    /// Raw height samples, row-major
    pub fn heights(&self) -> &[f32] {
        &self.heights
    }

    /// Linear index of a grid position
    #[inline]
    pub fn offset(&self, col: usize, row: usize) -> u32 {
        (row * self.dim + col) as u32
    }

    #[inline]
    pub fn col_of(&self, index: u32) -> usize {
        index as usize % self.dim
    }

    #[inline]
    pub fn row_of(&self, index: u32) -> usize {
        index as usize / self.dim
    }

    /// Midpoint of a hypotenuse. Exact because both ends always sit on
    /// grid points an even number of cells apart along each axis.
    #[inline]
    pub fn midpoint(v0: u32, v1: u32) -> u32 {
        (v0 + v1) >> 1
    }

    /// South-west, north-west, north-east and south-east corner indices
    pub fn corners(&self) -> [u32; 4] {
        let last = self.dim - 1;
        [
            self.offset(0, 0),
            self.offset(0, last),
            self.offset(last, last),
            self.offset(last, 0),
        ]
    }

    /// World position of a grid index with the current exaggeration applied
    #[inline]
    pub fn world(&self, index: u32) -> Vec3 {
        let i = index as usize;
        Vec3::new(
            self.x_lookup[i % self.dim],
            self.heights[i] * self.vertical_exag,
            self.z_lookup[i / self.dim],
        )
    }

    /// Hypotenuse length of a triangle at the given bintree level
    #[inline]
    pub fn hypotenuse(&self, level: u32) -> f32 {
        self.hypotenuse[level.min(self.levels) as usize]
    }

    pub fn vertical_exag(&self) -> f32 {
        self.vertical_exag
    }

    pub fn set_vertical_exag(&mut self, exag: f32) {
        self.vertical_exag = exag;
    }

    fn clamp_position(&self, col: usize, row: usize) -> (usize, usize) {
        debug_assert!(
            col < self.dim && row < self.dim,
            "grid position ({}, {}) outside {}x{} grid",
            col, row, self.dim, self.dim
        );
        (col.min(self.dim - 1), row.min(self.dim - 1))
    }

    /// Height at a grid position. `true_elevation` skips the vertical exaggeration.
    pub fn elevation(&self, col: usize, row: usize, true_elevation: bool) -> f32 {
        let (col, row) = self.clamp_position(col, row);
        let h = self.heights[row * self.dim + col];
        if true_elevation { h } else { h * self.vertical_exag }
    }

    /// World position of a grid position
    pub fn world_location(&self, col: usize, row: usize) -> Vec3 {
        let (col, row) = self.clamp_position(col, row);
        self.world(self.offset(col, row))
    }

    /// World-space bounds of the surface with the current exaggeration
    pub fn bounding_box(&self) -> Aabb {
        let e = &self.extents;
        let lo = self.min_height * self.vertical_exag;
        let hi = self.max_height * self.vertical_exag;
        Aabb::from_corners(
            Vec3::new(e.left, lo, e.south),
            Vec3::new(e.left + e.width, hi, e.south - e.depth),
        )
    }

    /// Altitude and normal of the full-resolution surface at world (x, z).
    ///
    /// Each grid cell is split along the diagonal chosen by the parity of
    /// `col + row`. Points exactly on the east or north edge are accepted
    /// without interpolation. Points outside the grid return `None`.
    pub fn sample_surface(&self, x: f32, z: f32) -> Option<SurfaceSample> {
        let e = &self.extents;
        let fx_grid = (x - e.left) / self.step_x;
        let fz_grid = (e.south - z) / self.step_z;
        if !fx_grid.is_finite() || !fz_grid.is_finite() {
            return None;
        }
        let ix = fx_grid.floor() as i64;
        let iz = fz_grid.floor() as i64;
        let last = (self.dim - 1) as i64;

        if ix < 0 || ix > last || iz < 0 || iz > last {
            return None;
        }
        if ix == last || iz == last {
            let on_edge = x == e.left + e.width || z == e.south - e.depth;
            if !on_edge {
                return None;
            }
            return Some(SurfaceSample {
                altitude: self.elevation(ix as usize, iz as usize, false),
                normal: Vec3::Y,
            });
        }

        let (ix, iz) = (ix as usize, iz as usize);
        let p0 = self.world_location(ix, iz);
        let p1 = self.world_location(ix + 1, iz);
        let p2 = self.world_location(ix + 1, iz + 1);
        let p3 = self.world_location(ix, iz + 1);

        // fractional position across the cell
        let fx = fx_grid - ix as f32;
        let fz = fz_grid - iz as f32;

        let (altitude, normal) = if (ix + iz) & 1 == 1 {
            // diagonal runs p1-p3
            if fx + fz < 1.0 {
                (p0.y + fx * (p1.y - p0.y) + fz * (p3.y - p0.y), unit_normal(p0, p1, p3))
            } else {
                (p2.y + (1.0 - fx) * (p3.y - p2.y) + (1.0 - fz) * (p1.y - p2.y), unit_normal(p2, p3, p1))
            }
        } else if fx > fz {
            // diagonal runs p0-p2
            (p0.y + fx * (p1.y - p0.y) + fz * (p2.y - p1.y), unit_normal(p1, p2, p0))
        } else {
            (p0.y + fx * (p2.y - p3.y) + fz * (p3.y - p0.y), unit_normal(p3, p0, p2))
        };

        Some(SurfaceSample { altitude, normal })
    }
}

/// Upward-facing unit normal of a triangle
fn unit_normal(a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    let n = (b - a).cross(c - a).normalize_or(Vec3::Y);
    if n.y < 0.0 { -n } else { n }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::HeightGrid;

    fn ramp(n: u32) -> GridGeometry {
        let dim = (1usize << n) + 1;
        let grid = HeightGrid::from_fn(dim, dim, |col, _| col as f32);
        GridGeometry::from_source(&grid, GridExtents::from_spacing(dim, 2.0), 1.0).unwrap()
    }

    #[test]
    fn test_power_of_two_plus_one() {
        assert_eq!(power_of_two_plus_one(3), Some(1));
        assert_eq!(power_of_two_plus_one(5), Some(2));
        assert_eq!(power_of_two_plus_one(1025), Some(10));
        assert_eq!(power_of_two_plus_one(1024), None);
        assert_eq!(power_of_two_plus_one(2), None);
        assert_eq!(power_of_two_plus_one(0), None);
    }

    #[test]
    fn test_rejects_bad_grids() {
        let extents = GridExtents::new(0.0, 0.0, 10.0, 10.0);
        assert!(matches!(
            GridGeometry::from_source(&HeightGrid::new(5, 9), extents, 1.0),
            Err(Error::NotSquare { cols: 5, rows: 9 })
        ));
        assert!(matches!(
            GridGeometry::from_source(&HeightGrid::new(6, 6), extents, 1.0),
            Err(Error::NotPowerOfTwoPlusOne(6))
        ));
        assert!(matches!(
            GridGeometry::from_source(&HeightGrid::new(5, 5), GridExtents::new(0.0, 0.0, 0.0, 10.0), 1.0),
            Err(Error::EmptyExtents)
        ));
    }

    #[test]
    fn test_corners_and_midpoint() {
        let geometry = ramp(2);
        let [sw, nw, ne, se] = geometry.corners();
        assert_eq!((sw, nw, ne, se), (0, 20, 24, 4));
        // centre of the grid
        assert_eq!(GridGeometry::midpoint(sw, ne), 12);
        assert_eq!(GridGeometry::midpoint(nw, se), 12);
        assert_eq!((geometry.col_of(12), geometry.row_of(12)), (2, 2));
    }

    #[test]
    fn test_world_placement() {
        let mut geometry = ramp(2);
        // col 3, row 1: x = 6, height = 3, rows run toward -Z
        assert_eq!(geometry.world(geometry.offset(3, 1)), Vec3::new(6.0, 3.0, -2.0));

        geometry.set_vertical_exag(2.0);
        assert_eq!(geometry.world_location(3, 1), Vec3::new(6.0, 6.0, -2.0));
        assert_eq!(geometry.elevation(3, 1, true), 3.0);
        assert_eq!(geometry.elevation(3, 1, false), 6.0);
    }

    #[test]
    fn test_hypotenuse_table() {
        let geometry = ramp(2);
        let diagonal = (8.0f32 * 8.0 * 2.0).sqrt();
        assert!((geometry.hypotenuse(2) - diagonal).abs() < 1e-4);
        // two levels down the hypotenuse halves
        assert!((geometry.hypotenuse(4) - diagonal / 2.0).abs() < 1e-4);
        assert_eq!(geometry.levels(), 6);
    }

    #[test]
    fn test_bounding_box() {
        let geometry = ramp(2);
        let bounds = geometry.bounding_box();
        assert_eq!(bounds.min, Vec3::new(0.0, 0.0, -8.0));
        assert_eq!(bounds.max, Vec3::new(8.0, 4.0, 0.0));
    }

    #[test]
    fn test_sample_surface_on_plane() {
        // height = col, so altitude = x / spacing everywhere
        let geometry = ramp(2);
        let sample = geometry.sample_surface(3.0, -5.0).unwrap();
        assert!((sample.altitude - 1.5).abs() < 1e-5);
        assert!(sample.normal.y > 0.0);
        let expected = Vec3::new(-1.0, 2.0, 0.0).normalize();
        assert!((sample.normal - expected).length() < 1e-4);
    }

    #[test]
    fn test_sample_surface_edges() {
        let geometry = ramp(2);
        assert!(geometry.sample_surface(-0.5, -1.0).is_none());
        assert!(geometry.sample_surface(1.0, 0.5).is_none());
        assert!(geometry.sample_surface(8.5, -1.0).is_none());

        // exactly on the east edge
        let edge = geometry.sample_surface(8.0, -4.0).unwrap();
        assert_eq!(edge.altitude, 4.0);
        assert_eq!(edge.normal, Vec3::Y);
    }
}
