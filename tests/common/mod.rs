//! Shared fixtures for the integration tests

#![allow(dead_code)]

use std::collections::HashMap;

use clod_terrain::clod::GridGeometry;
use clod_terrain::core::types::Vec3;
use clod_terrain::math::{ViewVolume, Visibility};
use clod_terrain::terrain::{HeightGrid, TerrainGenerator, TerrainParams};

/// Sees everything from a fixed eye
pub struct OpenSky {
    pub eye: Vec3,
}

impl ViewVolume for OpenSky {
    fn eye_position(&self) -> Vec3 {
        self.eye
    }

    fn classify_sphere(&self, _center: Vec3, _radius: f32) -> Visibility {
        Visibility::AllIn
    }
}

/// Sees nothing
pub struct Blind {
    pub eye: Vec3,
}

impl ViewVolume for Blind {
    fn eye_position(&self) -> Vec3 {
        self.eye
    }

    fn classify_sphere(&self, _center: Vec3, _radius: f32) -> Visibility {
        Visibility::Out
    }
}

/// Sees only the half-space `x <= max_x`
pub struct WestOf {
    pub eye: Vec3,
    pub max_x: f32,
}

impl ViewVolume for WestOf {
    fn eye_position(&self) -> Vec3 {
        self.eye
    }

    fn classify_sphere(&self, center: Vec3, radius: f32) -> Visibility {
        let dist = self.max_x - center.x;
        if dist < -radius {
            Visibility::Out
        } else if dist < radius {
            Visibility::PartiallyIn
        } else {
            Visibility::AllIn
        }
    }
}

/// Rolling fbm terrain of `(1 << power) + 1` samples
pub fn noise_grid(power: u32, spacing: f32) -> HeightGrid {
    TerrainGenerator::new(TerrainParams {
        scale: 40.0 * spacing,
        height_scale: 30.0,
        ..Default::default()
    })
    .generate_grid(power, spacing)
}

/// Twice the signed area of a leaf in grid units, positive when
/// counter-clockwise in (col, row)
pub fn doubled_area(geometry: &GridGeometry, tri: &[u32; 3]) -> i64 {
    let p = tri.map(|i| (geometry.col_of(i) as i64, geometry.row_of(i) as i64));
    (p[1].0 - p[0].0) * (p[2].1 - p[0].1) - (p[1].1 - p[0].1) * (p[2].0 - p[0].0)
}

/// Assert the leaves tile the grid exactly, with every interior edge shared
/// by two leaves and no T-junctions.
pub fn assert_conforming(geometry: &GridGeometry, leaves: &[[u32; 3]]) {
    let last = geometry.dim() - 1;
    let mut edges: HashMap<(u32, u32), u32> = HashMap::new();
    let mut area = 0i64;

    for tri in leaves {
        let a = doubled_area(geometry, tri);
        assert!(a > 0, "leaf {:?} is degenerate or wound clockwise", tri);
        area += a;
        for k in 0..3 {
            let (u, v) = (tri[k], tri[(k + 1) % 3]);
            *edges.entry((u.min(v), u.max(v))).or_insert(0) += 1;
        }
    }

    let n = last as i64;
    assert_eq!(area, 2 * n * n, "leaves do not cover the grid exactly");

    let on_boundary = |i: u32| {
        let (c, r) = (geometry.col_of(i), geometry.row_of(i));
        (c == 0 || c == last, r == 0 || r == last, c, r)
    };
    for (&(u, v), &count) in &edges {
        let (cu_edge, ru_edge, cu, ru) = on_boundary(u);
        let (cv_edge, rv_edge, cv, rv) = on_boundary(v);
        let boundary = (cu_edge && cv_edge && cu == cv) || (ru_edge && rv_edge && ru == rv);
        if boundary {
            assert_eq!(count, 1, "boundary edge ({}, {}) used {} times", u, v, count);
        } else {
            assert_eq!(count, 2, "interior edge ({}, {}) used {} times (crack)", u, v, count);
        }
    }
}
