mod common;

use clod_terrain::clod::{FeedbackMetric, GridExtents, LodConfig, SmTerrain, TriangleFans};
use clod_terrain::core::types::Vec3;

use common::{noise_grid, OpenSky};

fn run_frames(terrain: &mut SmTerrain, frames: usize) -> Vec<u32> {
    let view = OpenSky { eye: Vec3::new(64.0, 60.0, -64.0) };
    let mut fans = TriangleFans::new();
    (0..frames)
        .map(|_| {
            fans.clear();
            terrain.frame(&view, &mut fans).drawn_triangles
        })
        .collect()
}

fn converging_config(target: u32) -> LodConfig {
    LodConfig {
        polygon_target: target,
        quality_floor: 1e-6,
        ..Default::default()
    }
}

#[test]
fn test_converges_to_target() {
    let grid = noise_grid(7, 1.0);
    let mut terrain = SmTerrain::new(&grid, GridExtents::from_spacing(129, 1.0), converging_config(4000)).unwrap();

    let drawn = run_frames(&mut terrain, 300);
    for (i, &count) in drawn[250..].iter().enumerate() {
        assert!(
            (3600..=4400).contains(&count),
            "frame {}: drew {} triangles",
            250 + i,
            count
        );
    }
}

#[test]
fn test_retargets() {
    let grid = noise_grid(7, 1.0);
    let mut terrain = SmTerrain::new(&grid, GridExtents::from_spacing(129, 1.0), converging_config(4000)).unwrap();
    run_frames(&mut terrain, 200);
    let coarse_quality = terrain.quality_constant();

    terrain.set_polygon_target(8000);
    let drawn = run_frames(&mut terrain, 300);
    assert_eq!(terrain.pool_capacity(), 24_000);
    assert!(terrain.quality_constant() < coarse_quality);

    let last = *drawn.last().unwrap();
    assert!((7200..=8800).contains(&last), "drew {} triangles", last);
}

#[test]
fn test_pool_usage_feedback() {
    let grid = noise_grid(7, 1.0);
    let config = LodConfig {
        feedback: FeedbackMetric::PoolUsage,
        ..converging_config(4000)
    };
    let mut terrain = SmTerrain::new(&grid, GridExtents::from_spacing(129, 1.0), config).unwrap();
    run_frames(&mut terrain, 300);

    let half_pool = terrain.pool_used() / 2;
    assert!((3600..=4400).contains(&half_pool), "half pool {}", half_pool);
}

#[test]
fn test_quality_never_below_floor() {
    // flat ground can never reach the target
    let grid = clod_terrain::terrain::HeightGrid::with_power(5);
    let config = LodConfig { polygon_target: 5000, ..Default::default() };
    let mut terrain = SmTerrain::new(&grid, GridExtents::from_spacing(33, 1.0), config).unwrap();
    run_frames(&mut terrain, 400);
    assert_eq!(terrain.quality_constant(), 0.002);
}
