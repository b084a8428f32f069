//! Headless flythrough over a procedural terrain.
//!
//! Orbits a camera around the terrain, culls and renders every frame into a
//! fan buffer, and reports how the quality controller tracks the budget.
//!
//! Usage: cargo run --release --bin flythrough -- [OPTIONS]
//!
//! Options:
//!   --power <N>       Grid is (2^N + 1) samples per side (default: 10)
//!   --spacing <M>     Distance between samples in meters (default: 10.0)
//!   --seed <SEED>     Noise seed (default: 12345)
//!   --height <H>      Terrain height scale (default: 400.0)
//!   --target <TRIS>   Polygon target (default: 10000)
//!   --frames <N>      Frames to run (default: 600)
//!   --config <PATH>   Load LOD options from a JSON file
//!   --stats <PATH>    Write per-frame statistics as JSON

use std::path::PathBuf;
use std::time::Instant;

use serde_json::json;

use clod_terrain::clod::{GridExtents, LodConfig, SmTerrain, TriangleFans};
use clod_terrain::core::types::{Result, Vec3};
use clod_terrain::core::{logging, Camera};
use clod_terrain::terrain::{TerrainGenerator, TerrainParams};

fn main() {
    logging::init();

    if let Err(e) = run() {
        log::error!("Flythrough failed: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let power = parse_u32_arg(&args, "--power").unwrap_or(10);
    let spacing = parse_f32_arg(&args, "--spacing").unwrap_or(10.0);
    let seed = parse_u32_arg(&args, "--seed").unwrap_or(12345);
    let height_scale = parse_f32_arg(&args, "--height").unwrap_or(400.0);
    let target = parse_u32_arg(&args, "--target");
    let frames = parse_usize_arg(&args, "--frames").unwrap_or(600);
    let config_path = parse_str_arg(&args, "--config").map(PathBuf::from);
    let stats_path = parse_str_arg(&args, "--stats").map(PathBuf::from);

    let mut config = match &config_path {
        Some(path) => LodConfig::load(path)?,
        None => LodConfig::default(),
    };
    if let Some(target) = target {
        config.polygon_target = target;
    }

    let dim = (1usize << power) + 1;
    let size = (dim - 1) as f32 * spacing;

    println!("=== CLOD Flythrough ===");
    println!("Grid:   {}x{} ({}m x {}m)", dim, dim, size, size);
    println!("Seed:   {}, Height: {}", seed, height_scale);
    println!("Target: {} triangles", config.polygon_target);
    println!("Memory: {:.1} MB", SmTerrain::memory_required(power, &config) as f64 / (1024.0 * 1024.0));
    println!();

    let generator = TerrainGenerator::new(TerrainParams {
        seed,
        scale: size / 4.0,
        height_scale,
        ..Default::default()
    });
    let start = Instant::now();
    let grid = generator.generate_grid(power, spacing);
    log::info!("Generated heights in {:.2}s", start.elapsed().as_secs_f64());

    let start = Instant::now();
    let mut terrain = SmTerrain::new(&grid, GridExtents::from_spacing(dim, spacing), config)?;
    log::info!("Built terrain in {:.2}s", start.elapsed().as_secs_f64());

    let center = terrain.bounding_box().center();
    let radius = size * 0.35;
    let mut camera = Camera::new(center, 60.0, 16.0 / 9.0);
    let mut fans = TriangleFans::new();
    let mut history = Vec::with_capacity(frames);

    let start = Instant::now();
    for frame in 0..frames {
        let angle = frame as f32 / frames.max(1) as f32 * std::f32::consts::TAU;
        let x = center.x + radius * angle.cos();
        let z = center.z + radius * angle.sin();
        let ground = terrain.altitude_at(x, z).map_or(0.0, |s| s.altitude);
        camera.position = Vec3::new(x, ground + height_scale * 0.25, z);
        let ahead = Vec3::new(center.x + radius * (angle + 0.3).cos(), ground, center.z + radius * (angle + 0.3).sin());
        camera.point_at(ahead, Vec3::Y);

        fans.clear();
        let stats = terrain.frame(&camera.view_frustum(), &mut fans);
        if frame % 100 == 0 {
            println!(
                "  frame {:4}: {:6} tris in {:5} fans, quality {:.5}, pool {}/{}",
                frame, stats.drawn_triangles, stats.fans, stats.quality, stats.pool_used, stats.pool_capacity
            );
        }
        history.push(stats);
    }
    let elapsed = start.elapsed().as_secs_f64();

    let average = history.iter().map(|s| s.drawn_triangles as f64).sum::<f64>() / history.len().max(1) as f64;
    println!();
    println!("=== Done ===");
    println!("Frames:   {} in {:.2}s ({:.0} fps)", frames, elapsed, frames as f64 / elapsed.max(1e-9));
    println!("Average:  {:.0} triangles/frame (target {})", average, terrain.polygon_target());

    if let Some(path) = stats_path {
        let report = json!({
            "grid": dim,
            "spacing": spacing,
            "polygon_target": terrain.polygon_target(),
            "config": terrain.config(),
            "frames": history,
        });
        std::fs::write(&path, serde_json::to_string_pretty(&report)?)?;
        println!("Stats:    {}", path.display());
    }

    Ok(())
}

fn parse_f32_arg(args: &[String], flag: &str) -> Option<f32> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_u32_arg(args: &[String], flag: &str) -> Option<u32> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_usize_arg(args: &[String], flag: &str) -> Option<usize> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_str_arg(args: &[String], flag: &str) -> Option<String> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}
