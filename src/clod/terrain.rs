//! The per-frame CLOD terrain engine

use serde::{Deserialize, Serialize};

use super::block::{BlockGrid, BlockRoot};
use super::config::{LodConfig, SplitStrategy, MIN_POLYGON_TARGET};
use super::emitter::{EmitStats, MeshEmitter, MeshSink};
use super::geometry::{GridExtents, GridGeometry, SurfaceSample};
use super::pool::{TriId, TriPool};
use super::quality::QualityController;
use super::refiner::Refiner;
use super::variance::VarianceTree;
use crate::core::types::{Result, Vec3};
use crate::math::{Aabb, ViewVolume, Visibility};
use crate::terrain::HeightSource;

/// What happened in the last cull and render
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameStats {
    /// Number of completed culls
    pub frame: u64,
    /// Quality constant used by the last cull
    pub quality: f32,
    pub drawn_triangles: u32,
    pub fans: u32,
    pub pool_used: usize,
    pub pool_capacity: usize,
    pub frustum_tests: u32,
    pub refused_splits: u32,
    pub visible_blocks: usize,
}

/// Regular-grid terrain with view-dependent level of detail.
///
/// Owns a copy of the heights, the variance tree, and a triangle pool that
/// is rebuilt from scratch by every cull.
///
/// # Example
/// ```
/// use clod_terrain::clod::{GridExtents, LodConfig, SmTerrain, TriangleFans};
/// use clod_terrain::core::Camera;
/// use clod_terrain::core::types::Vec3;
/// use clod_terrain::terrain::HeightGrid;
///
/// let grid = HeightGrid::from_fn(65, 65, |c, r| ((c * r) % 7) as f32);
/// let extents = GridExtents::from_spacing(65, 10.0);
/// let mut terrain = SmTerrain::new(&grid, extents, LodConfig::default()).unwrap();
///
/// let camera = Camera::look_at(Vec3::new(320.0, 200.0, 100.0), Vec3::new(320.0, 0.0, -320.0), Vec3::Y);
/// let mut fans = TriangleFans::new();
/// let stats = terrain.frame(&camera.view_frustum(), &mut fans);
/// assert_eq!(stats.drawn_triangles as usize, fans.triangle_count());
/// ```
pub struct SmTerrain {
    config: LodConfig,
    geometry: GridGeometry,
    variance: VarianceTree,
    pool: TriPool,
    blocks: BlockGrid,
    masters: [BlockRoot; 2],
    quality: QualityController,
    polygon_target: u32,
    cull_every_frame: bool,
    cull_requested: bool,
    stats: FrameStats,
    warned_margin: bool,
}

impl SmTerrain {
    /// Build a terrain from a square `(1 << n) + 1` height grid.
    ///
    /// # Arguments
    /// * `source` - Heights, read once
    /// * `extents` - World-space placement of the grid
    /// * `config` - Fixed engine options and initial runtime settings
    pub fn new<S>(source: &S, extents: GridExtents, config: LodConfig) -> Result<Self>
    where
        S: HeightSource + ?Sized,
    {
        let geometry = GridGeometry::from_source(source, extents, config.vertical_exag)?;
        let variance = VarianceTree::build(&geometry, config.variance_encoding, config.variance_depth);
        let blocks = BlockGrid::new(geometry.n(), config.block_size_log2);
        let polygon_target = config.polygon_target.max(MIN_POLYGON_TARGET);
        let pool = TriPool::new(
            TriPool::required_capacity(polygon_target, blocks.len(), geometry.levels()),
            geometry.levels(),
        );

        log::info!(
            "Created CLOD terrain: {}x{} grid, {} levels, {} blocks of {} cells, variance {} KB, pool {} KB",
            geometry.dim(),
            geometry.dim(),
            geometry.levels(),
            blocks.len(),
            1u32 << blocks.cells_log2(),
            variance.memory_bytes() / 1024,
            pool.memory_bytes() / 1024
        );

        let unseeded = BlockRoot { tri: 0, num: 2, v0: 0, v1: 0, apex: 0 };
        let mut terrain = Self {
            quality: QualityController::new(&config),
            cull_every_frame: config.cull_every_frame,
            config,
            geometry,
            variance,
            pool,
            blocks,
            masters: [unseeded, BlockRoot { num: 3, ..unseeded }],
            polygon_target,
            cull_requested: false,
            stats: FrameStats::default(),
            warned_margin: false,
        };
        terrain.reseed();
        Ok(terrain)
    }

    /// Bytes a terrain with grid power `n` would allocate under `config`
    pub fn memory_required(n: u32, config: &LodConfig) -> usize {
        let dim = (1usize << n) + 1;
        let blocks = BlockGrid::new(n, config.block_size_log2);
        let target = config.polygon_target.max(MIN_POLYGON_TARGET);
        let pool = TriPool::required_capacity(target, blocks.len(), 2 * n + 2);

        dim * dim * std::mem::size_of::<f32>()
            + VarianceTree::memory_required(n, config.variance_encoding, config.variance_depth)
            + pool * std::mem::size_of::<super::pool::BinTri>()
            + blocks.len() * std::mem::size_of::<super::block::Block>()
    }

    /// Bytes currently held by heights, variance, pool budget and blocks
    pub fn memory_bytes(&self) -> usize {
        std::mem::size_of_val(self.geometry.heights())
            + self.variance.memory_bytes()
            + self.pool.memory_bytes()
            + self.blocks.len() * std::mem::size_of::<super::block::Block>()
    }

    /// Empty the pool and rebuild the block partition from the two masters
    pub fn reseed(&mut self) {
        self.pool.reset();
        let a = self.pool.allocate();
        let b = self.pool.allocate();
        self.pool.get_mut(a).bottom_neighbor = b;
        self.pool.get_mut(b).bottom_neighbor = a;

        let [sw, nw, ne, se] = self.geometry.corners();
        self.masters = [
            BlockRoot { tri: a, num: 2, v0: sw, v1: ne, apex: nw },
            BlockRoot { tri: b, num: 3, v0: ne, v1: sw, apex: se },
        ];
        self.blocks.seed(&mut self.pool, &self.geometry, self.masters);
    }

    /// Refine the mesh for a view, unless culling is paused and no single
    /// cull was requested.
    pub fn cull<V: ViewVolume + ?Sized>(&mut self, view: &V) {
        if self.cull_every_frame || self.cull_requested {
            self.cull_requested = false;
            self.do_cull(view);
        }
    }

    /// Refine the mesh for a view unconditionally
    pub fn do_cull<V: ViewVolume + ?Sized>(&mut self, view: &V) {
        let required = TriPool::required_capacity(self.polygon_target, self.blocks.len(), self.geometry.levels());
        if required != self.pool.capacity() {
            self.pool.resize(required);
        }
        self.reseed();

        let quality = self.quality.adjust(self.polygon_target);
        let mut refiner = Refiner::new(&self.geometry, &self.variance, &mut self.pool, view, quality);
        match self.config.split_strategy {
            SplitStrategy::WholeTree => refiner.refine_tree(&self.masters),
            SplitStrategy::PerBlock => refiner.refine_blocks(&self.blocks),
        }
        let refine = refiner.stats();

        self.blocks.update_visibility(view, &self.geometry);

        if refine.refused_splits == 0 {
            self.warned_margin = false;
        } else if !self.warned_margin {
            log::warn!(
                "Triangle pool exhausted ({} of {}); raise the polygon target or the quality floor",
                self.pool.used(),
                self.pool.capacity()
            );
            self.warned_margin = true;
        }

        self.stats.frame += 1;
        self.stats.quality = quality;
        self.stats.pool_used = self.pool.used();
        self.stats.pool_capacity = self.pool.capacity();
        self.stats.frustum_tests = refine.frustum_tests;
        self.stats.refused_splits = refine.refused_splits;
        self.stats.visible_blocks = self.blocks.iter().filter(|b| b.visible != Visibility::Out).count();

        log::debug!(
            "Cull {}: quality {:.5}, {} tris in pool, {} frustum tests, {} visible blocks",
            self.stats.frame,
            quality,
            self.stats.pool_used,
            refine.frustum_tests,
            self.stats.visible_blocks
        );
    }

    /// Emit the current mesh into `sink` and feed the result back to the
    /// quality controller
    pub fn render<S: MeshSink + ?Sized>(&mut self, sink: &mut S) -> EmitStats {
        let mut emitter = MeshEmitter::new(&self.geometry, &self.pool, sink, self.config.emit_mode);
        for block in self.blocks.iter() {
            emitter.emit_block(block);
        }
        let emitted = emitter.stats();

        self.stats.drawn_triangles = emitted.drawn_triangles;
        self.stats.fans = emitted.fans;
        self.quality.record(emitted.drawn_triangles, self.pool.used());
        emitted
    }

    /// Cull then render
    pub fn frame<V, S>(&mut self, view: &V, sink: &mut S) -> FrameStats
    where
        V: ViewVolume + ?Sized,
        S: MeshSink + ?Sized,
    {
        self.cull(view);
        self.render(sink);
        self.stats
    }

    pub fn polygon_target(&self) -> u32 {
        self.polygon_target
    }

    /// Set the triangle budget. Values below [`MIN_POLYGON_TARGET`] are raised
    /// to it. The pool is resized at the next cull.
    pub fn set_polygon_target(&mut self, target: u32) {
        self.polygon_target = target.max(MIN_POLYGON_TARGET);
    }

    pub fn vertical_exag(&self) -> f32 {
        self.geometry.vertical_exag()
    }

    /// Scale heights of emitted vertices. Variance stays in raw height units.
    pub fn set_vertical_exag(&mut self, exag: f32) {
        self.geometry.set_vertical_exag(exag);
    }

    pub fn quality_constant(&self) -> f32 {
        self.quality.constant()
    }

    pub fn set_quality_constant(&mut self, quality: f32) {
        self.quality.set_constant(quality);
    }

    /// Triangles emitted by the last render
    pub fn drawn_triangles(&self) -> u32 {
        self.stats.drawn_triangles
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    pub fn cull_every_frame(&self) -> bool {
        self.cull_every_frame
    }

    /// With culling paused the last mesh is kept and re-rendered
    pub fn set_cull_every_frame(&mut self, enabled: bool) {
        self.cull_every_frame = enabled;
    }

    /// Request a single cull while culling is paused
    pub fn cull_once(&mut self) {
        self.cull_requested = true;
    }

    /// Every leaf of the current triangulation as `(v0, v1, apex)` grid
    /// indices, including leaves outside the view
    pub fn leaf_triangles(&self) -> Vec<[u32; 3]> {
        let mut leaves = Vec::new();
        for root in self.blocks.roots() {
            self.collect_leaves(root.tri, root.v0, root.v1, root.apex, &mut leaves);
        }
        leaves
    }

    fn collect_leaves(&self, id: TriId, v0: u32, v1: u32, apex: u32, out: &mut Vec<[u32; 3]>) {
        let tri = self.pool.get(id);
        if tri.is_leaf() {
            out.push([v0, v1, apex]);
            return;
        }
        let vc = GridGeometry::midpoint(v0, v1);
        self.collect_leaves(tri.left_child, apex, v0, vc, out);
        self.collect_leaves(tri.right_child, v1, apex, vc, out);
    }

    /// Height at a grid position. `true_elevation` skips the vertical exaggeration.
    pub fn elevation(&self, col: usize, row: usize, true_elevation: bool) -> f32 {
        self.geometry.elevation(col, row, true_elevation)
    }

    /// World position of a grid position
    pub fn world_location(&self, col: usize, row: usize) -> Vec3 {
        self.geometry.world_location(col, row)
    }

    /// Altitude and normal of the full-resolution surface, `None` off the grid
    pub fn altitude_at(&self, x: f32, z: f32) -> Option<SurfaceSample> {
        self.geometry.sample_surface(x, z)
    }

    pub fn bounding_box(&self) -> Aabb {
        self.geometry.bounding_box()
    }

    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    pub fn config(&self) -> &LodConfig {
        &self.config
    }

    pub fn blocks(&self) -> &BlockGrid {
        &self.blocks
    }

    pub fn pool_used(&self) -> usize {
        self.pool.used()
    }

    pub fn pool_capacity(&self) -> usize {
        self.pool.capacity()
    }
}
