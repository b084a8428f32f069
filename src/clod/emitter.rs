//! Turning the refined bintree into triangle fans
//!
//! Leaves are visited depth-first with the child order swapped at every
//! level, which puts neighboring leaves around a shared vertex next to each
//! other. A leaf that shares the fan's centre and last vertex extends the
//! fan by one vertex; anything else flushes it and starts a new one.
//!
//! Every triangle comes out with the same winding, counter-clockwise when
//! seen from above.

use bytemuck::{Pod, Zeroable};

use super::block::{Block, BlockRoot};
use super::config::EmitMode;
use super::geometry::GridGeometry;
use super::pool::{TriId, TriPool};
use crate::core::types::Vec3;
use crate::math::Visibility;

/// Receiver of emitted geometry.
///
/// Each call delivers one triangle fan: the first vertex is the centre and
/// every further vertex closes one more triangle. In
/// [`EmitMode::Triangles`] every fan holds exactly three vertices.
pub trait MeshSink {
    fn fan(&mut self, vertices: &[Vec3]);
}

/// Vertex layout of [`TriangleFans`], ready for upload
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct TerrainVertex {
    pub position: [f32; 3],
}

impl From<Vec3> for TerrainVertex {
    fn from(v: Vec3) -> Self {
        Self { position: v.to_array() }
    }
}

/// A [`MeshSink`] that keeps every fan in one flat vertex buffer
#[derive(Clone, Debug, Default)]
pub struct TriangleFans {
    vertices: Vec<TerrainVertex>,
    /// Start of each fan in `vertices`
    starts: Vec<u32>,
}

impl TriangleFans {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
        self.starts.clear();
    }

    pub fn fan_count(&self) -> usize {
        self.starts.len()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn vertices(&self) -> &[TerrainVertex] {
        &self.vertices
    }

    /// Raw vertex bytes
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Vertices of fan `index`
    pub fn fan_vertices(&self, index: usize) -> &[TerrainVertex] {
        let start = self.starts[index] as usize;
        let end = self
            .starts
            .get(index + 1)
            .map_or(self.vertices.len(), |&s| s as usize);
        &self.vertices[start..end]
    }

    pub fn triangle_count(&self) -> usize {
        (0..self.fan_count())
            .map(|i| self.fan_vertices(i).len() - 2)
            .sum()
    }

    /// Every triangle as three positions
    pub fn triangles(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        (0..self.fan_count()).flat_map(move |i| {
            let fan = self.fan_vertices(i);
            let centre = Vec3::from_array(fan[0].position);
            fan[1..].windows(2).map(move |pair| {
                [
                    centre,
                    Vec3::from_array(pair[0].position),
                    Vec3::from_array(pair[1].position),
                ]
            })
        })
    }
}

impl MeshSink for TriangleFans {
    fn fan(&mut self, vertices: &[Vec3]) {
        self.starts.push(self.vertices.len() as u32);
        self.vertices.extend(vertices.iter().map(|&v| TerrainVertex::from(v)));
    }
}

/// Counters from one emission pass
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct EmitStats {
    pub drawn_triangles: u32,
    pub fans: u32,
}

/// Walks visible blocks and streams their leaves into a [`MeshSink`]
pub struct MeshEmitter<'a, S: MeshSink + ?Sized> {
    geometry: &'a GridGeometry,
    pool: &'a TriPool,
    sink: &'a mut S,
    mode: EmitMode,
    /// Grid indices of the fan being built
    fan: Vec<u32>,
    positions: Vec<Vec3>,
    stats: EmitStats,
}

impl<'a, S: MeshSink + ?Sized> MeshEmitter<'a, S> {
    pub fn new(geometry: &'a GridGeometry, pool: &'a TriPool, sink: &'a mut S, mode: EmitMode) -> Self {
        Self {
            geometry,
            pool,
            sink,
            mode,
            fan: Vec::with_capacity(16),
            positions: Vec::with_capacity(16),
            stats: EmitStats::default(),
        }
    }

    /// Emit both roots of a block. Fans never span blocks.
    pub fn emit_block(&mut self, block: &Block) {
        if block.visible == Visibility::Out {
            return;
        }
        for root in block.roots.iter().flatten() {
            self.emit_root(root);
        }
        self.flush();
    }

    fn emit_root(&mut self, root: &BlockRoot) {
        self.walk(root.tri, root.v0, root.v1, root.apex, true, false);
    }

    pub fn stats(&self) -> EmitStats {
        self.stats
    }

    fn walk(&mut self, id: TriId, v0: u32, v1: u32, apex: u32, even: bool, right: bool) {
        let tri = *self.pool.get(id);
        if tri.frustum == Visibility::Out {
            return;
        }

        if !tri.is_leaf() {
            let vc = GridGeometry::midpoint(v0, v1);
            if even {
                self.walk(tri.right_child, v1, apex, vc, !even, true);
                self.walk(tri.left_child, apex, v0, vc, !even, false);
            } else {
                self.walk(tri.left_child, apex, v0, vc, !even, false);
                self.walk(tri.right_child, v1, apex, vc, !even, true);
            }
            return;
        }

        self.stats.drawn_triangles += 1;
        match self.mode {
            EmitMode::Triangles => {
                self.fan.extend_from_slice(&[v0, v1, apex]);
                self.flush();
            }
            EmitMode::Fans => self.add_to_fan(v0, v1, apex, right),
        }
    }

    fn add_to_fan(&mut self, v0: u32, v1: u32, apex: u32, right: bool) {
        if let (Some(&start), Some(&last)) = (self.fan.first(), self.fan.last()) {
            if apex == start && v0 == last {
                self.fan.push(v1);
                return;
            }
            if v0 == start && v1 == last {
                self.fan.push(apex);
                return;
            }
            if v1 == start && apex == last {
                self.fan.push(v0);
                return;
            }
        }

        self.flush();
        if right {
            self.fan.extend_from_slice(&[apex, v0, v1]);
        } else {
            self.fan.extend_from_slice(&[v0, v1, apex]);
        }
    }

    fn flush(&mut self) {
        if self.fan.len() < 3 {
            self.fan.clear();
            return;
        }
        self.positions.clear();
        self.positions.extend(self.fan.iter().map(|&i| self.geometry.world(i)));
        self.sink.fan(&self.positions);
        self.stats.fans += 1;
        self.fan.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clod::geometry::GridExtents;
    use crate::terrain::HeightGrid;

    fn diamond() -> (GridGeometry, TriPool, Block) {
        let grid = HeightGrid::with_power(2);
        let geometry = GridGeometry::from_source(&grid, GridExtents::from_spacing(5, 1.0), 1.0).unwrap();
        let mut pool = TriPool::new(1000, geometry.levels());
        let a = pool.allocate();
        let b = pool.allocate();
        pool.get_mut(a).bottom_neighbor = b;
        pool.get_mut(b).bottom_neighbor = a;
        pool.split(a);

        let [sw, nw, ne, se] = geometry.corners();
        let block = Block {
            roots: [
                Some(BlockRoot { tri: a, num: 2, v0: sw, v1: ne, apex: nw }),
                Some(BlockRoot { tri: b, num: 3, v0: ne, v1: sw, apex: se }),
            ],
            visible: Visibility::AllIn,
        };
        (geometry, pool, block)
    }

    /// Doubled signed area in the (x, -z) plane
    fn signed_area(t: &[Vec3; 3]) -> f32 {
        let (ax, az) = (t[1].x - t[0].x, -(t[1].z - t[0].z));
        let (bx, bz) = (t[2].x - t[0].x, -(t[2].z - t[0].z));
        ax * bz - az * bx
    }

    #[test]
    fn test_diamond_is_one_fan() {
        let (geometry, pool, block) = diamond();
        let mut fans = TriangleFans::new();
        let mut emitter = MeshEmitter::new(&geometry, &pool, &mut fans, EmitMode::Fans);
        emitter.emit_block(&block);
        let stats = emitter.stats();

        assert_eq!(stats.drawn_triangles, 4);
        assert_eq!(stats.fans, 1);
        assert_eq!(fans.fan_count(), 1);
        assert_eq!(fans.vertex_count(), 6);
        // the fan centre is the middle of the grid
        assert_eq!(fans.vertices()[0].position, [2.0, 0.0, -2.0]);
        assert_eq!(fans.triangle_count(), 4);
    }

    #[test]
    fn test_consistent_winding() {
        let (geometry, pool, block) = diamond();
        for mode in [EmitMode::Fans, EmitMode::Triangles] {
            let mut fans = TriangleFans::new();
            MeshEmitter::new(&geometry, &pool, &mut fans, mode).emit_block(&block);
            let mut area = 0.0;
            for tri in fans.triangles() {
                let a = signed_area(&tri);
                assert!(a > 0.0, "{:?} wound clockwise in {:?} mode", tri, mode);
                area += a;
            }
            // 4x4 grid, doubled
            assert_eq!(area, 32.0);
        }
    }

    #[test]
    fn test_triangle_mode() {
        let (geometry, pool, block) = diamond();
        let mut fans = TriangleFans::new();
        let mut emitter = MeshEmitter::new(&geometry, &pool, &mut fans, EmitMode::Triangles);
        emitter.emit_block(&block);

        assert_eq!(emitter.stats().drawn_triangles, 4);
        assert_eq!(fans.fan_count(), 4);
        assert_eq!(fans.vertex_count(), 12);
    }

    #[test]
    fn test_out_subtree_skipped() {
        let (geometry, mut pool, block) = diamond();
        let hidden = pool.get(0).right_child;
        pool.get_mut(hidden).frustum = Visibility::Out;

        let mut fans = TriangleFans::new();
        let mut emitter = MeshEmitter::new(&geometry, &pool, &mut fans, EmitMode::Fans);
        emitter.emit_block(&block);
        assert_eq!(emitter.stats().drawn_triangles, 3);
        assert_eq!(fans.triangle_count(), 3);
    }

    #[test]
    fn test_out_block_skipped() {
        let (geometry, pool, mut block) = diamond();
        block.visible = Visibility::Out;

        let mut fans = TriangleFans::new();
        let mut emitter = MeshEmitter::new(&geometry, &pool, &mut fans, EmitMode::Fans);
        emitter.emit_block(&block);
        assert_eq!(emitter.stats().drawn_triangles, 0);
        assert_eq!(fans.fan_count(), 0);
    }

    #[test]
    fn test_vertex_bytes() {
        let (geometry, pool, block) = diamond();
        let mut fans = TriangleFans::new();
        MeshEmitter::new(&geometry, &pool, &mut fans, EmitMode::Fans).emit_block(&block);
        assert_eq!(fans.as_bytes().len(), fans.vertex_count() * 12);
        fans.clear();
        assert_eq!(fans.vertex_count(), 0);
    }
}
