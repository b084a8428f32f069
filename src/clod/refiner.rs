//! View-dependent adaptive splitting
//!
//! Walks the bintree top-down, culling against the view volume and splitting
//! leaves whose stored variance is large compared to their distance from the
//! eye. Descendants of a triangle found wholly inside the view skip further
//! frustum tests.

use super::block::{BlockGrid, BlockRoot};
use super::geometry::GridGeometry;
use super::pool::{TriId, TriPool};
use super::variance::VarianceTree;
use crate::core::types::Vec3;
use crate::math::{ViewVolume, Visibility};

/// Counters from one refinement pass
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RefineStats {
    /// Sphere classifications performed
    pub frustum_tests: u32,
    /// Splits the error test asked for but the pool had no room for
    pub refused_splits: u32,
}

/// Bintree level of node `num` (masters are level 2)
#[inline]
pub fn level_of(num: u32) -> u32 {
    32 - num.leading_zeros()
}

/// One frame of adaptive refinement over a seeded pool
pub struct Refiner<'a, V: ViewVolume + ?Sized> {
    geometry: &'a GridGeometry,
    variance: &'a VarianceTree,
    pool: &'a mut TriPool,
    view: &'a V,
    eye: Vec3,
    quality: f32,
    /// Nodes at or past this number do not descend
    split_cutoff: u32,
    stats: RefineStats,
}

impl<'a, V: ViewVolume + ?Sized> Refiner<'a, V> {
    pub fn new(
        geometry: &'a GridGeometry,
        variance: &'a VarianceTree,
        pool: &'a mut TriPool,
        view: &'a V,
        quality: f32,
    ) -> Self {
        Self {
            geometry,
            variance,
            pool,
            view,
            eye: view.eye_position(),
            quality,
            split_cutoff: 1 << (geometry.levels() - 2),
            stats: RefineStats::default(),
        }
    }

    /// Refine the whole tree starting at the two masters
    pub fn refine_tree(&mut self, masters: &[BlockRoot; 2]) {
        for master in masters {
            self.split_if_needed(master.num, master.tri, master.v0, master.v1, master.apex, false, 2);
        }
    }

    /// Refine each block root independently
    pub fn refine_blocks(&mut self, blocks: &BlockGrid) {
        for root in blocks.roots() {
            self.split_if_needed(root.num, root.tri, root.v0, root.v1, root.apex, false, level_of(root.num));
        }
    }

    pub fn stats(&self) -> RefineStats {
        self.stats
    }

    /// Whether node `num` needs more detail than it has
    fn wants_split(&self, num: u32, vc: u32, level: u32) -> bool {
        if !self.variance.is_stored(num) {
            return true;
        }
        let distance = self.eye.distance(self.geometry.world(vc));
        self.variance.variance(num) > (distance - self.geometry.hypotenuse(level)) * self.quality
    }

    #[allow(clippy::too_many_arguments)]
    fn split_if_needed(&mut self, num: u32, tri: TriId, v0: u32, v1: u32, apex: u32, mut all_in: bool, level: u32) {
        let vc = GridGeometry::midpoint(v0, v1);

        if all_in {
            self.pool.get_mut(tri).frustum = Visibility::AllIn;
        } else {
            self.stats.frustum_tests += 1;
            let center = self.geometry.world(vc);
            match self.view.classify_sphere(center, self.geometry.hypotenuse(level) / 2.0) {
                Visibility::AllIn => {
                    all_in = true;
                    self.pool.mark_all_in(tri);
                }
                Visibility::PartiallyIn => {
                    self.pool.get_mut(tri).frustum = Visibility::PartiallyIn;
                }
                Visibility::Out => {
                    self.pool.mark_out(tri);
                    return;
                }
            }
        }

        if self.pool.get(tri).is_leaf() && self.wants_split(num, vc, level) {
            if self.pool.can_split() {
                self.pool.split(tri);
            } else {
                self.stats.refused_splits += 1;
            }
        }

        let node = *self.pool.get(tri);
        if !node.is_leaf() && num < self.split_cutoff {
            self.split_if_needed(num << 1, node.left_child, apex, v0, vc, all_in, level + 1);
            self.split_if_needed((num << 1) + 1, node.right_child, v1, apex, vc, all_in, level + 1);
        }
    }
}
