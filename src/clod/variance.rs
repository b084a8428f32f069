//! Implicit binary tree of per-triangle height error
//!
//! Node `num` has children `2 * num` and `2 * num + 1`; the two master
//! triangles are nodes 2 and 3 at level 2. Each node stores the largest
//! error found anywhere in its subtree, so a coarse triangle is only kept
//! when none of its descendants would add visible detail.

use super::config::{VarianceDepth, VarianceEncoding};
use super::fp8;
use super::geometry::GridGeometry;

/// Fixed-point scale applied before 8-bit encoding
const FP8_SCALE: f32 = 4.0;

#[derive(Clone, Debug)]
enum Storage {
    Fp8(Vec<u8>),
    Float(Vec<f32>),
}

/// Per-node maximum variance, computed once per height grid
#[derive(Clone, Debug)]
pub struct VarianceTree {
    storage: Storage,
    /// Deepest level with a stored entry
    max_level: u32,
}

impl VarianceTree {
    /// Deepest stored level for a tree with `levels` levels
    fn stored_depth(levels: u32, depth: VarianceDepth) -> u32 {
        match depth {
            VarianceDepth::Full => levels - 1,
            VarianceDepth::OmitLowest => levels - 2,
        }
    }

    /// Bytes needed to store the tree for a grid of `(1 << n) + 1` samples
    pub fn memory_required(n: u32, encoding: VarianceEncoding, depth: VarianceDepth) -> usize {
        let nodes = 1usize << Self::stored_depth(2 * n + 2, depth);
        match encoding {
            VarianceEncoding::Fp8 => nodes,
            VarianceEncoding::Float => nodes * std::mem::size_of::<f32>(),
        }
    }

    /// Compute the variance of every stored node.
    pub fn build(geometry: &GridGeometry, encoding: VarianceEncoding, depth: VarianceDepth) -> Self {
        let max_level = Self::stored_depth(geometry.levels(), depth);
        let nodes = 1usize << max_level;
        let mut values = vec![0.0f32; nodes];

        let [sw, nw, ne, se] = geometry.corners();
        let heights = geometry.heights();
        compute(heights, &mut values, max_level, 2, sw, ne, nw, 2);
        compute(heights, &mut values, max_level, 3, ne, sw, se, 2);

        let storage = match encoding {
            VarianceEncoding::Fp8 => Storage::Fp8(
                values
                    .iter()
                    .map(|&v| fp8::encode((v * FP8_SCALE).round() as u32))
                    .collect(),
            ),
            VarianceEncoding::Float => Storage::Float(values),
        };

        let tree = Self { storage, max_level };
        log::debug!(
            "Built variance tree: {} nodes to level {} ({} bytes)",
            nodes,
            max_level,
            tree.memory_bytes()
        );
        tree
    }

    /// Number of node slots (slots 0 and 1 are unused)
    pub fn stored_nodes(&self) -> usize {
        1 << self.max_level
    }

    /// Whether node `num` has a stored variance. Nodes past the stored
    /// depth are always split.
    #[inline]
    pub fn is_stored(&self, num: u32) -> bool {
        (num as usize) < self.stored_nodes()
    }

    /// Stored variance of node `num`, in height units
    #[inline]
    pub fn variance(&self, num: u32) -> f32 {
        match &self.storage {
            Storage::Fp8(codes) => fp8::decode(codes[num as usize]) as f32 / FP8_SCALE,
            Storage::Float(values) => values[num as usize],
        }
    }

    pub fn memory_bytes(&self) -> usize {
        match &self.storage {
            Storage::Fp8(codes) => codes.len(),
            Storage::Float(values) => values.len() * std::mem::size_of::<f32>(),
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn compute(
    heights: &[f32],
    values: &mut [f32],
    max_level: u32,
    num: usize,
    v0: u32,
    v1: u32,
    apex: u32,
    level: u32,
) -> f32 {
    let vc = GridGeometry::midpoint(v0, v1);
    let interpolated = (heights[v0 as usize] + heights[v1 as usize]) / 2.0;
    let mut variance = (heights[vc as usize] - interpolated).abs();

    if level < max_level {
        let left = compute(heights, values, max_level, num << 1, apex, v0, vc, level + 1);
        let right = compute(heights, values, max_level, (num << 1) + 1, v1, apex, vc, level + 1);
        variance = variance.max(left).max(right);
    }

    values[num] = variance;
    variance
}
