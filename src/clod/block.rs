//! Square blocks of the grid used for coarse culling and fan batching
//!
//! Each block is a `2^b x 2^b` cell square split by one diagonal into two
//! bintree triangles at the same level. The whole tree is structurally split
//! down to that level every frame before adaptive refinement starts.

use super::geometry::GridGeometry;
use super::pool::{TriId, TriPool};
use crate::math::{ViewVolume, Visibility};

/// A bintree triangle that roots one half of a block
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockRoot {
    pub tri: TriId,
    /// Variance tree node number
    pub num: u32,
    pub v0: u32,
    pub v1: u32,
    pub apex: u32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Block {
    pub roots: [Option<BlockRoot>; 2],
    /// Result of the last block culling pass
    pub visible: Visibility,
}

impl Block {
    const EMPTY: Self = Self {
        roots: [None, None],
        visible: Visibility::PartiallyIn,
    };

    fn push_root(&mut self, root: BlockRoot) {
        if self.roots[0].is_none() {
            self.roots[0] = Some(root);
        } else {
            debug_assert!(self.roots[1].is_none(), "block already has two roots");
            self.roots[1] = Some(root);
        }
    }
}

/// Block partition of a `(1 << n) + 1` grid
#[derive(Clone, Debug)]
pub struct BlockGrid {
    /// Block edge length as a power of two in cells
    cells_log2: u32,
    per_side: usize,
    /// Bintree level of the block roots
    root_level: u32,
    blocks: Vec<Block>,
}

impl BlockGrid {
    /// Block size used when none is configured
    pub fn default_cells_log2(n: u32) -> u32 {
        if n >= 6 { n - 3 } else { n }
    }

    /// # Arguments
    /// * `n` - Grid power; the grid has `(1 << n) + 1` samples per side
    /// * `cells_log2` - Requested block size, clamped to `1..=n`
    pub fn new(n: u32, cells_log2: Option<u32>) -> Self {
        let cells_log2 = cells_log2
            .unwrap_or_else(|| Self::default_cells_log2(n))
            .clamp(1, n);
        let per_side = 1usize << (n - cells_log2);
        Self {
            cells_log2,
            per_side,
            root_level: 2 * (n - cells_log2) + 2,
            blocks: vec![Block::EMPTY; per_side * per_side],
        }
    }

    pub fn cells_log2(&self) -> u32 {
        self.cells_log2
    }

    /// Blocks along one side of the grid
    pub fn per_side(&self) -> usize {
        self.per_side
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn root_level(&self) -> u32 {
        self.root_level
    }

    pub fn get(&self, x: usize, z: usize) -> &Block {
        &self.blocks[z * self.per_side + x]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter()
    }

    /// Every block root, block by block
    pub fn roots(&self) -> impl Iterator<Item = &BlockRoot> {
        self.blocks.iter().flat_map(|b| b.roots.iter().flatten())
    }

    /// Drop all roots
    pub fn clear(&mut self) {
        for block in &mut self.blocks {
            block.roots = [None, None];
        }
    }

    /// Structurally split the two masters down to the root level and record
    /// every resulting triangle in its block.
    ///
    /// `masters` holds the pool id, node number and `(v0, v1, apex)` of
    /// each master triangle.
    pub fn seed(&mut self, pool: &mut TriPool, geometry: &GridGeometry, masters: [BlockRoot; 2]) {
        self.clear();
        for master in masters {
            self.seed_node(pool, geometry, master);
        }
    }

    fn seed_node(&mut self, pool: &mut TriPool, geometry: &GridGeometry, node: BlockRoot) {
        if node.num >= 1 << (self.root_level - 1) {
            let vc = GridGeometry::midpoint(node.v0, node.v1);
            let x = geometry.col_of(vc) >> self.cells_log2;
            let z = geometry.row_of(vc) >> self.cells_log2;
            self.blocks[z * self.per_side + x].push_root(node);
            return;
        }

        // a neighbor's forced split may already have done this
        if pool.get(node.tri).is_leaf() {
            pool.split(node.tri);
        }
        let tri = *pool.get(node.tri);
        let vc = GridGeometry::midpoint(node.v0, node.v1);

        self.seed_node(pool, geometry, BlockRoot {
            tri: tri.left_child,
            num: node.num << 1,
            v0: node.apex,
            v1: node.v0,
            apex: vc,
        });
        self.seed_node(pool, geometry, BlockRoot {
            tri: tri.right_child,
            num: (node.num << 1) + 1,
            v0: node.v1,
            v1: node.apex,
            apex: vc,
        });
    }

    /// Classify every block's bounding sphere against the view.
    ///
    /// The sphere sits at the hypotenuse midpoint of the first root with a
    /// radius of half the parent level's hypotenuse, which covers the block.
    pub fn update_visibility<V>(&mut self, view: &V, geometry: &GridGeometry)
    where
        V: ViewVolume + ?Sized,
    {
        let radius = geometry.hypotenuse(self.root_level - 1) / 2.0;
        for block in &mut self.blocks {
            block.visible = match block.roots[0] {
                Some(root) => {
                    let center = geometry.world(GridGeometry::midpoint(root.v0, root.v1));
                    view.classify_sphere(center, radius)
                }
                None => Visibility::Out,
            };
        }
    }
}
