//! Per-frame pool of binary triangles
//!
//! Triangles are addressed by `u32` ids into a flat `Vec`. The pool is
//! emptied at the start of every frame and refilled by refinement, so no
//! triangle is ever freed individually and no merge operation exists.

use crate::math::Visibility;

/// Triangle id within a [`TriPool`]
pub type TriId = u32;

/// Sentinel for a missing child or neighbor
pub const NO_TRI: TriId = u32::MAX;

/// Smallest number of triangles kept in reserve below capacity
const MIN_SAFETY_MARGIN: usize = 50;

/// A node of the triangle bintree.
///
/// Neighbors follow the usual ROAM convention: the bottom neighbor shares
/// the hypotenuse, the left and right neighbors share the legs. A neighbor
/// is always a leaf at the same level or one level coarser.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BinTri {
    pub left_child: TriId,
    pub right_child: TriId,
    pub left_neighbor: TriId,
    pub right_neighbor: TriId,
    pub bottom_neighbor: TriId,
    /// Last frustum classification, inherited by children on split
    pub frustum: Visibility,
}

impl BinTri {
    pub const EMPTY: Self = Self {
        left_child: NO_TRI,
        right_child: NO_TRI,
        left_neighbor: NO_TRI,
        right_neighbor: NO_TRI,
        bottom_neighbor: NO_TRI,
        frustum: Visibility::PartiallyIn,
    };

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.left_child == NO_TRI
    }
}

/// Growable arena of [`BinTri`] with a soft capacity.
///
/// The capacity is a budget, not a hard limit: refinement stops splitting
/// once fewer than [`safety_margin`](Self::safety_margin) slots remain, which
/// leaves room for the longest chain of forced neighbor splits.
pub struct TriPool {
    tris: Vec<BinTri>,
    capacity: usize,
    safety_margin: usize,
}

impl TriPool {
    /// Create a pool holding up to `capacity` triangles.
    ///
    /// # Arguments
    /// * `capacity` - Triangle budget per frame
    /// * `levels` - Depth of the triangle bintree, which bounds forced split chains
    pub fn new(capacity: usize, levels: u32) -> Self {
        let safety_margin = Self::margin_for(levels);
        let capacity = capacity.max(2 * safety_margin);
        log::info!(
            "Created triangle pool: {} triangles ({:.1} KB)",
            capacity,
            (capacity * std::mem::size_of::<BinTri>()) as f64 / 1024.0
        );
        Self {
            tris: Vec::with_capacity(capacity),
            capacity,
            safety_margin,
        }
    }

    /// Reserve kept free below capacity for a tree of `levels` levels
    pub fn margin_for(levels: u32) -> usize {
        MIN_SAFETY_MARGIN.max(4 * (levels as usize + 1))
    }

    /// Capacity needed for a polygon target and block count
    pub fn required_capacity(polygon_target: u32, blocks: usize, levels: u32) -> usize {
        let margin = Self::margin_for(levels);
        (3 * polygon_target as usize).max(4 * blocks + 2 * margin)
    }

    /// Change the budget. Only call between frames.
    pub fn resize(&mut self, capacity: usize) {
        let capacity = capacity.max(2 * self.safety_margin);
        if capacity == self.capacity {
            return;
        }
        log::info!("Resizing triangle pool: {} -> {}", self.capacity, capacity);
        self.tris = Vec::with_capacity(capacity);
        self.capacity = capacity;
    }

    /// Forget every triangle
    pub fn reset(&mut self) {
        self.tris.clear();
    }

    /// Add a fresh triangle with no links
    pub fn allocate(&mut self) -> TriId {
        let id = self.tris.len() as TriId;
        self.tris.push(BinTri::EMPTY);
        id
    }

    #[inline]
    pub fn get(&self, id: TriId) -> &BinTri {
        &self.tris[id as usize]
    }

    #[inline]
    pub fn get_mut(&mut self, id: TriId) -> &mut BinTri {
        &mut self.tris[id as usize]
    }

    /// Triangles allocated this frame
    pub fn used(&self) -> usize {
        self.tris.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn safety_margin(&self) -> usize {
        self.safety_margin
    }

    /// Whether another split is allowed this frame
    #[inline]
    pub fn can_split(&self) -> bool {
        self.tris.len() + self.safety_margin < self.capacity
    }

    /// Bytes reserved for the triangle budget
    pub fn memory_bytes(&self) -> usize {
        self.capacity * std::mem::size_of::<BinTri>()
    }

    /// Split a leaf, first splitting its bottom neighbor as often as needed
    /// so the two share a hypotenuse. Keeps the mesh free of T-junctions.
    pub fn split(&mut self, id: TriId) {
        let bottom = self.get(id).bottom_neighbor;
        if bottom == NO_TRI {
            self.split2(id);
            let tri = *self.get(id);
            self.get_mut(tri.left_child).right_neighbor = NO_TRI;
            self.get_mut(tri.right_child).left_neighbor = NO_TRI;
            return;
        }

        if self.get(bottom).bottom_neighbor != id {
            self.split(bottom);
        }
        // the forced split re-linked our bottom neighbor to one of its children
        let bottom = self.get(id).bottom_neighbor;

        self.split2(id);
        self.split2(bottom);

        let tri = *self.get(id);
        let base = *self.get(bottom);
        self.get_mut(tri.left_child).right_neighbor = base.right_child;
        self.get_mut(tri.right_child).left_neighbor = base.left_child;
        self.get_mut(base.left_child).right_neighbor = tri.right_child;
        self.get_mut(base.right_child).left_neighbor = tri.left_child;
    }

    /// Give a leaf two children and hand its leg neighbors over to them.
    /// Links across the hypotenuse are left for [`split`](Self::split).
    fn split2(&mut self, id: TriId) {
        let parent = *self.get(id);
        let left = self.allocate();
        let right = self.allocate();

        *self.get_mut(left) = BinTri {
            left_neighbor: right,
            bottom_neighbor: parent.left_neighbor,
            frustum: parent.frustum,
            ..BinTri::EMPTY
        };
        *self.get_mut(right) = BinTri {
            right_neighbor: left,
            bottom_neighbor: parent.right_neighbor,
            frustum: parent.frustum,
            ..BinTri::EMPTY
        };

        if parent.left_neighbor != NO_TRI {
            let neighbor = self.get_mut(parent.left_neighbor);
            if neighbor.bottom_neighbor == id {
                neighbor.bottom_neighbor = left;
            } else {
                neighbor.right_neighbor = left;
            }
        }
        if parent.right_neighbor != NO_TRI {
            let neighbor = self.get_mut(parent.right_neighbor);
            if neighbor.bottom_neighbor == id {
                neighbor.bottom_neighbor = right;
            } else {
                neighbor.left_neighbor = right;
            }
        }

        let tri = self.get_mut(id);
        tri.left_child = left;
        tri.right_child = right;
    }

    /// Mark a triangle and every existing descendant as outside the view.
    /// Refinement stops at an Out node, so seeded levels below it would
    /// otherwise keep a stale classification.
    pub fn mark_out(&mut self, id: TriId) {
        let tri = self.get_mut(id);
        tri.frustum = Visibility::Out;
        let (left, right) = (tri.left_child, tri.right_child);
        if left != NO_TRI {
            self.mark_out(left);
            self.mark_out(right);
        }
    }

    /// Mark a triangle and its direct children as wholly inside the view
    pub fn mark_all_in(&mut self, id: TriId) {
        let tri = self.get_mut(id);
        tri.frustum = Visibility::AllIn;
        let (left, right) = (tri.left_child, tri.right_child);
        if left != NO_TRI {
            self.get_mut(left).frustum = Visibility::AllIn;
            self.get_mut(right).frustum = Visibility::AllIn;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two masters sharing their hypotenuse
    fn masters(pool: &mut TriPool) -> (TriId, TriId) {
        let a = pool.allocate();
        let b = pool.allocate();
        pool.get_mut(a).bottom_neighbor = b;
        pool.get_mut(b).bottom_neighbor = a;
        (a, b)
    }

    #[test]
    fn test_allocate_and_reset() {
        let mut pool = TriPool::new(1000, 6);
        assert_eq!(pool.capacity(), 1000);
        assert_eq!(pool.safety_margin(), 50);
        let id = pool.allocate();
        assert_eq!(id, 0);
        assert!(pool.get(id).is_leaf());
        assert_eq!(pool.used(), 1);
        pool.reset();
        assert_eq!(pool.used(), 0);
    }

    #[test]
    fn test_margin_scales_with_depth() {
        assert_eq!(TriPool::margin_for(6), 50);
        assert_eq!(TriPool::margin_for(22), 92);
        assert_eq!(TriPool::required_capacity(1000, 4, 6), 3000);
        assert_eq!(TriPool::required_capacity(1000, 4096, 22), 4 * 4096 + 184);
    }

    #[test]
    fn test_split_diamond() {
        let mut pool = TriPool::new(1000, 6);
        let (a, b) = masters(&mut pool);
        pool.split(a);

        let ta = *pool.get(a);
        let tb = *pool.get(b);
        assert!(!ta.is_leaf());
        assert!(!tb.is_leaf());
        assert_eq!(pool.used(), 6);

        // siblings share a leg
        assert_eq!(pool.get(ta.left_child).left_neighbor, ta.right_child);
        assert_eq!(pool.get(ta.right_child).right_neighbor, ta.left_child);
        // children of opposite masters meet across the old hypotenuse
        assert_eq!(pool.get(ta.left_child).right_neighbor, tb.right_child);
        assert_eq!(pool.get(tb.right_child).left_neighbor, ta.left_child);
        assert_eq!(pool.get(ta.right_child).left_neighbor, tb.left_child);
        assert_eq!(pool.get(tb.left_child).right_neighbor, ta.right_child);
        // the outer edge is the grid boundary
        assert_eq!(pool.get(ta.left_child).bottom_neighbor, NO_TRI);
    }

    #[test]
    fn test_forced_split_of_coarser_neighbor() {
        let mut pool = TriPool::new(1000, 6);
        let (a, b) = masters(&mut pool);
        pool.split(a);
        let ta = *pool.get(a);
        let tb = *pool.get(b);

        // split one grandchild-level triangle; its bottom neighbor is a
        // child of the other master at the same level
        let child = ta.left_child;
        pool.split(child);
        let bottom = pool.get(child).bottom_neighbor;
        assert_eq!(bottom, NO_TRI);

        // a grandchild whose bottom is coarser forces the neighbor split
        let grandchild = pool.get(child).right_child;
        let coarse = pool.get(grandchild).bottom_neighbor;
        assert_eq!(coarse, tb.right_child);
        assert!(pool.get(coarse).is_leaf());
        pool.split(grandchild);

        assert!(!pool.get(coarse).is_leaf());
        assert!(!pool.get(grandchild).is_leaf());
        // and the two now share their hypotenuse
        let new_bottom = pool.get(grandchild).bottom_neighbor;
        assert_eq!(pool.get(new_bottom).bottom_neighbor, grandchild);
    }

    #[test]
    fn test_split_respects_capacity_margin() {
        let mut pool = TriPool::new(110, 6);
        assert!(pool.can_split());
        while pool.used() + pool.safety_margin() < pool.capacity() {
            pool.allocate();
        }
        assert!(!pool.can_split());
    }

    #[test]
    fn test_mark_out_reaches_grandchildren() {
        let mut pool = TriPool::new(1000, 6);
        let (a, _) = masters(&mut pool);
        pool.split(a);
        let ta = *pool.get(a);
        pool.split(ta.left_child);
        pool.split(ta.right_child);

        pool.mark_out(a);
        for child in [ta.left_child, ta.right_child] {
            let tc = *pool.get(child);
            assert_eq!(tc.frustum, Visibility::Out);
            assert_eq!(pool.get(tc.left_child).frustum, Visibility::Out);
            assert_eq!(pool.get(tc.right_child).frustum, Visibility::Out);
        }
    }

    #[test]
    fn test_mark_out_children() {
        let mut pool = TriPool::new(1000, 6);
        let (a, _) = masters(&mut pool);
        pool.split(a);
        pool.mark_out(a);
        let ta = *pool.get(a);
        assert_eq!(ta.frustum, Visibility::Out);
        assert_eq!(pool.get(ta.left_child).frustum, Visibility::Out);
        assert_eq!(pool.get(ta.right_child).frustum, Visibility::Out);
    }
}
