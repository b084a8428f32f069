//! Regular height grids
//!
//! The CLOD engine reads heights through [`HeightSource`] exactly once, at
//! construction, and keeps its own copy afterwards.

/// Read-only access to a regular grid of height samples.
///
/// Columns run west to east, rows run south to north.
pub trait HeightSource {
    /// Grid size as (columns, rows)
    fn size(&self) -> (usize, usize);

    /// Height sample at a grid position
    fn height(&self, col: usize, row: usize) -> f32;

    /// Minimum and maximum sample over the whole grid
    fn height_range(&self) -> (f32, f32) {
        let (cols, rows) = self.size();
        let mut min_h = f32::INFINITY;
        let mut max_h = f32::NEG_INFINITY;
        for row in 0..rows {
            for col in 0..cols {
                let h = self.height(col, row);
                min_h = min_h.min(h);
                max_h = max_h.max(h);
            }
        }
        (min_h, max_h)
    }
}

/// Owned row-major height grid
#[derive(Clone, Debug, PartialEq)]
pub struct HeightGrid {
    cols: usize,
    rows: usize,
    heights: Vec<f32>,
}

impl HeightGrid {
    /// Create a flat grid of zero heights
    pub fn new(cols: usize, rows: usize) -> Self {
        Self {
            cols,
            rows,
            heights: vec![0.0; cols * rows],
        }
    }

    /// Create a square grid of `(1 << n) + 1` samples per side
    pub fn with_power(n: u32) -> Self {
        let dim = (1usize << n) + 1;
        Self::new(dim, dim)
    }

    /// Create a grid by sampling a function of (col, row)
    pub fn from_fn(cols: usize, rows: usize, mut f: impl FnMut(usize, usize) -> f32) -> Self {
        let mut heights = Vec::with_capacity(cols * rows);
        for row in 0..rows {
            for col in 0..cols {
                heights.push(f(col, row));
            }
        }
        Self { cols, rows, heights }
    }

    /// Wrap existing row-major samples
    ///
    /// # Panics
    /// Panics if `heights.len() != cols * rows`.
    pub fn from_vec(cols: usize, rows: usize, heights: Vec<f32>) -> Self {
        assert_eq!(heights.len(), cols * rows, "height buffer does not match grid size");
        Self { cols, rows, heights }
    }

    /// Set a single sample
    pub fn set(&mut self, col: usize, row: usize, height: f32) {
        self.heights[row * self.cols + col] = height;
    }

    /// Raw row-major samples
    pub fn as_slice(&self) -> &[f32] {
        &self.heights
    }
}

impl HeightSource for HeightGrid {
    fn size(&self) -> (usize, usize) {
        (self.cols, self.rows)
    }

    fn height(&self, col: usize, row: usize) -> f32 {
        self.heights[row * self.cols + col]
    }
}
