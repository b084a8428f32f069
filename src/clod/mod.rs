//! Binary triangle tree level of detail
//!
//! A square height grid is covered by two right isosceles triangles which
//! are recursively split at their hypotenuse midpoints. Each frame the tree
//! is rebuilt from scratch: the top levels are split down to fixed blocks,
//! then leaves are split further wherever their precomputed height error is
//! large relative to their distance from the eye, with a feedback loop
//! tuning the error threshold to hit a triangle budget.

pub mod block;
pub mod config;
pub mod emitter;
pub mod fp8;
pub mod geometry;
pub mod pool;
pub mod quality;
pub mod refiner;
pub mod terrain;
pub mod variance;

pub use block::{Block, BlockGrid, BlockRoot};
pub use config::{EmitMode, FeedbackMetric, LodConfig, SplitStrategy, VarianceDepth, VarianceEncoding};
pub use emitter::{EmitStats, MeshEmitter, MeshSink, TerrainVertex, TriangleFans};
pub use geometry::{GridExtents, GridGeometry, SurfaceSample};
pub use pool::{BinTri, TriId, TriPool, NO_TRI};
pub use quality::QualityController;
pub use refiner::{RefineStats, Refiner};
pub use terrain::{FrameStats, SmTerrain};
pub use variance::VarianceTree;
