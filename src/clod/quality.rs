//! Feedback loop that steers the split threshold toward a triangle budget

use super::config::{FeedbackMetric, LodConfig};

/// Adjusts the quality constant once per frame from the previous frame's
/// measurement.
///
/// A larger constant raises the split threshold and so produces fewer
/// triangles.
#[derive(Clone, Debug)]
pub struct QualityController {
    constant: f32,
    floor: f32,
    speed: f32,
    tolerance: f32,
    max_step: f32,
    metric: FeedbackMetric,
    measurement: Option<u32>,
}

impl QualityController {
    pub fn new(config: &LodConfig) -> Self {
        Self {
            constant: config.initial_quality.max(config.quality_floor),
            floor: config.quality_floor,
            speed: config.adaption_speed,
            tolerance: config.tolerance,
            max_step: config.max_quality_step.max(1.0),
            metric: config.feedback,
            measurement: None,
        }
    }

    /// Current quality constant
    pub fn constant(&self) -> f32 {
        self.constant
    }

    /// Override the constant, e.g. to freeze a view. Still clamped to the floor.
    pub fn set_constant(&mut self, constant: f32) {
        self.constant = constant.max(self.floor);
    }

    pub fn metric(&self) -> FeedbackMetric {
        self.metric
    }

    /// Last measurement fed back, if any
    pub fn measurement(&self) -> Option<u32> {
        self.measurement
    }

    /// Record a finished frame.
    ///
    /// # Arguments
    /// * `drawn_triangles` - Triangles emitted by the last render
    /// * `pool_used` - Triangle pool nodes used by the last refinement
    pub fn record(&mut self, drawn_triangles: u32, pool_used: usize) {
        self.measurement = Some(match self.metric {
            FeedbackMetric::DrawnTriangles => drawn_triangles,
            FeedbackMetric::PoolUsage => (pool_used / 2) as u32,
        });
    }

    /// Move the constant toward the target. Does nothing before the first
    /// measurement or while inside the dead band. Returns the new constant.
    pub fn adjust(&mut self, target: u32) -> f32 {
        let Some(measured) = self.measurement else {
            return self.constant;
        };

        let diff = measured as f32 - target as f32;
        let range = target as f32 * self.tolerance;
        let factor = if diff > range {
            1.0 + (diff - range) * self.speed
        } else if diff < -range {
            1.0 + (diff + range) * self.speed
        } else {
            return self.constant;
        };

        let factor = factor.clamp(1.0 / self.max_step, self.max_step);
        self.constant = (self.constant * factor).max(self.floor);
        log::trace!(
            "Quality {:.6} (measured {}, target {}, factor {:.4})",
            self.constant, measured, target, factor
        );
        self.constant
    }
}
