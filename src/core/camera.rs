//! Camera for terrain viewing

use crate::core::types::{Vec3, Mat4, Quat};
use crate::math::frustum::{Frustum, ViewFrustum};

/// Camera with position, rotation, and projection parameters
#[derive(Clone, Debug)]
pub struct Camera {
    /// World position
    pub position: Vec3,
    /// Rotation as quaternion
    pub rotation: Quat,
    /// Vertical field of view in radians
    pub fov_y: f32,
    /// Width over height
    pub aspect: f32,
    /// Near clip plane
    pub near: f32,
    /// Far clip plane
    pub far: f32,
}

impl Camera {
    /// Create a new camera
    pub fn new(position: Vec3, fov_y_degrees: f32, aspect: f32) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
            fov_y: fov_y_degrees.to_radians(),
            aspect,
            near: 1.0,
            far: 100_000.0,
        }
    }

    /// Create camera looking at a target
    pub fn look_at(position: Vec3, target: Vec3, up: Vec3) -> Self {
        let mut camera = Self::new(position, 60.0, 16.0 / 9.0);
        camera.point_at(target, up);
        camera
    }

    /// Re-orient the camera toward a target without moving it
    pub fn point_at(&mut self, target: Vec3, up: Vec3) {
        let forward = (target - self.position).normalize();
        let right = forward.cross(up).normalize();
        let up = right.cross(forward);

        self.rotation = Quat::from_mat3(&glam::Mat3::from_cols(right, up, -forward));
    }

    /// Get view matrix (world to camera space)
    pub fn view_matrix(&self) -> Mat4 {
        let rotation_matrix = Mat4::from_quat(self.rotation.conjugate());
        let translation_matrix = Mat4::from_translation(-self.position);
        rotation_matrix * translation_matrix
    }

    /// Get projection matrix (camera to clip space)
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far)
    }

    /// Get combined view-projection matrix
    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Get forward direction (negative Z in camera space)
    pub fn forward(&self) -> Vec3 {
        self.rotation * -Vec3::Z
    }

    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    /// Snapshot of the eye position and clip planes for one frame of culling
    pub fn view_frustum(&self) -> ViewFrustum {
        ViewFrustum::new(self.position, Frustum::from_view_projection(&self.view_projection()))
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vec3::new(0.0, 0.0, 5.0), 60.0, 16.0 / 9.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::frustum::{ViewVolume, Visibility};

    #[test]
    fn test_default_looks_north() {
        // -Z is north on the terrain grid
        let camera = Camera::default();
        assert!((camera.forward().z - (-1.0)).abs() < 0.001);
        assert!((camera.right().x - 1.0).abs() < 0.001);
        assert!((camera.up().y - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_view_matrix_translation() {
        let mut camera = Camera::default();
        camera.position = Vec3::new(10.0, 0.0, 0.0);

        let view = camera.view_matrix();
        // View matrix should translate world origin to (-10, 0, 0) in camera space
        let origin_in_camera = view.transform_point3(Vec3::ZERO);
        assert!((origin_in_camera.x - (-10.0)).abs() < 0.001);
    }

    #[test]
    fn test_look_at_points_forward() {
        let camera = Camera::look_at(Vec3::new(0.0, 100.0, 0.0), Vec3::ZERO, Vec3::NEG_Z);
        let forward = camera.forward();
        assert!((forward.y - (-1.0)).abs() < 0.001);
    }

    #[test]
    fn test_view_frustum_sees_target() {
        let camera = Camera::look_at(Vec3::new(0.0, 100.0, 0.0), Vec3::ZERO, Vec3::NEG_Z);
        let view = camera.view_frustum();

        assert_eq!(view.eye_position(), camera.position);
        assert_eq!(view.classify_sphere(Vec3::ZERO, 1.0), Visibility::AllIn);
        // Behind the camera
        assert_eq!(view.classify_sphere(Vec3::new(0.0, 200.0, 0.0), 1.0), Visibility::Out);
    }
}
