//! View frustum for culling

use crate::core::types::{Vec3, Vec4, Mat4};

/// A plane defined by normal and distance from origin
#[derive(Clone, Copy, Debug)]
pub struct Plane {
    pub normal: Vec3,
    pub distance: f32,
}

impl Plane {
    pub fn new(normal: Vec3, distance: f32) -> Self {
        Self { normal, distance }
    }

    /// Signed distance from point to plane (positive = in front)
    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.distance
    }
}

/// Result of testing a bounding sphere against a view volume
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Visibility {
    /// Entirely outside at least one plane
    Out,
    /// Straddles one or more planes
    PartiallyIn,
    /// Entirely inside every plane
    AllIn,
}

/// The camera-side collaborator of terrain refinement.
///
/// Refinement only needs the eye position for its distance metric and a
/// conservative sphere classification for culling.
pub trait ViewVolume {
    /// World-space eye position
    fn eye_position(&self) -> Vec3;

    /// Classify a sphere against the view volume
    fn classify_sphere(&self, center: Vec3, radius: f32) -> Visibility;
}

/// View frustum with 6 planes (Near, Far, Left, Right, Top, Bottom)
#[derive(Clone, Copy, Debug)]
pub struct Frustum {
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Extract frustum planes from view-projection matrix
    pub fn from_view_projection(vp: &Mat4) -> Self {
        let m = vp.to_cols_array_2d();

        // Extract and normalize planes
        // Left: row3 + row0
        let left = Self::normalize_plane(Vec4::new(
            m[0][3] + m[0][0],
            m[1][3] + m[1][0],
            m[2][3] + m[2][0],
            m[3][3] + m[3][0],
        ));

        // Right: row3 - row0
        let right = Self::normalize_plane(Vec4::new(
            m[0][3] - m[0][0],
            m[1][3] - m[1][0],
            m[2][3] - m[2][0],
            m[3][3] - m[3][0],
        ));

        // Bottom: row3 + row1
        let bottom = Self::normalize_plane(Vec4::new(
            m[0][3] + m[0][1],
            m[1][3] + m[1][1],
            m[2][3] + m[2][1],
            m[3][3] + m[3][1],
        ));

        // Top: row3 - row1
        let top = Self::normalize_plane(Vec4::new(
            m[0][3] - m[0][1],
            m[1][3] - m[1][1],
            m[2][3] - m[2][1],
            m[3][3] - m[3][1],
        ));

        // Near: row3 + row2
        let near = Self::normalize_plane(Vec4::new(
            m[0][3] + m[0][2],
            m[1][3] + m[1][2],
            m[2][3] + m[2][2],
            m[3][3] + m[3][2],
        ));

        // Far: row3 - row2
        let far = Self::normalize_plane(Vec4::new(
            m[0][3] - m[0][2],
            m[1][3] - m[1][2],
            m[2][3] - m[2][2],
            m[3][3] - m[3][2],
        ));

        Self {
            planes: [near, far, left, right, top, bottom],
        }
    }

    fn normalize_plane(plane: Vec4) -> Plane {
        let normal = Vec3::new(plane.x, plane.y, plane.z);
        let len = normal.length();
        Plane {
            normal: normal / len,
            distance: plane.w / len,
        }
    }

    /// Classify a sphere: out if it lies wholly behind any plane,
    /// all-in if it lies wholly in front of every plane.
    pub fn classify_sphere(&self, center: Vec3, radius: f32) -> Visibility {
        let mut all_in = true;
        for plane in &self.planes {
            let dist = plane.distance_to_point(center);
            if dist < -radius {
                return Visibility::Out;
            }
            if dist < radius {
                all_in = false;
            }
        }
        if all_in {
            Visibility::AllIn
        } else {
            Visibility::PartiallyIn
        }
    }
}

/// A camera snapshot taken once per frame: eye position plus clip planes
#[derive(Clone, Copy, Debug)]
pub struct ViewFrustum {
    pub eye: Vec3,
    pub frustum: Frustum,
}

impl ViewFrustum {
    pub fn new(eye: Vec3, frustum: Frustum) -> Self {
        Self { eye, frustum }
    }
}

impl ViewVolume for ViewFrustum {
    fn eye_position(&self) -> Vec3 {
        self.eye
    }

    fn classify_sphere(&self, center: Vec3, radius: f32) -> Visibility {
        self.frustum.classify_sphere(center, radius)
    }
}
