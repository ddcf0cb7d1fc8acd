//! Point types and related functionality

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::NORMAL_EPSILON;

/// A 3D point with floating point coordinates
pub type Point3f = Point3<f32>;

/// A 3D vector with floating point components
pub type Vector3f = Vector3<f32>;

/// A point with normal vector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalPoint3f {
    pub position: Point3f,
    pub normal: Vector3f,
}

impl NormalPoint3f {
    pub fn new(position: Point3f, normal: Vector3f) -> Self {
        Self { position, normal }
    }
}

impl Default for NormalPoint3f {
    fn default() -> Self {
        Self {
            position: Point3f::origin(),
            normal: Vector3f::new(0.0, 0.0, 1.0),
        }
    }
}

/// Divide a vector by its own length, clamping the length from below.
///
/// A zero vector stays zero instead of turning into NaNs.
pub fn clamped_normalize(v: &Vector3f) -> Vector3f {
    v / v.norm().max(NORMAL_EPSILON)
}

/// Whether a vector is too short to carry a direction
pub fn is_degenerate_direction(v: &Vector3f) -> bool {
    !v.iter().all(|c| c.is_finite()) || v.norm() <= NORMAL_EPSILON
}

/// Twice the area of a triangle, pointing along its right-hand winding normal
pub fn triangle_cross(a: &Point3f, b: &Point3f, c: &Point3f) -> Vector3f {
    (b - a).cross(&(c - a))
}

/// Area of a triangle
pub fn triangle_area(a: &Point3f, b: &Point3f, c: &Point3f) -> f32 {
    triangle_cross(a, b, c).norm() * 0.5
}
