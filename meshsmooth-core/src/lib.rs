//! Core data structures and traits for meshsmooth
//!
//! This crate provides the fundamental types shared by every stage of the
//! smoothing pipeline: points, oriented point clouds, raw triangle soup,
//! indexed triangle meshes, and the common error type.

pub mod point;
pub mod point_cloud;
pub mod mesh;
pub mod soup;
pub mod traits;
pub mod error;

pub use point::*;
pub use point_cloud::*;
pub use mesh::*;
pub use soup::*;
pub use traits::*;
pub use error::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Point3, Vector3};

/// Smallest magnitude treated as a non-zero length when normalizing
pub const NORMAL_EPSILON: f32 = 1e-12;
