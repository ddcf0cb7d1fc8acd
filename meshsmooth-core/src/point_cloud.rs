//! Point cloud container

use crate::point::*;
use serde::{Deserialize, Serialize};
use std::ops::Index;

/// A generic point cloud container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointCloud<T> {
    pub points: Vec<T>,
}

/// An oriented point cloud, the input of surface reconstruction
pub type OrientedPointCloud = PointCloud<NormalPoint3f>;

impl<T> PointCloud<T> {
    /// Create a new empty point cloud
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    /// Create a new point cloud with specified capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
        }
    }

    /// Create a point cloud from a vector of points
    pub fn from_points(points: Vec<T>) -> Self {
        Self { points }
    }

    /// Get the number of points in the cloud
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the point cloud is empty
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Add a point to the cloud
    pub fn push(&mut self, point: T) {
        self.points.push(point);
    }

    /// Get an iterator over the points
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.points.iter()
    }
}

impl<T> Default for PointCloud<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Index<usize> for PointCloud<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        &self.points[index]
    }
}

impl<'a, T> IntoIterator for &'a PointCloud<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

impl<T> FromIterator<T> for PointCloud<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            points: Vec::from_iter(iter),
        }
    }
}

impl PointCloud<NormalPoint3f> {
    /// Positions of all points, in cloud order
    pub fn positions(&self) -> impl Iterator<Item = &Point3f> + '_ {
        self.points.iter().map(|p| &p.position)
    }

    /// Normals of all points, in cloud order
    pub fn normals(&self) -> impl Iterator<Item = &Vector3f> + '_ {
        self.points.iter().map(|p| &p.normal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oriented_cloud_accessors() {
        let cloud: OrientedPointCloud = vec![
            NormalPoint3f::new(Point3f::new(1.0, 2.0, 3.0), Vector3f::z()),
            NormalPoint3f::new(Point3f::new(4.0, 5.0, 6.0), Vector3f::x()),
        ]
        .into_iter()
        .collect();

        assert_eq!(cloud.len(), 2);
        assert_eq!(cloud.positions().nth(1), Some(&Point3f::new(4.0, 5.0, 6.0)));
        assert_eq!(cloud.normals().next(), Some(&Vector3f::z()));
        assert_eq!(cloud[0].position.x, 1.0);
    }
}
