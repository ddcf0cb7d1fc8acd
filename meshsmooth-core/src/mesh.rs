//! Indexed triangle mesh

use crate::point::*;
use serde::{Deserialize, Serialize};

/// A triangle mesh with a shared vertex list and index faces
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriangleMesh {
    pub vertices: Vec<Point3f>,
    pub faces: Vec<[usize; 3]>,
}

impl TriangleMesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mesh from vertices and faces
    pub fn from_vertices_and_faces(vertices: Vec<Point3f>, faces: Vec<[usize; 3]>) -> Self {
        Self { vertices, faces }
    }

    /// Get the number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of faces
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Check if the mesh is empty
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.faces.is_empty()
    }

    /// Corner positions of a face
    pub fn face_corners(&self, face: &[usize; 3]) -> [Point3f; 3] {
        [
            self.vertices[face[0]],
            self.vertices[face[1]],
            self.vertices[face[2]],
        ]
    }

    /// Unit winding normal of every face; degenerate faces get a zero vector
    pub fn calculate_face_normals(&self) -> Vec<Vector3f> {
        self.faces
            .iter()
            .map(|face| {
                let [a, b, c] = self.face_corners(face);
                clamped_normalize(&triangle_cross(&a, &b, &c))
            })
            .collect()
    }

    /// Whether every face references three distinct, in-range vertices
    pub fn has_valid_faces(&self) -> bool {
        let n = self.vertices.len();
        self.faces.iter().all(|&[a, b, c]| {
            a < n && b < n && c < n && a != b && b != c && a != c
        })
    }
}
