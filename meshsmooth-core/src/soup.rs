//! Raw triangle soup as read from facet-based formats

use crate::point::*;

/// One facet as stored in the source file: its own corner copies and a normal
#[derive(Debug, Clone, PartialEq)]
pub struct RawFacet {
    pub normal: Vector3f,
    pub corners: Vec<Point3f>,
}

impl RawFacet {
    pub fn new(normal: Vector3f, corners: Vec<Point3f>) -> Self {
        Self { normal, corners }
    }

    /// A facet whose normal is left for the loader to derive from the winding
    pub fn from_corners(a: Point3f, b: Point3f, c: Point3f) -> Self {
        Self {
            normal: Vector3f::zeros(),
            corners: vec![a, b, c],
        }
    }
}

/// Facets with no shared vertex indexing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriangleSoup {
    pub facets: Vec<RawFacet>,
}

impl TriangleSoup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_facets(facets: Vec<RawFacet>) -> Self {
        Self { facets }
    }

    pub fn len(&self) -> usize {
        self.facets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facets.is_empty()
    }

    pub fn push(&mut self, facet: RawFacet) {
        self.facets.push(facet);
    }
}

impl FromIterator<RawFacet> for TriangleSoup {
    fn from_iter<I: IntoIterator<Item = RawFacet>>(iter: I) -> Self {
        Self {
            facets: iter.into_iter().collect(),
        }
    }
}

impl From<&crate::TriangleMesh> for TriangleSoup {
    /// Expand an indexed mesh back into per-facet corner copies with winding normals
    fn from(mesh: &crate::TriangleMesh) -> Self {
        mesh.faces
            .iter()
            .map(|face| {
                let [a, b, c] = mesh.face_corners(face);
                RawFacet::new(clamped_normalize(&triangle_cross(&a, &b, &c)), vec![a, b, c])
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TriangleMesh;

    #[test]
    fn test_soup_from_mesh_copies_corners() {
        let mesh = TriangleMesh::from_vertices_and_faces(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
                Point3f::new(1.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2], [1, 3, 2]],
        );
        let soup = TriangleSoup::from(&mesh);

        assert_eq!(soup.len(), 2);
        assert_eq!(soup.facets[1].corners, vec![mesh.vertices[1], mesh.vertices[3], mesh.vertices[2]]);
        assert!((soup.facets[0].normal.z - 1.0).abs() < 1e-6);
    }
}
