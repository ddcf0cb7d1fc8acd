//! Triangle soup deduplication
//!
//! Facet formats such as STL store three private corner copies per triangle.
//! This module merges bitwise-identical corners into a shared vertex list and
//! rewrites each facet as a triple of vertex indices.

use std::collections::HashMap;

use meshsmooth_core::{
    clamped_normalize, is_degenerate_direction, triangle_cross, Error, Point3f, Result,
    TriangleMesh, TriangleSoup, Vector3f,
};
use tracing::{debug, info, warn};

/// Indexed mesh produced from a triangle soup
#[derive(Debug, Clone)]
pub struct IndexedMesh {
    /// Deduplicated vertices and index faces
    pub mesh: TriangleMesh,
    /// One unit normal per face of `mesh`
    pub facet_normals: Vec<Vector3f>,
    /// Facets dropped because two or more corners coincided
    pub collapsed_faces: usize,
}

/// Exact coordinate key; `-0.0` folds into `0.0` so equal values share a key
fn coordinate_key(p: &Point3f) -> [u32; 3] {
    [
        (p.x + 0.0).to_bits(),
        (p.y + 0.0).to_bits(),
        (p.z + 0.0).to_bits(),
    ]
}

/// Merge identical corners of a triangle soup into an indexed mesh.
///
/// Vertex indices follow order of first appearance, so the same soup always
/// yields the same mesh. Facet normals are re-normalized; a zero or
/// non-finite source normal is replaced by the winding normal.
///
/// # Errors
/// `Error::MalformedMesh` for an empty soup, a facet without exactly three
/// corners, a non-finite coordinate, or a soup where every facet collapses.
pub fn deduplicate(soup: &TriangleSoup) -> Result<IndexedMesh> {
    if soup.is_empty() {
        return Err(Error::MalformedMesh("triangle list is empty".to_string()));
    }

    let mut lookup: HashMap<[u32; 3], usize> = HashMap::with_capacity(soup.len() / 2 + 3);
    let mut vertices: Vec<Point3f> = Vec::with_capacity(soup.len() / 2 + 3);
    let mut faces: Vec<[usize; 3]> = Vec::with_capacity(soup.len());
    let mut facet_normals: Vec<Vector3f> = Vec::with_capacity(soup.len());
    let mut collapsed_faces = 0;

    for (facet_index, facet) in soup.facets.iter().enumerate() {
        let [a, b, c]: [Point3f; 3] = facet.corners.as_slice().try_into().map_err(|_| {
            Error::MalformedMesh(format!(
                "facet {} has {} corners, expected 3",
                facet_index,
                facet.corners.len()
            ))
        })?;

        let mut keys = [[0u32; 3]; 3];
        for (key, corner) in keys.iter_mut().zip([&a, &b, &c]) {
            if !corner.iter().all(|v| v.is_finite()) {
                return Err(Error::MalformedMesh(format!(
                    "facet {} has a non-finite corner {:?}",
                    facet_index, corner
                )));
            }
            *key = coordinate_key(corner);
        }

        // Checked on keys so a dropped facet never adds vertices
        if keys[0] == keys[1] || keys[1] == keys[2] || keys[0] == keys[2] {
            collapsed_faces += 1;
            debug!(facet = facet_index, "Facet corners coincide, dropping facet");
            continue;
        }

        let mut ids = [0usize; 3];
        for ((slot, key), corner) in ids.iter_mut().zip(keys).zip([&a, &b, &c]) {
            *slot = *lookup.entry(key).or_insert_with(|| {
                vertices.push(*corner);
                vertices.len() - 1
            });
        }

        let normal = if is_degenerate_direction(&facet.normal) {
            clamped_normalize(&triangle_cross(&a, &b, &c))
        } else {
            clamped_normalize(&facet.normal)
        };

        faces.push(ids);
        facet_normals.push(normal);
    }

    if faces.is_empty() {
        return Err(Error::MalformedMesh(format!(
            "all {} facets are collapsed",
            soup.len()
        )));
    }

    if collapsed_faces > 0 {
        warn!(
            "Dropped {} facet(s) whose corners coincide after deduplication",
            collapsed_faces
        );
    }

    info!(
        "Deduplicated {} facets into {} vertices and {} faces",
        soup.len(),
        vertices.len(),
        faces.len()
    );

    Ok(IndexedMesh {
        mesh: TriangleMesh::from_vertices_and_faces(vertices, faces),
        facet_normals,
        collapsed_faces,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use meshsmooth_core::RawFacet;
    use std::collections::HashSet;

    fn p(x: f32, y: f32, z: f32) -> Point3f {
        Point3f::new(x, y, z)
    }

    /// Two triangles of a unit square sharing the diagonal
    fn square_soup() -> TriangleSoup {
        TriangleSoup::from_facets(vec![
            RawFacet::new(Vector3f::new(0.0, 0.0, 2.0), vec![p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(1.0, 1.0, 0.0)]),
            RawFacet::new(Vector3f::new(0.0, 0.0, 1.0), vec![p(0.0, 0.0, 0.0), p(1.0, 1.0, 0.0), p(0.0, 1.0, 0.0)]),
        ])
    }

    #[test]
    fn test_shared_corners_merge() {
        let indexed = deduplicate(&square_soup()).unwrap();
        assert_eq!(indexed.mesh.vertex_count(), 4);
        assert_eq!(indexed.mesh.faces, vec![[0, 1, 2], [0, 2, 3]]);
        assert_eq!(indexed.collapsed_faces, 0);
    }

    #[test]
    fn test_vertices_unique_and_faces_in_range() {
        let mut soup = square_soup();
        // Same square again, shifted up: shares nothing but must not duplicate itself
        for facet in square_soup().facets {
            let corners = facet.corners.iter().map(|c| p(c.x, c.y, 1.0)).collect();
            soup.push(RawFacet::new(facet.normal, corners));
        }
        let indexed = deduplicate(&soup).unwrap();

        let keys: HashSet<[u32; 3]> = indexed.mesh.vertices.iter().map(coordinate_key).collect();
        assert_eq!(keys.len(), indexed.mesh.vertex_count());
        assert_eq!(indexed.mesh.vertex_count(), 8);
        assert!(indexed.mesh.has_valid_faces());
    }

    #[test]
    fn test_negative_zero_merges() {
        let soup = TriangleSoup::from_facets(vec![
            RawFacet::from_corners(p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(0.0, 1.0, 0.0)),
            RawFacet::from_corners(p(-0.0, 0.0, -0.0), p(0.0, -1.0, 0.0), p(1.0, 0.0, 0.0)),
        ]);
        let indexed = deduplicate(&soup).unwrap();
        assert_eq!(indexed.mesh.vertex_count(), 4);
    }

    #[test]
    fn test_first_appearance_order_is_deterministic() {
        let a = deduplicate(&square_soup()).unwrap();
        let b = deduplicate(&square_soup()).unwrap();
        assert_eq!(a.mesh, b.mesh);
        assert_eq!(a.mesh.vertices[3], p(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_facet_normals_renormalized() {
        let indexed = deduplicate(&square_soup()).unwrap();
        for n in &indexed.facet_normals {
            assert_relative_eq!(n.norm(), 1.0, epsilon = 1e-6);
            assert_relative_eq!(n.z, 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_zero_normal_falls_back_to_winding() {
        let soup = TriangleSoup::from_facets(vec![RawFacet::from_corners(
            p(0.0, 0.0, 0.0),
            p(0.0, 1.0, 0.0),
            p(1.0, 0.0, 0.0),
        )]);
        let indexed = deduplicate(&soup).unwrap();
        assert_relative_eq!(indexed.facet_normals[0].z, -1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_empty_soup_rejected() {
        let err = deduplicate(&TriangleSoup::new()).unwrap_err();
        assert!(matches!(err, Error::MalformedMesh(_)));
    }

    #[test]
    fn test_wrong_corner_count_rejected() {
        let soup = TriangleSoup::from_facets(vec![RawFacet::new(
            Vector3f::z(),
            vec![p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(1.0, 1.0, 0.0), p(0.0, 1.0, 0.0)],
        )]);
        match deduplicate(&soup) {
            Err(Error::MalformedMesh(msg)) => assert!(msg.contains("4 corners")),
            other => panic!("expected MalformedMesh, got {:?}", other),
        }
    }

    #[test]
    fn test_non_finite_corner_rejected() {
        let soup = TriangleSoup::from_facets(vec![RawFacet::from_corners(
            p(f32::NAN, 0.0, 0.0),
            p(1.0, 0.0, 0.0),
            p(0.0, 1.0, 0.0),
        )]);
        assert!(matches!(deduplicate(&soup), Err(Error::MalformedMesh(_))));
    }

    #[test]
    fn test_collapsed_facets_are_counted() {
        let mut soup = square_soup();
        soup.push(RawFacet::from_corners(p(0.0, 0.0, 0.0), p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0)));
        let indexed = deduplicate(&soup).unwrap();
        assert_eq!(indexed.collapsed_faces, 1);
        assert_eq!(indexed.mesh.face_count(), 2);
        assert_eq!(indexed.facet_normals.len(), 2);

        let only_collapsed = TriangleSoup::from_facets(vec![RawFacet::from_corners(
            p(0.0, 0.0, 0.0),
            p(0.0, 0.0, 0.0),
            p(0.0, 0.0, 0.0),
        )]);
        assert!(matches!(deduplicate(&only_collapsed), Err(Error::MalformedMesh(_))));
    }

    #[test]
    fn test_collapsed_facet_adds_no_vertices() {
        let soup = TriangleSoup::from_facets(vec![
            RawFacet::from_corners(p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(0.0, 1.0, 0.0)),
            RawFacet::from_corners(p(0.0, 0.0, 0.0), p(0.0, 0.0, 0.0), p(9.0, 9.0, 9.0)),
        ]);
        let indexed = deduplicate(&soup).unwrap();

        assert_eq!(indexed.collapsed_faces, 1);
        assert_eq!(indexed.mesh.vertex_count(), 3);
        assert!(!indexed.mesh.vertices.contains(&p(9.0, 9.0, 9.0)));

        let referenced: HashSet<usize> = indexed.mesh.faces.iter().flatten().copied().collect();
        assert_eq!(referenced.len(), indexed.mesh.vertex_count());
    }
}
