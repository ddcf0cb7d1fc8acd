//! Vertex normals from facet normals
//!
//! Each vertex normal is the normalized, weighted sum of the normals of the
//! faces around it. Orientation is inherited from the facet normals; this
//! module never flips individual faces.

use meshsmooth_core::{
    clamped_normalize, is_degenerate_direction, triangle_area, Error, Point3f, Result, Vector3f,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// How much each incident face contributes to a vertex normal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalWeighting {
    /// Weight by triangle area
    #[default]
    Area,
    /// Every incident face counts once
    Uniform,
}

/// Per-vertex unit normals plus the vertices that could not be oriented
#[derive(Debug, Clone)]
pub struct VertexNormals {
    pub normals: Vec<Vector3f>,
    /// Sorted and unique, so `is_valid` can binary search it
    degenerate: Vec<usize>,
}

impl VertexNormals {
    /// Pair `normals` with the vertices that have no usable direction.
    /// `degenerate` may come in any order and with repeats.
    pub fn from_parts(normals: Vec<Vector3f>, mut degenerate: Vec<usize>) -> Self {
        degenerate.sort_unstable();
        degenerate.dedup();
        Self { normals, degenerate }
    }

    /// Vertices with no incident weight, ascending; their normal is the zero vector
    pub fn degenerate(&self) -> &[usize] {
        &self.degenerate
    }

    pub fn len(&self) -> usize {
        self.normals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.normals.is_empty()
    }

    /// Whether vertex `index` has a usable direction
    pub fn is_valid(&self, index: usize) -> bool {
        self.degenerate.binary_search(&index).is_err()
    }

    /// Reverse every normal, for inputs whose facets are wound inward
    pub fn flip(&mut self) {
        self.normals.iter_mut().for_each(|n| *n = -*n);
    }
}

/// Weighted facet-normal sums per vertex, before normalization.
pub fn accumulate_raw(
    vertices: &[Point3f],
    faces: &[[usize; 3]],
    facet_normals: &[Vector3f],
    weighting: NormalWeighting,
) -> Result<Vec<Vector3f>> {
    if faces.len() != facet_normals.len() {
        return Err(Error::MalformedMesh(format!(
            "{} faces but {} facet normals",
            faces.len(),
            facet_normals.len()
        )));
    }

    let mut accum = vec![Vector3f::zeros(); vertices.len()];

    for (face, normal) in faces.iter().zip(facet_normals) {
        if face.iter().any(|&v| v >= vertices.len()) {
            return Err(Error::MalformedMesh(format!(
                "face {:?} references a vertex outside 0..{}",
                face,
                vertices.len()
            )));
        }

        let weight = match weighting {
            NormalWeighting::Area => {
                triangle_area(&vertices[face[0]], &vertices[face[1]], &vertices[face[2]])
            }
            NormalWeighting::Uniform => 1.0,
        };

        let contribution = normal * weight;
        for &v in face {
            accum[v] += contribution;
        }
    }

    Ok(accum)
}

/// Compute one unit normal per vertex from its incident facet normals.
///
/// Vertices without incident weight (unreferenced, or touched only by
/// zero-area faces under area weighting) keep a zero normal and are listed
/// in [`VertexNormals::degenerate()`].
pub fn accumulate_vertex_normals(
    vertices: &[Point3f],
    faces: &[[usize; 3]],
    facet_normals: &[Vector3f],
    weighting: NormalWeighting,
) -> Result<VertexNormals> {
    let accum = accumulate_raw(vertices, faces, facet_normals, weighting)?;

    let normals: Vec<Vector3f> = accum.par_iter().map(clamped_normalize).collect();

    let degenerate: Vec<usize> = accum
        .iter()
        .enumerate()
        .filter(|(_, n)| is_degenerate_direction(n))
        .map(|(i, _)| i)
        .collect();

    for &index in &degenerate {
        warn!(vertex = index, "Degenerate vertex: no incident face weight, normal left as zero");
    }

    debug!(
        "Computed {} vertex normals ({} degenerate, {:?} weighting)",
        normals.len(),
        degenerate.len(),
        weighting
    );

    Ok(VertexNormals { normals, degenerate })
}
