//! Mesh cleanup after reconstruction
//!
//! Poisson surfaces can carry slivers, repeated geometry, fins on
//! non-manifold edges and small detached blobs. The passes here remove
//! them and keep only the largest edge-connected piece.

use std::collections::{HashMap, HashSet};

use meshsmooth_core::{triangle_area, Bounded, Point3f, TriangleMesh};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::components::{edge_faces, find_components};

/// Which cleanup passes to run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupConfig {
    /// Drop triangles with repeated indices or near-zero area
    pub remove_degenerate: bool,
    /// Area threshold as a fraction of the squared bounding box diagonal
    pub relative_area_epsilon: f32,
    /// Merge vertices with identical coordinates
    pub merge_duplicate_vertices: bool,
    /// Drop repeated triangles (either winding)
    pub remove_duplicate_faces: bool,
    /// Keep at most two faces on every edge
    pub fix_non_manifold_edges: bool,
    /// Keep only the component with the most triangles
    pub keep_largest_component: bool,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            remove_degenerate: true,
            relative_area_epsilon: 1e-12,
            merge_duplicate_vertices: true,
            remove_duplicate_faces: true,
            fix_non_manifold_edges: true,
            keep_largest_component: true,
        }
    }
}

/// Counts of what each cleanup pass removed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupReport {
    pub merged_vertices: usize,
    pub degenerate_faces: usize,
    pub duplicate_faces: usize,
    pub non_manifold_faces: usize,
    pub removed_components: usize,
    pub unreferenced_vertices: usize,
}

/// Post-reconstruction cleanup capability
pub trait MeshCleaner {
    /// Clean `mesh` in place and report what was removed
    fn clean(&self, mesh: &mut TriangleMesh) -> CleanupReport;
}

/// Runs the passes enabled in its [`CleanupConfig`]
#[derive(Debug, Clone, Default)]
pub struct StandardCleaner {
    pub config: CleanupConfig,
}

impl StandardCleaner {
    pub fn new(config: CleanupConfig) -> Self {
        Self { config }
    }
}

impl MeshCleaner for StandardCleaner {
    fn clean(&self, mesh: &mut TriangleMesh) -> CleanupReport {
        let config = &self.config;
        let mut report = CleanupReport::default();

        if config.merge_duplicate_vertices {
            report.merged_vertices = merge_duplicate_vertices(mesh);
        }
        if config.remove_degenerate {
            let diagonal = mesh.diagonal();
            let threshold = config.relative_area_epsilon * diagonal * diagonal;
            report.degenerate_faces = remove_degenerate_triangles(mesh, threshold);
        }
        if config.remove_duplicate_faces {
            report.duplicate_faces = remove_duplicate_faces(mesh);
        }
        if config.fix_non_manifold_edges {
            report.non_manifold_faces = fix_non_manifold_edges(mesh);
        }
        if config.keep_largest_component {
            report.removed_components = keep_largest_component(mesh);
        }
        report.unreferenced_vertices = remove_unreferenced_vertices(mesh);

        info!(
            "Cleanup left {} vertices, {} faces: {:?}",
            mesh.vertex_count(),
            mesh.face_count(),
            report
        );
        report
    }
}

/// Remove triangles with a repeated index or area below `area_threshold`.
///
/// Returns the number of triangles removed.
pub fn remove_degenerate_triangles(mesh: &mut TriangleMesh, area_threshold: f32) -> usize {
    let original_count = mesh.faces.len();
    let vertices = &mesh.vertices;

    mesh.faces.retain(|&[a, b, c]| {
        a != b
            && b != c
            && a != c
            && triangle_area(&vertices[a], &vertices[b], &vertices[c]) > area_threshold
    });

    let removed = original_count - mesh.faces.len();
    if removed > 0 {
        debug!("Removed {} degenerate triangles", removed);
    }
    removed
}

/// Merge vertices with bitwise-identical coordinates and remap faces.
///
/// Returns the number of vertices merged away.
pub fn merge_duplicate_vertices(mesh: &mut TriangleMesh) -> usize {
    let original_count = mesh.vertices.len();
    let mut first_seen: HashMap<[u32; 3], usize> = HashMap::with_capacity(original_count);
    let mut remap = Vec::with_capacity(original_count);
    let mut merged: Vec<Point3f> = Vec::with_capacity(original_count);

    for v in &mesh.vertices {
        let key = [(v.x + 0.0).to_bits(), (v.y + 0.0).to_bits(), (v.z + 0.0).to_bits()];
        let index = *first_seen.entry(key).or_insert_with(|| {
            merged.push(*v);
            merged.len() - 1
        });
        remap.push(index);
    }

    let removed = original_count - merged.len();
    if removed > 0 {
        for face in &mut mesh.faces {
            for v in face.iter_mut() {
                *v = remap[*v];
            }
        }
        mesh.vertices = merged;
        debug!("Merged {} duplicated vertices", removed);
    }
    removed
}

/// Remove repeated triangles, treating both windings as the same triangle.
///
/// The first occurrence is kept. Returns the number of triangles removed.
pub fn remove_duplicate_faces(mesh: &mut TriangleMesh) -> usize {
    let original_count = mesh.faces.len();
    let mut seen: HashSet<[usize; 3]> = HashSet::with_capacity(original_count);

    mesh.faces.retain(|face| {
        let mut key = *face;
        key.sort_unstable();
        seen.insert(key)
    });

    let removed = original_count - mesh.faces.len();
    if removed > 0 {
        debug!("Removed {} duplicated triangles", removed);
    }
    removed
}

/// Keep the two largest faces on every edge shared by more than two faces.
///
/// Returns the number of faces removed.
pub fn fix_non_manifold_edges(mesh: &mut TriangleMesh) -> usize {
    let edges = edge_faces(&mesh.faces);
    let areas: Vec<f32> = mesh
        .faces
        .iter()
        .map(|f| {
            let [a, b, c] = mesh.face_corners(f);
            triangle_area(&a, &b, &c)
        })
        .collect();

    let mut to_remove: HashSet<usize> = HashSet::new();
    let mut non_manifold_edges = 0;

    for incident in edges.values() {
        if incident.len() <= 2 {
            continue;
        }
        non_manifold_edges += 1;

        let mut ranked = incident.clone();
        ranked.sort_by(|&x, &y| areas[y].total_cmp(&areas[x]).then(x.cmp(&y)));
        to_remove.extend(ranked.into_iter().skip(2));
    }

    if to_remove.is_empty() {
        return 0;
    }

    let mut index = 0;
    mesh.faces.retain(|_| {
        let keep = !to_remove.contains(&index);
        index += 1;
        keep
    });

    debug!(
        "Fixed {} non-manifold edges by removing {} faces",
        non_manifold_edges,
        to_remove.len()
    );
    to_remove.len()
}

/// Keep only the largest edge-connected component.
///
/// Returns the number of components removed. Vertices are left in place;
/// run [`remove_unreferenced_vertices`] afterwards to compact them.
pub fn keep_largest_component(mesh: &mut TriangleMesh) -> usize {
    let components = find_components(&mesh.faces);
    if components.len() <= 1 {
        return 0;
    }

    let removed = components.len() - 1;
    let largest = &components[0];
    info!(
        "Keeping largest component ({} faces), removing {} smaller component(s)",
        largest.len(),
        removed
    );

    mesh.faces = largest.iter().map(|&fi| mesh.faces[fi]).collect();
    removed
}

/// Remove vertices no face references and compact the vertex array.
///
/// Returns the number of vertices removed.
pub fn remove_unreferenced_vertices(mesh: &mut TriangleMesh) -> usize {
    let original_count = mesh.vertices.len();
    let mut remap: Vec<Option<usize>> = vec![None; original_count];
    let mut compacted = Vec::with_capacity(original_count);

    for face in &mesh.faces {
        for &v in face {
            if remap[v].is_none() {
                remap[v] = Some(compacted.len());
                compacted.push(mesh.vertices[v]);
            }
        }
    }

    let removed = original_count - compacted.len();
    if removed == 0 {
        return 0;
    }

    for face in &mut mesh.faces {
        for v in face.iter_mut() {
            if let Some(new_index) = remap[*v] {
                *v = new_index;
            }
        }
    }
    mesh.vertices = compacted;

    debug!("Removed {} unreferenced vertices", removed);
    removed
}
