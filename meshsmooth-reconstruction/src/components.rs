//! Edge connectivity and connected components of triangle meshes

use std::cmp::Reverse;
use std::collections::HashMap;

use tracing::debug;

/// Undirected edge key with the smaller index first
pub fn edge_key(a: usize, b: usize) -> (usize, usize) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Faces incident to each edge
pub fn edge_faces(faces: &[[usize; 3]]) -> HashMap<(usize, usize), Vec<usize>> {
    let mut map: HashMap<(usize, usize), Vec<usize>> = HashMap::with_capacity(faces.len() * 3 / 2);
    for (fi, &[a, b, c]) in faces.iter().enumerate() {
        for (u, v) in [(a, b), (b, c), (c, a)] {
            map.entry(edge_key(u, v)).or_default().push(fi);
        }
    }
    map
}

/// Group faces into components connected through shared edges.
///
/// Components are returned largest first; equal sizes keep discovery order.
pub fn find_components(faces: &[[usize; 3]]) -> Vec<Vec<usize>> {
    let edges = edge_faces(faces);

    let mut face_neighbors: Vec<Vec<usize>> = vec![Vec::new(); faces.len()];
    for incident in edges.values() {
        for (i, &f0) in incident.iter().enumerate() {
            for &f1 in &incident[i + 1..] {
                face_neighbors[f0].push(f1);
                face_neighbors[f1].push(f0);
            }
        }
    }

    let mut visited = vec![false; faces.len()];
    let mut components: Vec<Vec<usize>> = Vec::new();

    for start in 0..faces.len() {
        if visited[start] {
            continue;
        }

        let mut component = Vec::new();
        let mut stack = vec![start];
        visited[start] = true;

        while let Some(face) = stack.pop() {
            component.push(face);
            for &next in &face_neighbors[face] {
                if !visited[next] {
                    visited[next] = true;
                    stack.push(next);
                }
            }
        }

        component.sort_unstable();
        components.push(component);
    }

    components.sort_by_key(|c| Reverse(c.len()));

    debug!(
        "Found {} connected component(s) over {} faces",
        components.len(),
        faces.len()
    );
    components
}
