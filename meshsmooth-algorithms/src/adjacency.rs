//! Vertex adjacency graph
//!
//! Two vertices are neighbors when they share at least one face. Neighbor
//! sets are ordered so that traversals over the graph are reproducible.

use std::collections::BTreeSet;

use meshsmooth_core::{Error, Result};
use tracing::debug;

/// Symmetric vertex-to-neighbors mapping for vertices `0..vertex_count`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdjacencyGraph {
    neighbors: Vec<BTreeSet<usize>>,
}

impl AdjacencyGraph {
    /// Build the graph in one pass over the faces.
    ///
    /// Vertices referenced by no face get an empty neighbor set.
    pub fn build(vertex_count: usize, faces: &[[usize; 3]]) -> Result<Self> {
        let mut neighbors = vec![BTreeSet::new(); vertex_count];

        for face in faces {
            if let Some(&bad) = face.iter().find(|&&v| v >= vertex_count) {
                return Err(Error::MalformedMesh(format!(
                    "face {:?} references vertex {} outside 0..{}",
                    face, bad, vertex_count
                )));
            }

            let [a, b, c] = *face;
            for (v, others) in [(a, [b, c]), (b, [a, c]), (c, [a, b])] {
                for other in others {
                    if other != v {
                        neighbors[v].insert(other);
                    }
                }
            }
        }

        let graph = Self { neighbors };
        debug!(
            "Built adjacency graph: {} vertices, {} edges",
            graph.vertex_count(),
            graph.edge_count()
        );
        Ok(graph)
    }

    /// Number of vertices, including isolated ones
    pub fn vertex_count(&self) -> usize {
        self.neighbors.len()
    }

    /// Neighbors of `vertex`, in ascending index order
    pub fn neighbors(&self, vertex: usize) -> &BTreeSet<usize> {
        &self.neighbors[vertex]
    }

    pub fn degree(&self, vertex: usize) -> usize {
        self.neighbors[vertex].len()
    }

    pub fn is_isolated(&self, vertex: usize) -> bool {
        self.neighbors[vertex].is_empty()
    }

    /// Number of undirected edges
    pub fn edge_count(&self) -> usize {
        self.neighbors.iter().map(BTreeSet::len).sum::<usize>() / 2
    }
}
