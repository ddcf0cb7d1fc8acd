//! Single reduce-and-reconstruct pass
//!
//! Soup -> indexed mesh -> vertex normals -> adjacency -> partition ->
//! reduced oriented cloud -> surface reconstruction -> cleanup.

use std::path::Path;

use meshsmooth_algorithms::{
    accumulate_vertex_normals, deduplicate, partition_seeded, AdjacencyGraph, KeepSet, Partition,
    VertexNormals,
};
use meshsmooth_core::{
    Error, NormalPoint3f, OrientedPointCloud, Result, TriangleMesh, TriangleSoup,
};
use meshsmooth_io::{write_oriented_cloud, MeshStore};
use meshsmooth_reconstruction::{MeshCleaner, SurfaceReconstructor};
use serde::Serialize;
use tracing::{debug, info, info_span};

use crate::config::ReductionConfig;

/// Counts gathered over one pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReductionStats {
    pub input_facets: usize,
    pub input_vertices: usize,
    pub input_faces: usize,
    pub collapsed_faces: usize,
    pub degenerate_vertices: usize,
    pub seed_vertices: usize,
    pub neighbor_vertices: usize,
    pub partition_rounds: usize,
    /// Points handed to reconstruction
    pub kept_points: usize,
    /// Kept vertices left out for lack of a usable normal
    pub skipped_points: usize,
    pub output_vertices: usize,
    pub output_faces: usize,
}

/// Reconstructed mesh and the statistics of the pass that built it
#[derive(Debug, Clone)]
pub struct Reduction {
    pub mesh: TriangleMesh,
    pub stats: ReductionStats,
}

/// Collect the kept vertices with their normals, in ascending index order.
///
/// Vertices with a degenerate normal are skipped; the second value counts them.
pub fn gather_reduced_cloud(
    mesh: &TriangleMesh,
    normals: &VertexNormals,
    partition: &Partition,
    keep: KeepSet,
) -> (OrientedPointCloud, usize) {
    let kept = partition.kept(keep);
    let mut cloud = OrientedPointCloud::with_capacity(kept.len());
    let mut skipped = 0;

    for &index in kept {
        if normals.is_valid(index) {
            cloud.push(NormalPoint3f::new(mesh.vertices[index], normals.normals[index]));
        } else {
            skipped += 1;
        }
    }

    (cloud, skipped)
}

/// Runs one pass with a fixed reconstructor and cleaner
#[derive(Debug, Clone)]
pub struct Reducer<R, C> {
    config: ReductionConfig,
    reconstructor: R,
    cleaner: C,
}

impl<R: SurfaceReconstructor, C: MeshCleaner> Reducer<R, C> {
    pub fn new(config: ReductionConfig, reconstructor: R, cleaner: C) -> Self {
        Self {
            config,
            reconstructor,
            cleaner,
        }
    }

    pub fn config(&self) -> &ReductionConfig {
        &self.config
    }

    /// Reduce `soup` and reconstruct a cleaned surface from the kept points.
    pub fn reduce(&self, soup: &TriangleSoup) -> Result<Reduction> {
        self.reduce_with_dump(soup, self.config.cloud_dump.as_deref())
    }

    /// Like [`Reducer::reduce`], but dumps the reduced cloud to `cloud_dump`
    /// instead of the configured path.
    pub fn reduce_with_dump(
        &self,
        soup: &TriangleSoup,
        cloud_dump: Option<&Path>,
    ) -> Result<Reduction> {
        self.config.validate()?;

        let span = info_span!("reduce", facets = soup.len(), depth = self.config.depth);
        let _guard = span.enter();

        let mut stats = ReductionStats {
            input_facets: soup.len(),
            ..ReductionStats::default()
        };

        let indexed = deduplicate(soup)?;
        let mesh = indexed.mesh;
        stats.input_vertices = mesh.vertex_count();
        stats.input_faces = mesh.face_count();
        stats.collapsed_faces = indexed.collapsed_faces;

        let mut normals = accumulate_vertex_normals(
            &mesh.vertices,
            &mesh.faces,
            &indexed.facet_normals,
            self.config.weighting,
        )?;
        if self.config.flip_normals {
            debug!("Flipping vertex normals");
            normals.flip();
        }
        stats.degenerate_vertices = normals.degenerate().len();

        let graph = AdjacencyGraph::build(mesh.vertex_count(), &mesh.faces)?;
        debug!("Adjacency graph has {} edges", graph.edge_count());

        let partition = partition_seeded(&graph, self.config.seed);
        stats.seed_vertices = partition.seed.len();
        stats.neighbor_vertices = partition.neighbor.len();
        stats.partition_rounds = partition.rounds;

        let (cloud, skipped) = gather_reduced_cloud(&mesh, &normals, &partition, self.config.keep);
        stats.kept_points = cloud.len();
        stats.skipped_points = skipped;
        info!(
            "Kept {} of {} vertices ({} set, {} without normal)",
            cloud.len(),
            mesh.vertex_count(),
            self.config.keep,
            skipped
        );

        if let Some(path) = cloud_dump {
            write_oriented_cloud(&cloud, path)?;
            debug!("Dumped reduced cloud to {}", path.display());
        }

        let mut surface = self
            .reconstructor
            .reconstruct(&cloud, &self.config.reconstruction_params())
            .map_err(|e| match e {
                Error::ReconstructionFailure(_) => e,
                other => Error::ReconstructionFailure(other.to_string()),
            })?;
        if surface.is_empty() {
            return Err(Error::ReconstructionFailure(format!(
                "reconstruction from {} points produced an empty mesh",
                cloud.len()
            )));
        }

        let report = self.cleaner.clean(&mut surface);
        if surface.is_empty() {
            return Err(Error::ReconstructionFailure(format!(
                "cleanup removed every face ({:?})",
                report
            )));
        }

        stats.output_vertices = surface.vertex_count();
        stats.output_faces = surface.face_count();
        info!(
            "Reduced {} vertices to {} points, reconstructed {} vertices / {} faces",
            stats.input_vertices, stats.kept_points, stats.output_vertices, stats.output_faces
        );

        Ok(Reduction {
            mesh: surface,
            stats,
        })
    }

    /// Load `input` through `store`, reduce it and save the result to `output`.
    pub fn reduce_file<S: MeshStore + ?Sized>(
        &self,
        store: &S,
        input: &Path,
        output: &Path,
    ) -> Result<ReductionStats> {
        self.reduce_file_with_dump(store, input, output, self.config.cloud_dump.as_deref())
    }

    pub fn reduce_file_with_dump<S: MeshStore + ?Sized>(
        &self,
        store: &S,
        input: &Path,
        output: &Path,
        cloud_dump: Option<&Path>,
    ) -> Result<ReductionStats> {
        // Parameters are checked before touching the file system
        self.config.validate()?;

        let soup = store.load_soup(input)?;
        let reduction = self.reduce_with_dump(&soup, cloud_dump)?;
        store.save_mesh(&reduction.mesh, output)?;
        info!("Wrote {}", output.display());
        Ok(reduction.stats)
    }
}
