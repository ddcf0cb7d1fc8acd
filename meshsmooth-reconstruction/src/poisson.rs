//! Poisson surface reconstruction

use meshsmooth_core::{Error, OrientedPointCloud, Point3f, Result, TriangleMesh};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::SurfaceReconstructor;

/// Fewest points accepted for a stable solve
pub const MIN_POINTS: usize = 10;

/// Density estimation never goes deeper than this
const MAX_DENSITY_DEPTH: usize = 6;

/// Parameters passed to a [`SurfaceReconstructor`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconstructionParams {
    /// Maximum octree depth (default: 7)
    pub depth: u32,
    /// Weight of point positions against normals (default: 1.1)
    pub scale: f32,
    /// Fit the isosurface linearly inside each cell (default: false)
    pub linear_fit: bool,
    /// Gauss-Seidel relaxations per octree level (default: 10)
    pub relaxation_iterations: usize,
}

impl Default for ReconstructionParams {
    fn default() -> Self {
        Self {
            depth: 7,
            scale: 1.1,
            linear_fit: false,
            relaxation_iterations: 10,
        }
    }
}

impl ReconstructionParams {
    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }
}

/// Screened Poisson reconstruction backed by the `poisson_reconstruction` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct PoissonReconstructor;

impl PoissonReconstructor {
    pub fn new() -> Self {
        Self
    }
}

impl SurfaceReconstructor for PoissonReconstructor {
    fn reconstruct(
        &self,
        cloud: &OrientedPointCloud,
        params: &ReconstructionParams,
    ) -> Result<TriangleMesh> {
        poisson_reconstruction(cloud, params)
    }
}

/// Reconstruct a closed surface from an oriented point cloud.
///
/// Normals must be unit length; the cloud needs at least [`MIN_POINTS`]
/// points. Every failure is reported as [`Error::ReconstructionFailure`].
pub fn poisson_reconstruction(
    cloud: &OrientedPointCloud,
    params: &ReconstructionParams,
) -> Result<TriangleMesh> {
    if cloud.len() < MIN_POINTS {
        return Err(Error::ReconstructionFailure(format!(
            "point cloud too small for Poisson reconstruction ({} points, minimum {})",
            cloud.len(),
            MIN_POINTS
        )));
    }
    if params.depth == 0 {
        return Err(Error::ReconstructionFailure(
            "octree depth must be positive".to_string(),
        ));
    }
    if params.linear_fit {
        warn!("Linear fit is not supported by this reconstructor; ignoring");
    }

    let points: Vec<nalgebra::Point3<f64>> = cloud
        .points
        .par_iter()
        .map(|p| p.position.cast::<f64>())
        .collect();

    let normals: Vec<nalgebra::Vector3<f64>> = cloud
        .points
        .par_iter()
        .map(|p| p.normal.cast::<f64>())
        .collect();

    if let Some((i, magnitude)) = normals
        .iter()
        .map(|n| n.magnitude())
        .enumerate()
        .find(|(_, m)| !m.is_finite() || *m < 1e-6 || (m - 1.0).abs() > 0.1)
    {
        return Err(Error::ReconstructionFailure(format!(
            "invalid normal at point {}: magnitude {}",
            i, magnitude
        )));
    }

    let max_depth = params.depth as usize;
    let density_depth = max_depth.min(MAX_DENSITY_DEPTH);
    debug!(
        "Poisson solve over {} points (depth {}, density depth {}, screening {})",
        points.len(),
        max_depth,
        density_depth,
        params.scale
    );

    let poisson = poisson_reconstruction::PoissonReconstruction::from_points_and_normals(
        &points,
        &normals,
        params.scale as f64,
        density_depth,
        max_depth,
        params.relaxation_iterations,
    );
    let buffers = poisson.reconstruct_mesh_buffers();

    if buffers.vertices().is_empty() {
        return Err(Error::ReconstructionFailure(
            "Poisson reconstruction generated no vertices".to_string(),
        ));
    }

    let indices = buffers.indices();
    if indices.len() % 3 != 0 {
        return Err(Error::ReconstructionFailure(
            "invalid triangle indices from Poisson reconstruction".to_string(),
        ));
    }

    let vertices: Vec<Point3f> = buffers
        .vertices()
        .par_iter()
        .map(|v| v.cast::<f32>())
        .collect();

    let faces: Vec<[usize; 3]> = indices
        .chunks_exact(3)
        .map(|c| [c[0] as usize, c[1] as usize, c[2] as usize])
        .collect();

    if faces.is_empty() {
        return Err(Error::ReconstructionFailure(
            "Poisson reconstruction generated no triangles".to_string(),
        ));
    }
    if faces.iter().flatten().any(|&i| i >= vertices.len()) {
        return Err(Error::ReconstructionFailure(
            "Poisson reconstruction produced out-of-range indices".to_string(),
        ));
    }

    Ok(TriangleMesh::from_vertices_and_faces(vertices, faces))
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshsmooth_core::{NormalPoint3f, Vector3f};

    fn flat_cloud(n: usize) -> OrientedPointCloud {
        (0..n)
            .map(|i| {
                NormalPoint3f::new(
                    Point3f::new(i as f32, (i % 3) as f32, 0.0),
                    Vector3f::new(0.0, 0.0, 1.0),
                )
            })
            .collect()
    }

    #[test]
    fn test_params_default() {
        let params = ReconstructionParams::default();
        assert_eq!(params.depth, 7);
        assert_eq!(params.scale, 1.1);
        assert!(!params.linear_fit);
        assert_eq!(params.with_depth(9).depth, 9);
    }

    #[test]
    fn test_empty_cloud_rejected() {
        let result = PoissonReconstructor::new()
            .reconstruct(&OrientedPointCloud::new(), &ReconstructionParams::default());
        assert!(matches!(result, Err(Error::ReconstructionFailure(_))));
    }

    #[test]
    fn test_too_few_points_rejected() {
        let err = poisson_reconstruction(&flat_cloud(3), &ReconstructionParams::default())
            .unwrap_err();
        assert!(err.to_string().contains("too small"));
    }

    #[test]
    fn test_zero_normal_rejected() {
        let mut cloud = flat_cloud(12);
        cloud.points[4].normal = Vector3f::zeros();

        let err = poisson_reconstruction(&cloud, &ReconstructionParams::default()).unwrap_err();
        assert!(matches!(err, Error::ReconstructionFailure(ref msg) if msg.contains("point 4")));
    }
}
