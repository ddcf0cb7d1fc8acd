//! # meshsmooth reconstruction
//!
//! Surface reconstruction from oriented point clouds and the cleanup passes
//! applied to the reconstructed mesh.
//!
//! Both stages sit behind traits so the pipeline can run with stand-in
//! implementations in tests.

pub mod poisson;
pub mod cleanup;
pub mod components;

pub use poisson::*;
pub use cleanup::*;
pub use components::*;

use meshsmooth_core::{OrientedPointCloud, Result, TriangleMesh};

/// Turns an oriented point cloud into a closed triangle mesh
pub trait SurfaceReconstructor {
    fn reconstruct(
        &self,
        cloud: &OrientedPointCloud,
        params: &ReconstructionParams,
    ) -> Result<TriangleMesh>;
}

impl<T: SurfaceReconstructor + ?Sized> SurfaceReconstructor for &T {
    fn reconstruct(
        &self,
        cloud: &OrientedPointCloud,
        params: &ReconstructionParams,
    ) -> Result<TriangleMesh> {
        (**self).reconstruct(cloud, params)
    }
}
