//! I/O operations for meshes and point clouds
//!
//! This crate reads facet-based mesh files into raw triangle soup, writes
//! indexed meshes back out, and dumps oriented point clouds for inspection.

pub mod stl;
pub mod ply;

pub use stl::{read_soup, write_stl, StlEncoding};
pub use ply::{read_oriented_cloud, write_oriented_cloud};

use meshsmooth_core::{Error, Result, TriangleMesh, TriangleSoup};
use std::path::Path;

/// Persistence layer used by the smoothing pipeline
pub trait MeshStore {
    /// Load a mesh file as raw triangle soup
    fn load_soup(&self, path: &Path) -> Result<TriangleSoup>;

    /// Save an indexed mesh
    fn save_mesh(&self, mesh: &TriangleMesh, path: &Path) -> Result<()>;

    /// File extension (without the dot) of files this store writes
    fn extension(&self) -> &str;
}

/// STL files in a fixed output encoding
#[derive(Debug, Clone, Copy, Default)]
pub struct StlStore {
    pub encoding: StlEncoding,
}

impl StlStore {
    pub fn new(encoding: StlEncoding) -> Self {
        Self { encoding }
    }
}

impl MeshStore for StlStore {
    fn load_soup(&self, path: &Path) -> Result<TriangleSoup> {
        read_mesh_soup(path)
    }

    fn save_mesh(&self, mesh: &TriangleMesh, path: &Path) -> Result<()> {
        write_stl(mesh, path, self.encoding)
    }

    fn extension(&self) -> &str {
        "stl"
    }
}

/// Auto-detect format and read triangle soup
pub fn read_mesh_soup<P: AsRef<Path>>(path: P) -> Result<TriangleSoup> {
    let path = path.as_ref();
    match path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_ascii_lowercase())
        .as_deref()
    {
        Some("stl") => stl::read_soup(path),
        _ => Err(Error::UnsupportedFormat(format!(
            "Unsupported mesh format: {:?}",
            path.extension()
        ))),
    }
}
