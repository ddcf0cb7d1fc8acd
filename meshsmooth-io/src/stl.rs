//! STL format support
//!
//! STL stores every facet with its own three corners and a facet normal, so
//! reading yields a [`TriangleSoup`]; corners are not merged here. Writing
//! supports both the binary and the ASCII encodings.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use meshsmooth_core::{
    clamped_normalize, triangle_cross, Error, Point3f, RawFacet, Result, TriangleMesh,
    TriangleSoup, Vector3f,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// On-disk STL encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StlEncoding {
    #[default]
    Binary,
    Ascii,
}

fn to_point(v: &stl_io::Vertex) -> Point3f {
    Point3f::new(v[0], v[1], v[2])
}

/// Read every facet of an STL file, binary or ASCII, without merging corners.
pub fn read_soup<P: AsRef<Path>>(path: P) -> Result<TriangleSoup> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    let triangles = stl_io::create_stl_reader(&mut reader)
        .map_err(|e| Error::Format(format!("{}: {}", path.display(), e)))?;

    let mut soup = TriangleSoup::new();
    for triangle in triangles {
        let triangle =
            triangle.map_err(|e| Error::Format(format!("{}: {}", path.display(), e)))?;
        let normal = Vector3f::new(triangle.normal[0], triangle.normal[1], triangle.normal[2]);
        let corners = triangle.vertices.iter().map(to_point).collect();
        soup.push(RawFacet::new(normal, corners));
    }

    debug!("Read {} facets from {}", soup.len(), path.display());
    Ok(soup)
}

/// Unit winding normal of a mesh face
fn face_normal(mesh: &TriangleMesh, face: &[usize; 3]) -> Vector3f {
    let [a, b, c] = mesh.face_corners(face);
    clamped_normalize(&triangle_cross(&a, &b, &c))
}

/// Write an indexed mesh as STL; facet normals are derived from the winding.
pub fn write_stl<P: AsRef<Path>>(mesh: &TriangleMesh, path: P, encoding: StlEncoding) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    match encoding {
        StlEncoding::Binary => write_binary(mesh, &mut writer)?,
        StlEncoding::Ascii => write_ascii(mesh, &mut writer)?,
    }
    writer.flush()?;

    debug!(
        "Wrote {} faces to {} ({:?})",
        mesh.face_count(),
        path.display(),
        encoding
    );
    Ok(())
}

fn write_binary<W: Write>(mesh: &TriangleMesh, writer: &mut W) -> Result<()> {
    let triangles: Vec<stl_io::Triangle> = mesh
        .faces
        .iter()
        .map(|face| {
            let n = face_normal(mesh, face);
            let [p0, p1, p2] = mesh.face_corners(face);
            stl_io::Triangle {
                normal: stl_io::Normal::new([n.x, n.y, n.z]),
                vertices: [
                    stl_io::Vertex::new([p0.x, p0.y, p0.z]),
                    stl_io::Vertex::new([p1.x, p1.y, p1.z]),
                    stl_io::Vertex::new([p2.x, p2.y, p2.z]),
                ],
            }
        })
        .collect();

    stl_io::write_stl(writer, triangles.iter())?;
    Ok(())
}

fn write_ascii<W: Write>(mesh: &TriangleMesh, writer: &mut W) -> Result<()> {
    writeln!(writer, "solid meshsmooth")?;
    for face in &mesh.faces {
        let n = face_normal(mesh, face);
        writeln!(writer, "  facet normal {:e} {:e} {:e}", n.x, n.y, n.z)?;
        writeln!(writer, "    outer loop")?;
        for p in mesh.face_corners(face) {
            writeln!(writer, "      vertex {:e} {:e} {:e}", p.x, p.y, p.z)?;
        }
        writeln!(writer, "    endloop")?;
        writeln!(writer, "  endfacet")?;
    }
    writeln!(writer, "endsolid meshsmooth")?;
    Ok(())
}
