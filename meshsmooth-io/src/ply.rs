//! PLY support for oriented point clouds
//!
//! Used to dump the reduced point set (positions and normals) handed to
//! surface reconstruction, so it can be inspected in external viewers.

use meshsmooth_core::{Error, NormalPoint3f, OrientedPointCloud, Point3f, Result, Vector3f};
use ply_rs::{
    parser::Parser,
    ply::{Addable, DefaultElement, ElementDef, Encoding, Ply, Property, PropertyDef, PropertyType, ScalarType},
    writer::Writer,
};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

const FIELDS: [&str; 6] = ["x", "y", "z", "nx", "ny", "nz"];

/// Write an oriented point cloud as an ASCII PLY file with `x y z nx ny nz`
pub fn write_oriented_cloud<P: AsRef<Path>>(cloud: &OrientedPointCloud, path: P) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    let mut ply = Ply::<DefaultElement>::new();
    ply.header.encoding = Encoding::Ascii;

    let mut vertex_element = ElementDef::new("vertex".to_string());
    vertex_element.count = cloud.len();
    for name in FIELDS {
        vertex_element.properties.add(PropertyDef::new(
            name.to_string(),
            PropertyType::Scalar(ScalarType::Float),
        ));
    }
    ply.header.elements.add(vertex_element);

    let vertices = cloud
        .iter()
        .map(|p| {
            let values = [
                p.position.x, p.position.y, p.position.z,
                p.normal.x, p.normal.y, p.normal.z,
            ];
            let mut element = DefaultElement::new();
            for (name, value) in FIELDS.iter().zip(values) {
                element.insert(name.to_string(), Property::Float(value));
            }
            element
        })
        .collect();
    ply.payload.insert("vertex".to_string(), vertices);

    Writer::new().write_ply(&mut writer, &mut ply)?;
    Ok(())
}

/// Read a PLY vertex list with normals back into an oriented point cloud
pub fn read_oriented_cloud<P: AsRef<Path>>(path: P) -> Result<OrientedPointCloud> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    let parser = Parser::<DefaultElement>::new();
    let ply = parser.read_ply(&mut reader)?;

    let Some(vertex_element) = ply.payload.get("vertex") else {
        return Ok(OrientedPointCloud::new());
    };

    vertex_element
        .iter()
        .map(|vertex| {
            let [x, y, z, nx, ny, nz] = FIELDS.map(|name| extract_property_value(vertex, name));
            Ok(NormalPoint3f::new(
                Point3f::new(x?, y?, z?),
                Vector3f::new(nx?, ny?, nz?),
            ))
        })
        .collect::<Result<Vec<_>>>()
        .map(OrientedPointCloud::from_points)
}

/// Extract a property value as f32 from a PLY element
fn extract_property_value(element: &DefaultElement, name: &str) -> Result<f32> {
    match element.get(name) {
        Some(Property::Float(val)) => Ok(*val),
        Some(Property::Double(val)) => Ok(*val as f32),
        Some(Property::Int(val)) => Ok(*val as f32),
        Some(Property::UInt(val)) => Ok(*val as f32),
        _ => Err(Error::Format(format!(
            "Property '{}' not found or invalid type",
            name
        ))),
    }
}
