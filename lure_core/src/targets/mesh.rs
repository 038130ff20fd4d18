//! Detects the geometry type of a PLY stream, then decodes it as a mesh or
//! as a point cloud.

use crate::harness::{Harness, HarnessContext, Outcome, discard};
use ply_rs::parser::Parser;
use ply_rs::ply::{DefaultElement, Header, Property};
use std::io::{BufReader, Cursor};

/// Headers declaring more elements than this are not decoded.
pub const MAX_ELEMENTS: usize = 1 << 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryType {
    TriangularMesh,
    PointCloud,
}

/// Geometry type implied by the declared elements, if any.
pub fn geometry_type(header: &Header) -> Option<GeometryType> {
    if header.elements.contains_key("face") {
        Some(GeometryType::TriangularMesh)
    } else if header.elements.contains_key("vertex") {
        Some(GeometryType::PointCloud)
    } else {
        None
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DecodedGeometry {
    pub vertices: usize,
    pub faces: usize,
    pub triangles: usize,
    pub out_of_range_indices: usize,
}

fn face_indices(face: &DefaultElement) -> Vec<i64> {
    let list = face
        .get("vertex_indices")
        .or_else(|| face.get("vertex_index"));
    match list {
        Some(Property::ListChar(v)) => v.iter().map(|&i| i64::from(i)).collect(),
        Some(Property::ListUChar(v)) => v.iter().map(|&i| i64::from(i)).collect(),
        Some(Property::ListShort(v)) => v.iter().map(|&i| i64::from(i)).collect(),
        Some(Property::ListUShort(v)) => v.iter().map(|&i| i64::from(i)).collect(),
        Some(Property::ListInt(v)) => v.iter().map(|&i| i64::from(i)).collect(),
        Some(Property::ListUInt(v)) => v.iter().map(|&i| i64::from(i)).collect(),
        _ => Vec::new(),
    }
}

/// Reads the header and decodes the payload according to its geometry type.
///
/// `None` when the header is unreadable, declares no geometry, is too large,
/// or the payload fails to decode.
pub fn decode(data: &[u8]) -> Option<(GeometryType, DecodedGeometry)> {
    let mut reader = BufReader::new(Cursor::new(data));
    let parser = Parser::<DefaultElement>::new();
    let header = discard("ply header", parser.read_header(&mut reader))?;
    let geometry = geometry_type(&header)?;

    let declared = header
        .elements
        .values()
        .try_fold(0usize, |total, element| total.checked_add(element.count))?;
    if declared > MAX_ELEMENTS {
        return None;
    }

    let payload = discard("ply payload", parser.read_payload(&mut reader, &header))?;
    let mut decoded = DecodedGeometry {
        vertices: payload.get("vertex").map_or(0, |v| v.len()),
        ..DecodedGeometry::default()
    };

    if geometry == GeometryType::TriangularMesh {
        for face in payload.get("face").into_iter().flatten() {
            let indices = face_indices(face);
            decoded.faces += 1;
            decoded.triangles += indices.len().saturating_sub(2);
            decoded.out_of_range_indices += indices
                .iter()
                .filter(|&&i| i < 0 || i as usize >= decoded.vertices)
                .count();
        }
    }
    Some((geometry, decoded))
}

#[derive(Debug, Default, Clone, Copy)]
pub struct MeshDecodeHarness;

impl Harness for MeshDecodeHarness {
    fn name(&self) -> &'static str {
        "mesh-decode"
    }

    fn exercise(&self, data: &[u8], _ctx: &HarnessContext) -> Outcome {
        let _ = decode(data);
        Outcome::Exercised
    }
}
