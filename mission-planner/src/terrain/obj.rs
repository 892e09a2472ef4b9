//! Minimal Wavefront OBJ reader for terrain meshes.
//!
//! Only geometry is read: `v` positions and `f` faces (any of the `a`,
//! `a/b`, `a//c`, `a/b/c` index forms, negative indices relative to the
//! vertices seen so far). Polygons are fan-triangulated. Texture
//! coordinates, normals, groups and materials are ignored.

use super::error::ImportError;
use super::geometry::TerrainMesh;
use bevy::prelude::*;

pub fn parse_obj(text: &str) -> Result<TerrainMesh, ImportError> {
    let mut positions: Vec<Vec3> = Vec::new();
    let mut triangles: Vec<[u32; 3]> = Vec::new();

    for (line_index, raw) in text.lines().enumerate() {
        let line_no = line_index + 1;
        let line = raw.split('#').next().unwrap_or("").trim();
        let mut parts = line.split_whitespace();
        let Some(keyword) = parts.next() else {
            continue;
        };

        match keyword {
            "v" => {
                let mut coords = [0.0f32; 3];
                for coord in coords.iter_mut() {
                    let token = parts.next().ok_or_else(|| malformed(line_no, "vertex needs 3 coordinates"))?;
                    *coord = token
                        .parse()
                        .map_err(|_| malformed(line_no, &format!("bad coordinate '{}'", token)))?;
                }
                positions.push(Vec3::from_array(coords));
            }
            "f" => {
                let face = parts
                    .map(|token| resolve_index(token, positions.len(), line_no))
                    .collect::<Result<Vec<u32>, _>>()?;
                if face.len() < 3 {
                    return Err(malformed(line_no, "face needs at least 3 vertices"));
                }
                for i in 1..face.len() - 1 {
                    triangles.push([face[0], face[i], face[i + 1]]);
                }
            }
            _ => {}
        }
    }

    // Forward references are legal in OBJ, so bounds are checked once all vertices are known.
    if let Some(bad) = triangles
        .iter()
        .flatten()
        .find(|index| **index as usize >= positions.len())
    {
        return Err(ImportError::MalformedObj {
            line: 0,
            reason: format!("vertex index {} out of range ({} vertices)", bad + 1, positions.len()),
        });
    }

    if triangles.is_empty() {
        return Err(ImportError::EmptyMesh);
    }

    Ok(TerrainMesh::new(positions, triangles))
}

fn resolve_index(token: &str, seen: usize, line_no: usize) -> Result<u32, ImportError> {
    let position = token.split('/').next().unwrap_or("");
    let raw: i64 = position
        .parse()
        .map_err(|_| malformed(line_no, &format!("bad face index '{}'", token)))?;

    let index = match raw {
        0 => return Err(malformed(line_no, "face index 0 is invalid")),
        r if r > 0 => r - 1,
        r => {
            let relative = seen as i64 + r;
            if relative < 0 {
                return Err(malformed(line_no, &format!("relative index {} before first vertex", r)));
            }
            relative
        }
    };

    u32::try_from(index).map_err(|_| malformed(line_no, "face index too large"))
}

fn malformed(line: usize, reason: &str) -> ImportError {
    ImportError::MalformedObj {
        line,
        reason: reason.to_string(),
    }
}
