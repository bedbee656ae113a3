//! Vertex welding and per-corner UV reconciliation.
//!
//! The file format stores exactly one UV pair per vertex, but a mesh vertex
//! shared by faces across a UV seam needs a different UV per face. The two
//! transforms here sit on either side of that mismatch:
//!
//! * **Split** (encode side): duplicate vertices whose referencing corners
//!   disagree on UV, so every stored vertex carries a single consistent UV.
//! * **Weld** (decode side): merge vertices whose position and normal match
//!   within tolerance into unique connectivity vertices, keeping the
//!   original records around so per-corner UV lookup still works.

use crate::error::{Result, S3oError};
use crate::model::{Face, Vertex, WeldedMesh};
use glam::{Vec2, Vec3};

/// Default absolute tolerance for welding and UV comparison.
pub const DEFAULT_WELD_TOLERANCE: f32 = 1e-6;

/// Welding parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeldConfig {
    /// Two vertices weld when position and normal each differ by less than
    /// this, component-wise. UV is deliberately excluded from the test.
    pub tolerance: f32,
}

impl Default for WeldConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_WELD_TOLERANCE,
        }
    }
}

fn close(a: f32, b: f32, tolerance: f32) -> bool {
    (a - b).abs() < tolerance
}

fn vec3_close(a: Vec3, b: Vec3, tolerance: f32) -> bool {
    close(a.x, b.x, tolerance) && close(a.y, b.y, tolerance) && close(a.z, b.z, tolerance)
}

fn vec2_close(a: Vec2, b: Vec2, tolerance: f32) -> bool {
    close(a.x, b.x, tolerance) && close(a.y, b.y, tolerance)
}

/// Weld equality: position and normal within tolerance, UV ignored.
fn verts_weldable(a: &Vertex, b: &Vertex, tolerance: f32) -> bool {
    vec3_close(a.position, b.position, tolerance) && vec3_close(a.normal, b.normal, tolerance)
}

/// Deduplicate a vertex list by position and normal.
///
/// First-match-wins linear scan: the earliest of a group of equal vertices
/// is kept and later duplicates resolve to it, so the result is stable.
/// Returns the unique list and a remap from original to unique indices.
pub fn weld(vertices: &[Vertex], config: &WeldConfig) -> (Vec<Vertex>, Vec<u32>) {
    let mut unique: Vec<Vertex> = Vec::new();
    let mut remap = Vec::with_capacity(vertices.len());
    for vertex in vertices {
        match unique
            .iter()
            .position(|u| verts_weldable(u, vertex, config.tolerance))
        {
            Some(existing) => remap.push(existing as u32),
            None => {
                remap.push(unique.len() as u32);
                unique.push(*vertex);
            }
        }
    }
    (unique, remap)
}

/// Weld a piece's vertices and re-index its faces into the unique list.
///
/// The caller keeps the original vertex records; [`WeldedMesh::remap`] links
/// the two so per-corner UVs stay reachable despite the merge.
pub fn weld_mesh(vertices: &[Vertex], faces: &[Face], config: &WeldConfig) -> WeldedMesh {
    let (unique, remap) = weld(vertices, config);
    let faces = faces.iter().map(|f| f.remapped(&remap)).collect();
    WeldedMesh {
        vertices: unique,
        remap,
        faces,
    }
}

/// Per-corner UV data for one face, as authored (before splitting).
#[derive(Debug, Clone)]
pub struct AuthoredFace {
    /// Indices into the base vertex list; 3 or 4 of them.
    pub indices: Vec<u32>,
    /// One UV per corner, same length as `indices`.
    pub uvs: Vec<Vec2>,
}

impl AuthoredFace {
    pub fn new(indices: Vec<u32>, uvs: Vec<Vec2>) -> Self {
        Self { indices, uvs }
    }
}

/// Split vertices along UV discontinuities so each stored vertex carries a
/// single UV.
///
/// `base` supplies positions and normals (its UVs are ignored); `faces`
/// carry the authored per-corner UVs. A vertex referenced with conflicting
/// UVs is duplicated once per distinct UV, and corners re-point at the
/// duplicate that matches. The result satisfies the one-UV-per-vertex
/// contract by construction, so serializing it cannot corrupt UVs.
///
/// Base vertices never referenced by a face are kept in place so indices
/// stay aligned with the input.
pub fn split_corner_uvs(
    base: &[Vertex],
    faces: &[AuthoredFace],
    config: &WeldConfig,
) -> Result<(Vec<Vertex>, Vec<Face>)> {
    let mut vertices: Vec<Vertex> = base.to_vec();
    // whether an output vertex has had a UV authored onto it yet
    let mut assigned = vec![false; vertices.len()];
    // base index -> duplicates already split off for it
    let mut duplicates: Vec<Vec<u32>> = vec![Vec::new(); base.len()];

    let mut out_faces = Vec::with_capacity(faces.len());
    for face in faces {
        if face.indices.len() != face.uvs.len() {
            return Err(S3oError::InvalidFaceSize {
                count: face.uvs.len(),
            });
        }
        let mut corners = Vec::with_capacity(face.indices.len());
        for (&index, &uv) in face.indices.iter().zip(&face.uvs) {
            let slot = index as usize;
            if slot >= base.len() {
                return Err(S3oError::VertexIndexOutOfRange {
                    index,
                    count: base.len() as u32,
                });
            }
            let resolved = if !assigned[slot] {
                vertices[slot].uv = uv;
                assigned[slot] = true;
                index
            } else if vec2_close(vertices[slot].uv, uv, config.tolerance) {
                index
            } else {
                match duplicates[slot]
                    .iter()
                    .find(|&&d| vec2_close(vertices[d as usize].uv, uv, config.tolerance))
                {
                    Some(&existing) => existing,
                    None => {
                        let clone = Vertex {
                            uv,
                            ..vertices[slot]
                        };
                        let new_index = vertices.len() as u32;
                        vertices.push(clone);
                        duplicates[slot].push(new_index);
                        new_index
                    }
                }
            };
            corners.push(resolved);
        }
        out_faces.push(Face::from_indices(&corners)?);
    }

    Ok((vertices, out_faces))
}

/// Check the per-corner UV contract against already-built piece data.
///
/// For every face and every corner, the UV stored on the referenced vertex
/// must equal the authored UV for that corner within tolerance; the first
/// disagreement is returned as [`S3oError::UvMismatch`].
pub fn verify_corner_uvs(
    vertices: &[Vertex],
    faces: &[AuthoredFace],
    config: &WeldConfig,
) -> Result<()> {
    for (face_index, face) in faces.iter().enumerate() {
        for (corner, (&index, &uv)) in face.indices.iter().zip(&face.uvs).enumerate() {
            let vertex = vertices.get(index as usize).ok_or(
                S3oError::VertexIndexOutOfRange {
                    index,
                    count: vertices.len() as u32,
                },
            )?;
            if !vec2_close(vertex.uv, uv, config.tolerance) {
                return Err(S3oError::UvMismatch {
                    face: face_index,
                    corner,
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Vec2, Vec3};

    fn vert(pos: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Vertex {
        Vertex::new(Vec3::from_array(pos), Vec3::from_array(normal), Vec2::from_array(uv))
    }

    #[test]
    fn test_weld_merges_position_and_normal() {
        let verts = vec![
            vert([0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
            vert([1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0]),
            // duplicate of vertex 0 with a different UV: still welds
            vert([0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.5, 0.5]),
            // same position, different normal: stays separate
            vert([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0]),
        ];
        let (unique, remap) = weld(&verts, &WeldConfig::default());

        assert_eq!(unique.len(), 3);
        assert_eq!(remap, vec![0, 1, 0, 2]);
        // first-match-wins: the kept vertex is the earlier one, UV included
        assert_eq!(unique[0].uv, Vec2::new(0.0, 0.0));
    }

    #[test]
    fn test_weld_respects_tolerance() {
        let verts = vec![
            vert([0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
            vert([5e-7, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
            vert([5e-3, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
        ];
        let (unique, remap) = weld(&verts, &WeldConfig::default());
        assert_eq!(unique.len(), 2);
        assert_eq!(remap, vec![0, 0, 1]);

        let loose = WeldConfig { tolerance: 0.1 };
        let (unique, _) = weld(&verts, &loose);
        assert_eq!(unique.len(), 1);
    }

    #[test]
    fn test_weld_idempotent() {
        let verts = vec![
            vert([0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
            vert([0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [1.0, 1.0]),
            vert([2.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0]),
        ];
        let config = WeldConfig::default();
        let (once, _) = weld(&verts, &config);
        let (twice, remap) = weld(&once, &config);

        assert_eq!(twice, once);
        let identity: Vec<u32> = (0..once.len() as u32).collect();
        assert_eq!(remap, identity);
    }

    #[test]
    fn test_weld_mesh_remaps_faces() {
        let verts = vec![
            vert([0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
            vert([1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0]),
            vert([0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0]),
            // duplicate of vertex 1 across a seam
            vert([1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
        ];
        let faces = vec![Face::Triangle([0, 1, 2]), Face::Triangle([0, 3, 2])];
        let welded = weld_mesh(&verts, &faces, &WeldConfig::default());

        assert_eq!(welded.vertices.len(), 3);
        assert_eq!(welded.remap, vec![0, 1, 2, 1]);
        // both triangles now share vertex 1 for connectivity
        assert_eq!(welded.faces, vec![Face::Triangle([0, 1, 2]), Face::Triangle([0, 1, 2])]);
    }

    #[test]
    fn test_split_duplicates_on_uv_conflict() {
        let base = vec![
            vert([0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
            vert([1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
            vert([0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
            vert([1.0, 1.0, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
        ];
        // two triangles share the 1-2 edge but sit on different UV islands
        let faces = vec![
            AuthoredFace::new(
                vec![0, 1, 2],
                vec![Vec2::new(0.0, 0.0), Vec2::new(0.1, 0.0), Vec2::new(0.0, 0.1)],
            ),
            AuthoredFace::new(
                vec![1, 3, 2],
                vec![Vec2::new(0.9, 0.0), Vec2::new(1.0, 0.0), Vec2::new(0.9, 0.1)],
            ),
        ];
        let (verts, out) = split_corner_uvs(&base, &faces, &WeldConfig::default()).unwrap();

        // vertices 1 and 2 each split once
        assert_eq!(verts.len(), 6);
        assert_eq!(out[0], Face::Triangle([0, 1, 2]));
        assert_eq!(out[1], Face::Triangle([4, 3, 5]));
        // the duplicates carry the second island's UVs but the same geometry
        assert_eq!(verts[4].position, verts[1].position);
        assert_eq!(verts[4].uv, Vec2::new(0.9, 0.0));
        assert_eq!(verts[5].position, verts[2].position);
        assert_eq!(verts[5].uv, Vec2::new(0.9, 0.1));

        // the split output passes the checked contract
        let authored: Vec<AuthoredFace> = out
            .iter()
            .zip(&faces)
            .map(|(f, a)| AuthoredFace::new(f.indices().to_vec(), a.uvs.clone()))
            .collect();
        verify_corner_uvs(&verts, &authored, &WeldConfig::default()).unwrap();
    }

    #[test]
    fn test_split_reuses_matching_duplicate() {
        let base = vec![vert([0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0]); 3];
        let uv_a = Vec2::new(0.0, 0.0);
        let uv_b = Vec2::new(1.0, 0.0);
        // corner 0 is used with uv_b by two faces: only one duplicate appears
        let faces = vec![
            AuthoredFace::new(vec![0, 1, 2], vec![uv_a, uv_a, uv_a]),
            AuthoredFace::new(vec![0, 1, 2], vec![uv_b, uv_a, uv_a]),
            AuthoredFace::new(vec![0, 2, 1], vec![uv_b, uv_a, uv_a]),
        ];
        let (verts, out) = split_corner_uvs(&base, &faces, &WeldConfig::default()).unwrap();

        assert_eq!(verts.len(), 4);
        assert_eq!(out[1].indices()[0], out[2].indices()[0]);
    }

    #[test]
    fn test_split_then_weld_round_trip() {
        // splitting for storage then welding on read restores connectivity
        // without losing either island's UVs
        let base = vec![
            vert([0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
            vert([1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
            vert([0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
        ];
        let faces = vec![
            AuthoredFace::new(
                vec![0, 1, 2],
                vec![Vec2::new(0.0, 0.0), Vec2::new(0.2, 0.0), Vec2::new(0.0, 0.2)],
            ),
            AuthoredFace::new(
                vec![0, 2, 1],
                vec![Vec2::new(0.8, 0.8), Vec2::new(0.8, 1.0), Vec2::new(1.0, 0.8)],
            ),
        ];
        let config = WeldConfig::default();
        let (split_verts, split_faces) = split_corner_uvs(&base, &faces, &config).unwrap();
        assert_eq!(split_verts.len(), 6);

        let welded = weld_mesh(&split_verts, &split_faces, &config);
        assert_eq!(welded.vertices.len(), 3);
        // connectivity collapses back to the shared vertices
        assert_eq!(welded.faces[0], Face::Triangle([0, 1, 2]));
        assert_eq!(welded.faces[1], Face::Triangle([0, 2, 1]));
        // per-corner UVs remain reachable through the original records
        for (face, authored) in split_faces.iter().zip(&faces) {
            for (corner, &index) in face.indices().iter().enumerate() {
                assert_eq!(split_verts[index as usize].uv, authored.uvs[corner]);
            }
        }
    }

    #[test]
    fn test_verify_detects_mismatch() {
        let verts = vec![
            vert([0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
            vert([1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0]),
            vert([0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0]),
        ];
        let good = vec![AuthoredFace::new(
            vec![0, 1, 2],
            vec![Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(0.0, 1.0)],
        )];
        verify_corner_uvs(&verts, &good, &WeldConfig::default()).unwrap();

        let bad = vec![AuthoredFace::new(
            vec![0, 1, 2],
            vec![Vec2::new(0.0, 0.0), Vec2::new(0.5, 0.5), Vec2::new(0.0, 1.0)],
        )];
        let err = verify_corner_uvs(&verts, &bad, &WeldConfig::default()).unwrap_err();
        assert!(matches!(err, S3oError::UvMismatch { face: 0, corner: 1 }));
    }
}
