//! Triangle/quad classification and the per-piece index table.
//!
//! A stored piece's faces are homogeneous: all triples or all quadruples.
//! The classifier picks the encoding; the table codec moves the raw u32
//! indices. Value 1 (legacy tristrips) exists in old files but is never
//! produced here and is rejected on decode.

use crate::error::{Result, S3oError};
use crate::model::Face;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

/// Stored value for the legacy tristrip encoding; decode-only in the format
/// at large and unsupported by this codec.
pub const PRIMITIVE_TRISTRIP: u32 = 1;

/// Face encoding for a piece's index table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveType {
    /// Consecutive u32 triples (stored value 0).
    Triangles,
    /// Consecutive u32 quadruples (stored value 2).
    Quads,
}

impl PrimitiveType {
    /// Decode the stored field. Only 0 and 2 are readable; tristrips (1)
    /// and unknown values are fatal. `offset` is the piece record's
    /// position, for error reporting.
    pub fn try_decode(value: u32, offset: u64) -> Result<Self> {
        match value {
            0 => Ok(PrimitiveType::Triangles),
            2 => Ok(PrimitiveType::Quads),
            other => Err(S3oError::UnsupportedPrimitive { value: other, offset }),
        }
    }

    /// The value stored in the piece record.
    pub fn encode(self) -> u32 {
        match self {
            PrimitiveType::Triangles => 0,
            PrimitiveType::Quads => 2,
        }
    }

    /// Indices each face contributes to the table.
    pub fn indices_per_face(self) -> u32 {
        match self {
            PrimitiveType::Triangles => 3,
            PrimitiveType::Quads => 4,
        }
    }
}

/// Choose the stored encoding for a face list.
///
/// Quads only when every face has four corners; a single non-quad face
/// forces the whole piece to triangle mode (triangulate upstream if the
/// input is mixed). An empty list classifies as quads, matching an empty
/// table either way.
pub fn classify(faces: &[Face]) -> PrimitiveType {
    if faces.iter().all(Face::is_quad) {
        PrimitiveType::Quads
    } else {
        PrimitiveType::Triangles
    }
}

/// Total index count the table will hold (`vertTableSize`).
pub fn table_size(faces: &[Face], primitive: PrimitiveType) -> u32 {
    faces.len() as u32 * primitive.indices_per_face()
}

/// Write the index table: one triple or quadruple per face, no padding.
///
/// In triangle mode a quad face contributes its first three indices only;
/// callers are expected to triangulate mixed input upstream.
pub fn write_index_table<W: Write>(
    writer: &mut W,
    faces: &[Face],
    primitive: PrimitiveType,
) -> Result<()> {
    let per_face = primitive.indices_per_face() as usize;
    for face in faces {
        for &index in &face.indices()[..per_face.min(face.corner_count())] {
            writer.write_u32::<LittleEndian>(index)?;
        }
    }
    Ok(())
}

/// Read `table_size` indices back into faces, validating each index
/// against the piece's vertex count.
///
/// `table_size` must be a whole number of faces; a ragged size is rejected
/// rather than truncated.
pub fn read_index_table<R: Read>(
    reader: &mut R,
    primitive: PrimitiveType,
    table_size: u32,
    num_verts: u32,
) -> Result<Vec<Face>> {
    let per_face = primitive.indices_per_face();
    if table_size % per_face != 0 {
        return Err(S3oError::BadTableSize {
            size: table_size,
            per_face,
        });
    }
    let face_count = (table_size / per_face) as usize;
    let mut faces = Vec::with_capacity(face_count);
    for _ in 0..face_count {
        let mut indices = [0u32; 4];
        for slot in indices.iter_mut().take(per_face as usize) {
            let index = reader.read_u32::<LittleEndian>()?;
            if index >= num_verts {
                return Err(S3oError::VertexIndexOutOfRange {
                    index,
                    count: num_verts,
                });
            }
            *slot = index;
        }
        faces.push(match primitive {
            PrimitiveType::Triangles => Face::Triangle([indices[0], indices[1], indices[2]]),
            PrimitiveType::Quads => Face::Quad(indices),
        });
    }
    Ok(faces)
}
