//! Fixed-layout binary records: file header, piece record, vertex record,
//! and null-terminated strings.
//!
//! Everything is little-endian. The header and piece record are both 52
//! bytes; the vertex record is 32 bytes. Offsets stored in records are
//! absolute byte positions in the file.
//!
//! This layer moves raw numbers only: values pass through exactly as stored,
//! still in the file's axis convention (see [`crate::coords`]).

use crate::error::{Result, S3oError};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Seek, SeekFrom, Write};

/// Magic field: the ASCII bytes `"Spring unit"` null-padded to 12 bytes.
pub const MAGIC: [u8; 12] = *b"Spring unit\0";

/// The only file version this codec reads or writes.
pub const VERSION: u32 = 0;

/// Size of the file header in bytes.
pub const HEADER_SIZE: u64 = 52;

/// Size of a piece record in bytes.
pub const PIECE_RECORD_SIZE: u64 = 52;

/// Size of a vertex record in bytes.
pub const VERTEX_RECORD_SIZE: u64 = 32;

/// The 52-byte file header.
///
/// `mid` is the collision-sphere center in *file* axes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Header {
    pub radius: f32,
    pub height: f32,
    pub mid: [f32; 3],
    pub root_offset: u32,
    pub collision_offset: u32,
    pub texture1_offset: u32,
    pub texture2_offset: u32,
}

impl Header {
    /// Read and validate a header. A wrong magic or version is fatal.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut magic = [0u8; 12];
        reader
            .read_exact(&mut magic)
            .map_err(|e| truncated(e, 0))?;
        if magic != MAGIC {
            let end = magic.iter().position(|&b| b == 0).unwrap_or(magic.len());
            return Err(S3oError::BadMagic {
                found: String::from_utf8_lossy(&magic[..end]).into_owned(),
            });
        }

        let version = reader.read_u32::<LittleEndian>().map_err(|e| truncated(e, 12))?;
        if version != VERSION {
            return Err(S3oError::BadVersion { found: version });
        }

        let mut rest = || -> std::io::Result<Header> {
            Ok(Header {
                radius: reader.read_f32::<LittleEndian>()?,
                height: reader.read_f32::<LittleEndian>()?,
                mid: [
                    reader.read_f32::<LittleEndian>()?,
                    reader.read_f32::<LittleEndian>()?,
                    reader.read_f32::<LittleEndian>()?,
                ],
                root_offset: reader.read_u32::<LittleEndian>()?,
                collision_offset: reader.read_u32::<LittleEndian>()?,
                texture1_offset: reader.read_u32::<LittleEndian>()?,
                texture2_offset: reader.read_u32::<LittleEndian>()?,
            })
        };
        rest().map_err(|e| truncated(e, 16))
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&MAGIC)?;
        writer.write_u32::<LittleEndian>(VERSION)?;
        writer.write_f32::<LittleEndian>(self.radius)?;
        writer.write_f32::<LittleEndian>(self.height)?;
        for c in self.mid {
            writer.write_f32::<LittleEndian>(c)?;
        }
        writer.write_u32::<LittleEndian>(self.root_offset)?;
        writer.write_u32::<LittleEndian>(self.collision_offset)?;
        writer.write_u32::<LittleEndian>(self.texture1_offset)?;
        writer.write_u32::<LittleEndian>(self.texture2_offset)?;
        Ok(())
    }
}

/// The 52-byte piece record. All offsets are absolute; `offset` is the
/// piece's local position in *file* axes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PieceRecord {
    pub name_offset: u32,
    pub num_children: u32,
    pub children_offset: u32,
    pub num_verts: u32,
    pub verts_offset: u32,
    pub vert_type: u32,
    pub primitive_type: u32,
    pub vert_table_size: u32,
    pub vert_table_offset: u32,
    pub collision_offset: u32,
    pub offset: [f32; 3],
}

impl PieceRecord {
    /// Read a piece record; `at` is the record's own offset, used for
    /// truncation reporting.
    pub fn read<R: Read>(reader: &mut R, at: u64) -> Result<Self> {
        let mut inner = || -> std::io::Result<PieceRecord> {
            Ok(PieceRecord {
                name_offset: reader.read_u32::<LittleEndian>()?,
                num_children: reader.read_u32::<LittleEndian>()?,
                children_offset: reader.read_u32::<LittleEndian>()?,
                num_verts: reader.read_u32::<LittleEndian>()?,
                verts_offset: reader.read_u32::<LittleEndian>()?,
                vert_type: reader.read_u32::<LittleEndian>()?,
                primitive_type: reader.read_u32::<LittleEndian>()?,
                vert_table_size: reader.read_u32::<LittleEndian>()?,
                vert_table_offset: reader.read_u32::<LittleEndian>()?,
                collision_offset: reader.read_u32::<LittleEndian>()?,
                offset: [
                    reader.read_f32::<LittleEndian>()?,
                    reader.read_f32::<LittleEndian>()?,
                    reader.read_f32::<LittleEndian>()?,
                ],
            })
        };
        inner().map_err(|e| truncated(e, at))
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u32::<LittleEndian>(self.name_offset)?;
        writer.write_u32::<LittleEndian>(self.num_children)?;
        writer.write_u32::<LittleEndian>(self.children_offset)?;
        writer.write_u32::<LittleEndian>(self.num_verts)?;
        writer.write_u32::<LittleEndian>(self.verts_offset)?;
        writer.write_u32::<LittleEndian>(self.vert_type)?;
        writer.write_u32::<LittleEndian>(self.primitive_type)?;
        writer.write_u32::<LittleEndian>(self.vert_table_size)?;
        writer.write_u32::<LittleEndian>(self.vert_table_offset)?;
        writer.write_u32::<LittleEndian>(self.collision_offset)?;
        for c in self.offset {
            writer.write_f32::<LittleEndian>(c)?;
        }
        Ok(())
    }
}

/// A 32-byte vertex record: position, normal, UV, in *file* axes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VertexRecord {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl VertexRecord {
    pub fn read<R: Read>(reader: &mut R, at: u64) -> Result<Self> {
        let mut fields = [0f32; 8];
        let mut inner = || -> std::io::Result<()> {
            for f in &mut fields {
                *f = reader.read_f32::<LittleEndian>()?;
            }
            Ok(())
        };
        inner().map_err(|e| truncated(e, at))?;
        Ok(VertexRecord {
            position: [fields[0], fields[1], fields[2]],
            normal: [fields[3], fields[4], fields[5]],
            uv: [fields[6], fields[7]],
        })
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        for c in self.position {
            writer.write_f32::<LittleEndian>(c)?;
        }
        for c in self.normal {
            writer.write_f32::<LittleEndian>(c)?;
        }
        for c in self.uv {
            writer.write_f32::<LittleEndian>(c)?;
        }
        Ok(())
    }
}

/// Write raw string bytes followed by a single null terminator.
pub fn write_cstring<W: Write>(writer: &mut W, s: &str) -> Result<()> {
    writer.write_all(s.as_bytes())?;
    writer.write_all(&[0])?;
    Ok(())
}

/// Read a null-terminated string at an absolute offset.
///
/// Reading stops at the first null byte; hitting end-of-stream first is a
/// fatal [`S3oError::UnterminatedString`].
pub fn read_cstring_at<R: Read + Seek>(reader: &mut R, offset: u64) -> Result<String> {
    reader.seek(SeekFrom::Start(offset))?;
    let mut bytes = Vec::new();
    loop {
        let mut byte = [0u8; 1];
        match reader.read_exact(&mut byte) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Err(S3oError::UnterminatedString { offset });
            }
            Err(e) => return Err(e.into()),
        }
        if byte[0] == 0 {
            break;
        }
        bytes.push(byte[0]);
    }
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Map a short read onto the typed truncation error.
fn truncated(err: std::io::Error, offset: u64) -> S3oError {
    if err.kind() == std::io::ErrorKind::UnexpectedEof {
        S3oError::Truncated { offset }
    } else {
        S3oError::Io(err)
    }
}
