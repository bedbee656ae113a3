//! Piece-tree deserializer.
//!
//! Decoding is a single pass with random access over a seekable source:
//! read the header, validate magic and version, then follow the stored
//! offsets to load the piece tree recursively. Every offset and length is
//! checked against the stream bounds before it is followed; any failure
//! aborts the whole decode.

use crate::coords;
use crate::error::{Result, S3oError};
use crate::format::{self, Header, PieceRecord, VertexRecord};
use crate::model::{Model, Piece, Vertex};
use crate::primitive::{self, PrimitiveType};
use crate::weld::{self, WeldConfig};
use byteorder::{LittleEndian, ReadBytesExt};
use glam::{Vec2, Vec3};
use log::debug;
use std::collections::HashSet;
use std::io::{Read, Seek, SeekFrom};

/// Decoding options.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodeOptions {
    /// Weld each piece's vertices after reading (see [`crate::weld`]).
    /// `None` skips welding and leaves [`Piece::welded`] empty.
    pub weld: Option<WeldConfig>,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            weld: Some(WeldConfig::default()),
        }
    }
}

/// Reader for the S3O binary format over any seekable source.
pub struct S3oReader<R: Read + Seek> {
    reader: R,
    /// Total stream length, for offset bounds checks.
    len: u64,
    options: DecodeOptions,
}

impl<R: Read + Seek> S3oReader<R> {
    pub fn new(reader: R) -> Result<Self> {
        Self::with_options(reader, DecodeOptions::default())
    }

    pub fn with_options(mut reader: R, options: DecodeOptions) -> Result<Self> {
        let len = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;
        Ok(Self {
            reader,
            len,
            options,
        })
    }

    /// Read a complete model. No partial tree is ever returned: the first
    /// error aborts the call.
    pub fn read_model(&mut self) -> Result<Model> {
        let header = Header::read(&mut self.reader)?;

        let mut visited = HashSet::new();
        let root = self.read_piece(header.root_offset as u64, &mut visited)?;

        let texture1 = self.read_texture_name(header.texture1_offset)?;
        let texture2 = self.read_texture_name(header.texture2_offset)?;

        Ok(Model {
            root,
            radius: header.radius,
            height: header.height,
            center: coords::file_to_tool(Vec3::from_array(header.mid)),
            texture1,
            texture2,
            collision_data_offset: header.collision_offset,
        })
    }

    /// Consume the reader and return the inner source.
    pub fn into_inner(self) -> R {
        self.reader
    }

    fn read_texture_name(&mut self, offset: u32) -> Result<Option<String>> {
        if offset == 0 {
            return Ok(None);
        }
        self.check_span(offset as u64, 1)?;
        Ok(Some(format::read_cstring_at(&mut self.reader, offset as u64)?))
    }

    fn read_piece(&mut self, offset: u64, visited: &mut HashSet<u64>) -> Result<Piece> {
        // a record seen twice means a child offset loops back into the tree
        if !visited.insert(offset) {
            return Err(S3oError::CyclicPieceOffset { offset });
        }
        self.check_span(offset, format::PIECE_RECORD_SIZE)?;
        self.reader.seek(SeekFrom::Start(offset))?;
        let record = PieceRecord::read(&mut self.reader, offset)?;

        // reject unreadable primitive encodings before touching any table
        let primitive = PrimitiveType::try_decode(record.primitive_type, offset)?;

        self.check_span(record.name_offset as u64, 1)?;
        let name = format::read_cstring_at(&mut self.reader, record.name_offset as u64)?;
        debug!("reading piece [{name}] at offset {offset}");

        // a piece with no vertices is a plain transform node, not an error
        let mut vertices = Vec::new();
        if record.num_verts > 0 {
            // the count field sizes the buffer, so bounds come first
            self.check_span(
                record.verts_offset as u64,
                record.num_verts as u64 * format::VERTEX_RECORD_SIZE,
            )?;
            vertices.reserve_exact(record.num_verts as usize);
            self.reader
                .seek(SeekFrom::Start(record.verts_offset as u64))?;
            for i in 0..record.num_verts {
                let at = record.verts_offset as u64 + i as u64 * format::VERTEX_RECORD_SIZE;
                let raw = VertexRecord::read(&mut self.reader, at)?;
                vertices.push(Vertex {
                    position: coords::file_to_tool(Vec3::from_array(raw.position)),
                    normal: coords::file_to_tool(Vec3::from_array(raw.normal)),
                    uv: Vec2::from_array(raw.uv),
                });
            }
        }

        let faces = if record.vert_table_size > 0 {
            self.check_span(
                record.vert_table_offset as u64,
                record.vert_table_size as u64 * 4,
            )?;
            self.reader
                .seek(SeekFrom::Start(record.vert_table_offset as u64))?;
            primitive::read_index_table(
                &mut self.reader,
                primitive,
                record.vert_table_size,
                record.num_verts,
            )?
        } else {
            Vec::new()
        };

        // pull the whole child-offset table before recursing, so sibling
        // offsets stay valid while child subtrees move the stream around
        let mut child_offsets = Vec::new();
        if record.num_children > 0 {
            self.check_span(record.children_offset as u64, record.num_children as u64 * 4)?;
            child_offsets.reserve_exact(record.num_children as usize);
            self.reader
                .seek(SeekFrom::Start(record.children_offset as u64))?;
            for _ in 0..record.num_children {
                child_offsets.push(self.reader.read_u32::<LittleEndian>()?);
            }
        }

        let mut children = Vec::with_capacity(child_offsets.len());
        for child_offset in child_offsets {
            children.push(self.read_piece(child_offset as u64, visited)?);
        }

        let welded = self
            .options
            .weld
            .as_ref()
            .map(|config| weld::weld_mesh(&vertices, &faces, config));

        Ok(Piece {
            name,
            vertices,
            faces,
            offset: coords::file_to_tool(Vec3::from_array(record.offset)),
            vert_type: record.vert_type,
            collision_data_offset: record.collision_offset,
            children,
            welded,
        })
    }

    /// Fail if `[offset, offset + len)` is not fully inside the stream.
    fn check_span(&self, offset: u64, len: u64) -> Result<()> {
        if offset + len > self.len {
            return Err(S3oError::OffsetOutOfBounds {
                offset,
                len: self.len,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::HEADER_SIZE;
    use crate::model::{Face, Model};
    use crate::write::S3oWriter;
    use byteorder::{LittleEndian, WriteBytesExt};
    use std::io::Cursor;

    fn vert(pos: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Vertex {
        Vertex::new(Vec3::from_array(pos), Vec3::from_array(normal), Vec2::from_array(uv))
    }

    fn sample_model() -> Model {
        let mut root = Piece::new("base");
        root.vertices = vec![
            vert([0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
            vert([1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0]),
            vert([1.0, 1.0, 0.0], [0.0, 0.0, 1.0], [1.0, 1.0]),
            vert([0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0]),
        ];
        root.faces = vec![Face::Quad([0, 1, 2, 3])];

        let mut turret = Piece::new("turret");
        turret.offset = Vec3::new(0.5, 0.25, 2.0);
        turret.vertices = vec![
            vert([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0]),
            vert([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0]),
            vert([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [1.0, 0.0]),
        ];
        turret.faces = vec![Face::Triangle([0, 1, 2])];

        let flare = Piece::new("flare");

        root.children.push(turret);
        root.children.push(flare);

        let mut model = Model::new(root);
        model.radius = 24.0;
        model.height = 13.5;
        model.center = Vec3::new(1.0, 2.0, 3.0);
        model.texture1 = Some("unit_tex1.dds".to_string());
        model.texture2 = Some("unit_tex2.dds".to_string());
        model
    }

    fn encode(model: &Model) -> Vec<u8> {
        let mut writer = S3oWriter::new(Cursor::new(Vec::new()));
        writer.write_model(model).unwrap();
        writer.into_inner().into_inner()
    }

    fn decode(bytes: &[u8]) -> Result<Model> {
        S3oReader::new(Cursor::new(bytes))?.read_model()
    }

    fn assert_close(a: Vec3, b: Vec3) {
        assert!((a - b).abs().max_element() < 1e-6, "{a} != {b}");
    }

    #[test]
    fn test_round_trip() {
        let model = sample_model();
        let decoded = decode(&encode(&model)).unwrap();

        assert_eq!(decoded.radius, model.radius);
        assert_eq!(decoded.height, model.height);
        assert_close(decoded.center, model.center);
        assert_eq!(decoded.texture1, model.texture1);
        assert_eq!(decoded.texture2, model.texture2);

        // tree shape is exact: names, child order, per-piece offsets
        assert_eq!(decoded.root.name, "base");
        assert_eq!(decoded.root.children.len(), 2);
        assert_eq!(decoded.root.children[0].name, "turret");
        assert_eq!(decoded.root.children[1].name, "flare");
        assert_eq!(decoded.root.children[0].offset, model.root.children[0].offset);

        // geometry survives within tolerance, faces exactly
        assert_eq!(decoded.root.faces, model.root.faces);
        for (a, b) in decoded.root.vertices.iter().zip(&model.root.vertices) {
            assert_close(a.position, b.position);
            assert_close(a.normal, b.normal);
            assert_eq!(a.uv, b.uv);
        }
        assert_eq!(decoded.root.children[0].faces, model.root.children[0].faces);

        // the empty child is a valid transform node
        assert!(!decoded.root.children[1].has_geometry());
    }

    #[test]
    fn test_round_trip_twice_is_stable() {
        let first = encode(&sample_model());
        let second = encode(&decode(&first).unwrap());
        assert_eq!(first, second);
    }

    #[test]
    fn test_decode_welds_duplicates() {
        let mut root = Piece::new("seamed");
        root.vertices = vec![
            vert([0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
            vert([1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.5, 0.0]),
            vert([0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [0.0, 0.5]),
            // duplicate of vertex 1 with seam UV
            vert([1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [1.0, 1.0]),
        ];
        root.faces = vec![Face::Triangle([0, 1, 2]), Face::Triangle([2, 3, 0])];
        let decoded = decode(&encode(&Model::new(root))).unwrap();

        let welded = decoded.root.welded.as_ref().unwrap();
        assert_eq!(welded.vertices.len(), 3);
        assert_eq!(welded.remap, vec![0, 1, 2, 1]);
        assert_eq!(welded.faces[1], Face::Triangle([2, 1, 0]));
        // original records keep both seam UVs
        assert_eq!(decoded.root.corner_uv(0, 1), Some(Vec2::new(0.5, 0.0)));
        assert_eq!(decoded.root.corner_uv(1, 1), Some(Vec2::new(1.0, 1.0)));
    }

    #[test]
    fn test_decode_without_welding() {
        let bytes = encode(&sample_model());
        let model = S3oReader::with_options(
            Cursor::new(&bytes),
            DecodeOptions { weld: None },
        )
        .unwrap()
        .read_model()
        .unwrap();
        assert!(model.root.welded.is_none());
    }

    #[test]
    fn test_bad_magic_fails_before_any_piece() {
        let mut bytes = encode(&sample_model());
        bytes[..12].copy_from_slice(b"Not a model\0");
        let err = decode(&bytes).unwrap_err();
        assert!(matches!(err, S3oError::BadMagic { found } if found == "Not a model"));
    }

    #[test]
    fn test_bad_version_is_fatal() {
        let mut bytes = encode(&sample_model());
        bytes[12] = 3;
        let err = decode(&bytes).unwrap_err();
        assert!(matches!(err, S3oError::BadVersion { found: 3 }));
    }

    #[test]
    fn test_tristrip_primitive_rejected() {
        let bytes = encode(&sample_model());
        let root_offset = {
            let header = Header::read(&mut Cursor::new(&bytes)).unwrap();
            header.root_offset as usize
        };
        // primitive_type is the 7th u32 of the piece record
        let mut bytes = bytes;
        let field = root_offset + 6 * 4;
        (&mut bytes[field..field + 4])
            .write_u32::<LittleEndian>(crate::primitive::PRIMITIVE_TRISTRIP)
            .unwrap();

        let err = decode(&bytes).unwrap_err();
        assert!(matches!(
            err,
            S3oError::UnsupportedPrimitive { value: 1, .. }
        ));
    }

    #[test]
    fn test_huge_vertex_count_rejected() {
        // empty piece, then a vertex count reaching far past end-of-file:
        // must come back as a typed error, never an attempted allocation
        let mut bytes = encode(&Model::new(Piece::new("p")));
        let field = 52 + 3 * 4; // num_verts in the root record
        (&mut bytes[field..field + 4]).write_u32::<LittleEndian>(u32::MAX).unwrap();

        let err = decode(&bytes).unwrap_err();
        assert!(matches!(err, S3oError::OffsetOutOfBounds { .. }));
    }

    #[test]
    fn test_huge_child_count_rejected() {
        let mut bytes = encode(&Model::new(Piece::new("p")));
        let field = 52 + 4; // num_children in the root record
        (&mut bytes[field..field + 4]).write_u32::<LittleEndian>(u32::MAX).unwrap();

        let err = decode(&bytes).unwrap_err();
        assert!(matches!(err, S3oError::OffsetOutOfBounds { .. }));
    }

    #[test]
    fn test_self_referencing_child_offset_rejected() {
        let mut root = Piece::new("base");
        root.children.push(Piece::new("turret"));
        let mut bytes = encode(&Model::new(root));
        // the root's child-offset table is the last 4 bytes of the tree;
        // point it back at the root record itself
        let table = bytes.len() - 4;
        (&mut bytes[table..]).write_u32::<LittleEndian>(52).unwrap();

        let err = decode(&bytes).unwrap_err();
        assert!(matches!(err, S3oError::CyclicPieceOffset { offset: 52 }));
    }

    #[test]
    fn test_root_offset_out_of_bounds() {
        let mut bytes = encode(&sample_model());
        let len = bytes.len() as u32;
        // root_offset field: 12-byte magic + version + 5 floats = byte 36
        (&mut bytes[36..40]).write_u32::<LittleEndian>(len + 100).unwrap();

        let err = decode(&bytes).unwrap_err();
        assert!(matches!(err, S3oError::OffsetOutOfBounds { .. }));
    }

    #[test]
    fn test_truncated_file() {
        let bytes = encode(&sample_model());
        let err = decode(&bytes[..60]).unwrap_err();
        assert!(matches!(
            err,
            S3oError::OffsetOutOfBounds { .. } | S3oError::Truncated { .. }
        ));
    }

    #[test]
    fn test_header_only_root_at_eof() {
        let mut bytes = Vec::new();
        Header {
            root_offset: HEADER_SIZE as u32,
            ..Header::default()
        }
        .write(&mut bytes)
        .unwrap();
        let err = decode(&bytes).unwrap_err();
        assert!(matches!(err, S3oError::OffsetOutOfBounds { .. }));
    }
}
