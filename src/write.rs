//! Piece-tree serializer.
//!
//! Every offset field in a piece record refers to data written *after* the
//! record itself, so encoding reserves space for each fixed-size record,
//! emits the dependent data, then seeks back and patches the record with
//! the now-known offsets. The file header gets the same treatment at the
//! top level, with the texture-name strings appended after the whole tree.

use crate::coords;
use crate::error::Result;
use crate::format::{self, Header, PieceRecord, VertexRecord};
use crate::model::{Model, Piece};
use crate::primitive;
use byteorder::{LittleEndian, WriteBytesExt};
use log::debug;
use std::io::{Seek, SeekFrom, Write};

/// Encoding options.
#[derive(Debug, Clone, Copy, Default)]
pub struct EncodeOptions {
    /// Strip editor-generated numeric name suffixes (`"turret.001"` is
    /// stored as `"turret"`). Off by default so round trips preserve names
    /// exactly.
    pub strip_name_suffix: bool,
}

/// Writer for the S3O binary format over any seekable sink.
///
/// Offsets stored in the file are absolute, so encoding starts at byte 0
/// of the sink.
pub struct S3oWriter<W: Write + Seek> {
    writer: W,
    options: EncodeOptions,
}

impl<W: Write + Seek> S3oWriter<W> {
    pub fn new(writer: W) -> Self {
        Self::with_options(writer, EncodeOptions::default())
    }

    pub fn with_options(writer: W, options: EncodeOptions) -> Self {
        Self { writer, options }
    }

    /// Write a complete model: reserved header, root piece subtree,
    /// texture strings, then the patched header.
    pub fn write_model(&mut self, model: &Model) -> Result<()> {
        self.writer.seek(SeekFrom::Start(format::HEADER_SIZE))?;

        let root_offset = self.writer.stream_position()?;
        self.write_piece(&model.root)?;

        let texture1_offset = self.write_texture_name(model.texture1.as_deref())?;
        let texture2_offset = self.write_texture_name(model.texture2.as_deref())?;

        let end = self.writer.stream_position()?;
        self.writer.seek(SeekFrom::Start(0))?;
        let mid = coords::tool_to_file(model.center);
        Header {
            radius: model.radius,
            height: model.height,
            mid: mid.to_array(),
            root_offset: root_offset as u32,
            collision_offset: model.collision_data_offset,
            texture1_offset,
            texture2_offset,
        }
        .write(&mut self.writer)?;
        self.writer.seek(SeekFrom::Start(end))?;

        Ok(())
    }

    /// Consume the writer and return the inner sink.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_texture_name(&mut self, name: Option<&str>) -> Result<u32> {
        match name {
            Some(name) => {
                let offset = self.writer.stream_position()? as u32;
                format::write_cstring(&mut self.writer, name)?;
                Ok(offset)
            }
            None => Ok(0),
        }
    }

    /// Serialize one piece subtree: reserve the record, write name, index
    /// table, vertices, children and child-offset table, then back-seek and
    /// patch the record.
    fn write_piece(&mut self, piece: &Piece) -> Result<()> {
        let record_offset = self.writer.stream_position()?;
        self.writer
            .seek(SeekFrom::Current(format::PIECE_RECORD_SIZE as i64))?;

        let name = if self.options.strip_name_suffix {
            strip_name_suffix(&piece.name)
        } else {
            &piece.name
        };
        debug!("writing piece [{name}] at offset {record_offset}");

        let name_offset = self.writer.stream_position()?;
        format::write_cstring(&mut self.writer, name)?;

        let primitive = primitive::classify(&piece.faces);
        let vert_table_offset = self.writer.stream_position()?;
        primitive::write_index_table(&mut self.writer, &piece.faces, primitive)?;

        let verts_offset = self.writer.stream_position()?;
        for vertex in &piece.vertices {
            VertexRecord {
                position: coords::tool_to_file(vertex.position).to_array(),
                normal: coords::tool_to_file(vertex.normal).to_array(),
                uv: vertex.uv.to_array(),
            }
            .write(&mut self.writer)?;
        }

        let mut child_offsets = Vec::with_capacity(piece.children.len());
        for child in &piece.children {
            child_offsets.push(self.writer.stream_position()? as u32);
            self.write_piece(child)?;
        }

        let children_offset = self.writer.stream_position()?;
        for offset in &child_offsets {
            self.writer.write_u32::<LittleEndian>(*offset)?;
        }

        let end = self.writer.stream_position()?;
        self.writer.seek(SeekFrom::Start(record_offset))?;
        let file_offset = coords::tool_to_file(piece.offset);
        PieceRecord {
            name_offset: name_offset as u32,
            num_children: piece.children.len() as u32,
            children_offset: children_offset as u32,
            num_verts: piece.vertices.len() as u32,
            verts_offset: verts_offset as u32,
            vert_type: piece.vert_type,
            primitive_type: primitive.encode(),
            vert_table_size: primitive::table_size(&piece.faces, primitive),
            vert_table_offset: vert_table_offset as u32,
            collision_offset: piece.collision_data_offset,
            offset: file_offset.to_array(),
        }
        .write(&mut self.writer)?;
        self.writer.seek(SeekFrom::Start(end))?;

        Ok(())
    }
}

/// Drop a trailing `".NNN"` suffix if the tail is all digits.
fn strip_name_suffix(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, suffix))
            if !stem.is_empty() && !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit()) =>
        {
            stem
        }
        _ => name,
    }
}
