//! # S3O Codec
//!
//! A Rust library for reading and writing Spring S3O unit models.
//!
//! ## Overview
//!
//! An S3O file stores a hierarchy of named pieces, each carrying its own
//! vertices, faces, and a local offset from its parent. This library decodes
//! such files into an owned [`Model`] tree and encodes trees back to bytes,
//! converting between the file's axis convention and a right-handed
//! tool-space one along the way (see [`coords`]).
//!
//! ## Quick Start
//!
//! ```ignore
//! use s3o_codec::{read_model, write_model};
//!
//! // Load a model from disk
//! let mut model = read_model("units/tank.s3o")?;
//!
//! // Inspect or edit the piece tree
//! println!("root piece: {}", model.root.name);
//! model.radius *= 1.1;
//!
//! // Write it back out
//! write_model("units/tank_big.s3o", &model)?;
//! ```
//!
//! ## In-memory use
//!
//! [`decode_bytes`] and [`encode_bytes`] operate on byte slices, and the
//! underlying [`S3oReader`]/[`S3oWriter`] accept any `Read + Seek` /
//! `Write + Seek` source for finer control over options.

pub mod coords;
pub mod error;
pub mod format;
pub mod model;
pub mod primitive;
pub mod read;
pub mod weld;
pub mod write;

// Re-export main types for convenience
pub use error::{Result, S3oError};
pub use model::{assemble_tree, Face, Model, Piece, PieceNode, Vertex, WeldedMesh};
pub use primitive::PrimitiveType;
pub use read::{DecodeOptions, S3oReader};
pub use weld::{
    split_corner_uvs, verify_corner_uvs, weld, weld_mesh, AuthoredFace, WeldConfig,
    DEFAULT_WELD_TOLERANCE,
};
pub use write::{EncodeOptions, S3oWriter};

use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Write as _};
use std::path::Path;

/// Read a model from a file path.
pub fn read_model<P: AsRef<Path>>(path: P) -> Result<Model> {
    let file = BufReader::new(File::open(path)?);
    S3oReader::new(file)?.read_model()
}

/// Write a model to a file path, creating or truncating it.
pub fn write_model<P: AsRef<Path>>(path: P, model: &Model) -> Result<()> {
    let file = BufWriter::new(File::create(path)?);
    let mut writer = S3oWriter::new(file);
    writer.write_model(model)?;
    writer.into_inner().flush()?;
    Ok(())
}

/// Decode a model from an in-memory byte slice.
pub fn decode_bytes(bytes: &[u8]) -> Result<Model> {
    S3oReader::new(Cursor::new(bytes))?.read_model()
}

/// Encode a model to an in-memory byte vector.
pub fn encode_bytes(model: &Model) -> Result<Vec<u8>> {
    let mut writer = S3oWriter::new(Cursor::new(Vec::new()));
    writer.write_model(model)?;
    Ok(writer.into_inner().into_inner())
}
