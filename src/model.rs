//! In-memory model types: pieces, vertices, faces, and encode-side tree
//! assembly.
//!
//! All coordinates held by these types use the authoring tool's axis
//! convention; the file-axis swizzle is applied only at the byte boundary
//! (see [`crate::coords`]).

use crate::error::{Result, S3oError};
use glam::{Vec2, Vec3};
use std::collections::HashMap;

/// A single vertex record: position, normal, and exactly one UV pair.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vertex {
    /// Position in 3D space.
    pub position: Vec3,
    /// Normal vector.
    pub normal: Vec3,
    /// Texture coordinates. One pair per vertex is all the format stores;
    /// see [`crate::weld`] for how per-corner UVs are reconciled with this.
    pub uv: Vec2,
}

impl Vertex {
    pub fn new(position: Vec3, normal: Vec3, uv: Vec2) -> Self {
        Self { position, normal, uv }
    }
}

/// A face: three or four indices into the owning piece's vertex list.
///
/// Indices never reach across pieces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Face {
    Triangle([u32; 3]),
    Quad([u32; 4]),
}

impl Face {
    /// The face's vertex indices in corner order.
    pub fn indices(&self) -> &[u32] {
        match self {
            Face::Triangle(idx) => idx,
            Face::Quad(idx) => idx,
        }
    }

    /// Number of corners (3 or 4).
    pub fn corner_count(&self) -> usize {
        self.indices().len()
    }

    pub fn is_quad(&self) -> bool {
        matches!(self, Face::Quad(_))
    }

    /// Build a face from a slice of 3 or 4 indices.
    pub fn from_indices(indices: &[u32]) -> Result<Face> {
        match indices {
            [a, b, c] => Ok(Face::Triangle([*a, *b, *c])),
            [a, b, c, d] => Ok(Face::Quad([*a, *b, *c, *d])),
            other => Err(S3oError::InvalidFaceSize { count: other.len() }),
        }
    }

    /// The same face with every index passed through `remap`.
    pub fn remapped(&self, remap: &[u32]) -> Face {
        match self {
            Face::Triangle([a, b, c]) => {
                Face::Triangle([remap[*a as usize], remap[*b as usize], remap[*c as usize]])
            }
            Face::Quad([a, b, c, d]) => Face::Quad([
                remap[*a as usize],
                remap[*b as usize],
                remap[*c as usize],
                remap[*d as usize],
            ]),
        }
    }
}

/// Welded mesh data produced by the decoder (see [`crate::weld`]).
///
/// `vertices` is the deduplicated geometry and `faces` index into it; the
/// owning piece keeps its original vertex records so per-corner UVs survive
/// the weld. `remap[i]` gives the welded index of original vertex `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct WeldedMesh {
    /// Unique vertices, in first-appearance order.
    pub vertices: Vec<Vertex>,
    /// Original vertex index -> index into `vertices`.
    pub remap: Vec<u32>,
    /// The piece's faces re-indexed into `vertices`.
    pub faces: Vec<Face>,
}

/// A named transform node in the model tree, optionally carrying a mesh.
#[derive(Debug, Clone, Default)]
pub struct Piece {
    /// Piece name (non-empty).
    pub name: String,
    /// Vertex records in file order. These remain the UV source of truth
    /// for face corners even after welding.
    pub vertices: Vec<Vertex>,
    /// Faces indexing into `vertices`.
    pub faces: Vec<Face>,
    /// Position relative to the parent piece, in tool coordinates.
    pub offset: Vec3,
    /// Vertex type field, carried through unused.
    pub vert_type: u32,
    /// Collision-data offset slot; 0 = absent. Carried through unpopulated.
    pub collision_data_offset: u32,
    /// Child pieces, each owned exclusively by this piece.
    pub children: Vec<Piece>,
    /// Deduplicated geometry, filled in by the decoder when welding is
    /// enabled. The encoder ignores it.
    pub welded: Option<WeldedMesh>,
}

impl Piece {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Returns `true` if this piece carries mesh data.
    pub fn has_geometry(&self) -> bool {
        !self.vertices.is_empty()
    }

    /// Number of pieces in this subtree, including `self`.
    pub fn piece_count(&self) -> usize {
        1 + self.children.iter().map(Piece::piece_count).sum::<usize>()
    }

    /// Total vertex count over this subtree.
    pub fn total_vertices(&self) -> usize {
        self.vertices.len() + self.children.iter().map(Piece::total_vertices).sum::<usize>()
    }

    /// The UV authored at one corner of one face, looked up through the
    /// original (pre-weld) vertex records.
    pub fn corner_uv(&self, face: usize, corner: usize) -> Option<Vec2> {
        let index = *self.faces.get(face)?.indices().get(corner)?;
        Some(self.vertices.get(index as usize)?.uv)
    }
}

/// A whole model: the piece tree plus the header summary.
#[derive(Debug, Clone)]
pub struct Model {
    /// The root piece; the single piece with no parent.
    pub root: Piece,
    /// Collision-sphere radius.
    pub radius: f32,
    /// Height of the whole object.
    pub height: f32,
    /// Collision-sphere center, in tool coordinates.
    pub center: Vec3,
    /// First texture file name, if any.
    pub texture1: Option<String>,
    /// Second texture file name, if any.
    pub texture2: Option<String>,
    /// Header collision-data offset slot; 0 = no collision data.
    pub collision_data_offset: u32,
}

impl Model {
    pub fn new(root: Piece) -> Self {
        Self {
            root,
            radius: 0.0,
            height: 0.0,
            center: Vec3::ZERO,
            texture1: None,
            texture2: None,
            collision_data_offset: 0,
        }
    }
}

/// A piece plus the name of its parent, before tree assembly.
///
/// This is how an editor-side collaborator hands over a flat object list:
/// the parent reference is a name, never a pointer back into the tree.
#[derive(Debug, Clone)]
pub struct PieceNode {
    pub piece: Piece,
    /// Name of the parent piece, or `None` for the root.
    pub parent: Option<String>,
}

impl PieceNode {
    pub fn new(piece: Piece, parent: Option<String>) -> Self {
        Self { piece, parent }
    }
}

/// Build the ownership tree from a flat list of pieces with parent names.
///
/// Children keep the order in which they appear in `nodes`. Fails if there
/// is no parentless piece, more than one, a parent name that matches no
/// piece or more than one piece, or a parent cycle that leaves pieces
/// unreachable from the root.
pub fn assemble_tree(nodes: Vec<PieceNode>) -> Result<Piece> {
    let mut name_counts: HashMap<String, usize> = HashMap::new();
    for node in &nodes {
        *name_counts.entry(node.piece.name.clone()).or_insert(0) += 1;
    }

    for node in &nodes {
        if let Some(parent) = &node.parent {
            match name_counts.get(parent) {
                None => {
                    return Err(S3oError::UnknownParent {
                        piece: node.piece.name.clone(),
                        parent: parent.clone(),
                    })
                }
                Some(&count) if count > 1 => {
                    return Err(S3oError::DuplicatePieceName { name: parent.clone() })
                }
                _ => {}
            }
        }
    }

    let mut roots: Vec<Piece> = Vec::new();
    let mut children_of: HashMap<String, Vec<Piece>> = HashMap::new();
    for node in nodes {
        match node.parent {
            Some(parent) => children_of.entry(parent).or_default().push(node.piece),
            None => roots.push(node.piece),
        }
    }

    if roots.is_empty() {
        return Err(S3oError::NoRootPiece);
    }
    if roots.len() > 1 {
        return Err(S3oError::AmbiguousRoot {
            first: roots[0].name.clone(),
            second: roots[1].name.clone(),
        });
    }

    let mut root = roots.remove(0);
    attach_children(&mut root, &mut children_of);

    // anything left in the map sits on a parent cycle
    if let Some(name) = children_of.values().flatten().map(|p| p.name.clone()).next() {
        return Err(S3oError::UnreachablePiece { name });
    }

    Ok(root)
}

fn attach_children(piece: &mut Piece, children_of: &mut HashMap<String, Vec<Piece>>) {
    if let Some(mut children) = children_of.remove(&piece.name) {
        for child in &mut children {
            attach_children(child, children_of);
        }
        piece.children.append(&mut children);
    }
}
