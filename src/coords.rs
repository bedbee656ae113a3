//! Axis convention conversion between authoring-tool and file coordinates.
//!
//! The S3O format negates X and stores the authoring tool's up axis (Z) in
//! the file's Y slot and the tool's depth axis (Y) in the file's Z slot.
//! The map `(x, y, z) -> (-x, z, y)` is an involution: applying it twice
//! returns the input, so the same function serves both directions.
//!
//! Every conversion in the crate goes through this module; it applies to
//! vertex positions, vertex normals, piece offsets, and the header's
//! collision-sphere center alike.

use glam::Vec3;

/// Convert a point or direction from tool axes to file axes.
pub fn tool_to_file(v: Vec3) -> Vec3 {
    Vec3::new(-v.x, v.z, v.y)
}

/// Convert a point or direction from file axes to tool axes.
///
/// Same map as [`tool_to_file`]; the separate name keeps call sites honest
/// about which way they are going.
pub fn file_to_tool(v: Vec3) -> Vec3 {
    tool_to_file(v)
}
