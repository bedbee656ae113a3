//! Error types for the S3O codec.

use thiserror::Error;

/// Result type alias using S3oError.
pub type Result<T> = std::result::Result<T, S3oError>;

/// Main error type for S3O encode/decode operations.
///
/// Every variant is fatal for the current call: no error is downgraded to a
/// default value and no partial tree is returned.
#[derive(Error, Debug)]
pub enum S3oError {
    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file does not start with the `"Spring unit"` magic string.
    #[error("not a Spring unit file (magic {found:?})")]
    BadMagic {
        /// Magic field as found in the file, lossily decoded.
        found: String,
    },

    /// The header carries a version other than 0.
    #[error("unsupported file version {found} (expected 0)")]
    BadVersion { found: u32 },

    /// A piece declares a primitive type this codec cannot read
    /// (1 = legacy tristrips, or any unknown value).
    #[error("unsupported primitive type {value} in piece record at offset {offset}")]
    UnsupportedPrimitive { value: u32, offset: u64 },

    /// The stream ended before a record or table was fully read.
    #[error("file truncated while reading at offset {offset}")]
    Truncated { offset: u64 },

    /// A stored offset (or offset plus length) points past the end of the file.
    #[error("offset {offset} is out of bounds for a file of {len} bytes")]
    OffsetOutOfBounds { offset: u64, len: u64 },

    /// A string ran to end-of-stream without a null terminator.
    #[error("unterminated string at offset {offset}")]
    UnterminatedString { offset: u64 },

    /// A piece's index table size is not a whole number of faces for its
    /// declared primitive type.
    #[error("index table size {size} is not a multiple of {per_face}")]
    BadTableSize { size: u32, per_face: u32 },

    /// A child offset points at a piece record that was already read, so
    /// following it would loop forever.
    #[error("piece record at offset {offset} is referenced more than once")]
    CyclicPieceOffset { offset: u64 },

    /// A face references a vertex index outside its piece's vertex list.
    #[error("vertex index {index} out of range (piece has {count} vertices)")]
    VertexIndexOutOfRange { index: u32, count: u32 },

    /// A face has a corner count other than 3 or 4.
    #[error("face has {count} corners (expected 3 or 4)")]
    InvalidFaceSize { count: usize },

    /// Tree assembly found no parentless piece to use as the root.
    #[error("no root piece: every piece has a parent")]
    NoRootPiece,

    /// Tree assembly found more than one parentless piece.
    #[error("ambiguous root: both '{first}' and '{second}' are parentless")]
    AmbiguousRoot { first: String, second: String },

    /// A piece name used as a parent is carried by more than one piece,
    /// so parent/child resolution cannot pick one.
    #[error("piece name '{name}' is ambiguous as a parent")]
    DuplicatePieceName { name: String },

    /// A piece names a parent that does not exist in the input.
    #[error("piece '{piece}' references unknown parent '{parent}'")]
    UnknownParent { piece: String, parent: String },

    /// A piece is connected in a cycle and unreachable from the root.
    #[error("piece '{name}' is unreachable from the root (parent cycle)")]
    UnreachablePiece { name: String },

    /// A face corner's authored UV disagrees with the UV stored on the
    /// vertex it references.
    #[error("face {face} corner {corner} disagrees with the UV of its vertex")]
    UvMismatch { face: usize, corner: usize },
}
