//! Error types for strided array operations

use stride_memory::MemoryError;

/// Result type for stride-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building, indexing or copying arrays
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Byte-level failure reported by the address space
    #[error(transparent)]
    Memory(#[from] MemoryError),

    /// A view would reach bytes outside its backing region
    #[error("view out of bounds: bytes [{start}, {end}) not within region of {size} bytes")]
    ViewOutOfBounds { start: isize, end: isize, size: usize },

    /// Index past the end of an axis
    #[error("index {index} is out of bounds for axis {axis} with size {dim}")]
    IndexOutOfRange { axis: usize, index: isize, dim: usize },

    /// More index components than the array has axes
    #[error("too many indices: array is {rank}-dimensional, but {got} were indexed")]
    TooManyIndices { got: usize, rank: usize },

    /// Shapes cannot be broadcast together
    #[error("shapes {left:?} and {right:?} are not broadcastable")]
    NotBroadcastable { left: Vec<usize>, right: Vec<usize> },

    /// Assignment source shape differs from the destination view
    #[error("shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch { expected: Vec<usize>, actual: Vec<usize> },

    /// Shape or stride description is inconsistent
    #[error("invalid shape: {0}")]
    InvalidShape(String),

    /// Index form this runtime does not support
    #[error("unsupported indexing: {0}")]
    UnsupportedIndexing(String),

    /// Value, byte width or element type does not fit the codec
    #[error("codec mismatch: {0}")]
    CodecMismatch(String),

    /// No codec registered under the requested element type name
    #[error("no codec registered for element type '{0}'")]
    UnknownCodec(String),

    /// Array handle not known to the session
    #[error("invalid array handle: {0}")]
    InvalidHandle(u64),
}

/// Coarse failure category shared by every error variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A byte address, element index or view extent falls outside its allocation
    OutOfBounds,
    /// Broadcast-incompatible shapes or mismatched assignment shapes
    ShapeMismatch,
    /// Negative bounds, stepped slices, scatter or malformed fancy indices
    UnsupportedIndexing,
    /// Missing codec, or value and codec disagree
    CodecMismatch,
    /// Stale or foreign array handle
    InvalidHandle,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Memory(_) | Self::ViewOutOfBounds { .. } | Self::IndexOutOfRange { .. } | Self::TooManyIndices { .. } => {
                ErrorKind::OutOfBounds
            }
            Self::NotBroadcastable { .. } | Self::ShapeMismatch { .. } | Self::InvalidShape(_) => ErrorKind::ShapeMismatch,
            Self::UnsupportedIndexing(_) => ErrorKind::UnsupportedIndexing,
            Self::CodecMismatch(_) | Self::UnknownCodec(_) => ErrorKind::CodecMismatch,
            Self::InvalidHandle(_) => ErrorKind::InvalidHandle,
        }
    }

    pub(crate) fn unsupported(msg: impl Into<String>) -> Self {
        Self::UnsupportedIndexing(msg.into())
    }

    pub(crate) fn codec(msg: impl Into<String>) -> Self {
        Self::CodecMismatch(msg.into())
    }
}
