use arrow::error::ArrowError;
use datafusion::error::DataFusionError;

/// Errors produced while turning WKB bytes back into a geometry.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    /// The input is shorter than a WKB header.
    #[error("Unexpected end of WKB input: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof { needed: usize, remaining: usize },

    /// The byte order marker is neither `0` (XDR) nor `1` (NDR).
    #[error("Invalid WKB byte order marker: {0}")]
    InvalidByteOrder(u8),

    /// The geometry carries Z and/or M ordinates.
    #[error("Unsupported WKB coordinate dimension: {0}")]
    UnsupportedDimension(String),

    /// The WKB reader rejected the input.
    #[error("Malformed WKB: {0}")]
    Malformed(String),
}

/// Errors produced while serializing a geometry to WKB.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EncodeError {
    /// WKB has no way to write holes without the exterior ring they belong to.
    #[error("Polygon has {0} interior rings but an empty exterior")]
    HolesWithoutExterior(usize),

    /// The WKB writer rejected the geometry.
    #[error("WKB writer failed: {0}")]
    Writer(String),
}

/// Errors produced by geometry columns, containers and vectors.
#[derive(Debug, thiserror::Error)]
pub enum GeometryVectorError {
    /// Stored bytes could not be decoded. Indicates corruption or a codec mismatch.
    #[error("Failed to decode geometry at index {index}: {source}")]
    Decode {
        index: usize,
        #[source]
        source: DecodeError,
    },

    /// A geometry could not be serialized. The slot is left untouched.
    #[error("Failed to encode geometry: {0}")]
    Encode(#[from] EncodeError),

    /// A read addressed a slot at or beyond the declared value count.
    #[error("Index {index} out of range for value count {value_count}")]
    IndexOutOfRange { index: usize, value_count: usize },

    /// The column backing the vector has been closed.
    #[error("Column '{0}' has already been released")]
    Released(String),

    /// The memory pool refused to grow the column's reservation.
    #[error("Memory allocation failed for column '{column}': {source}")]
    Allocation {
        column: String,
        #[source]
        source: DataFusionError,
    },

    /// The Arrow array does not have the binary layout of a geometry column.
    #[error("Invalid binary column: {0}")]
    InvalidColumn(String),

    /// Wrapper around Arrow-level failures.
    #[error("Arrow Error: {0}")]
    Arrow(#[from] ArrowError),
}

pub type Result<T, E = GeometryVectorError> = std::result::Result<T, E>;
