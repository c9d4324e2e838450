//! Error types for mapping construction, storage and aggregation.

use thiserror::Error;

/// Regridding errors.
#[derive(Error, Debug)]
pub enum RegridError {
    /// A stored mapping line contained a token that is not a non-negative integer.
    #[error("Mapping parse error on line {line}: invalid index {token:?}")]
    MappingParse { line: usize, token: String },

    /// A mapping index does not address an element of the fine array.
    #[error("Index out of range: cell {cell} references index {index} but fine array has {len} values")]
    IndexOutOfRange { cell: usize, index: usize, len: usize },

    /// Missing-value mask does not line up with its payload.
    #[error("Mask length mismatch: {values} values but {mask} mask entries")]
    MaskLength { values: usize, mask: usize },

    /// WKT parsing error.
    #[error("WKT parse error: {0}")]
    WktParse(String),

    /// Geometry that cannot describe a coarse cell (e.g. a LINESTRING).
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error during mapping read/write.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for regridding operations.
pub type Result<T> = std::result::Result<T, RegridError>;
