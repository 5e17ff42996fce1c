use thiserror::Error;

use crate::protocols::common::OutOfBounds;

/// Errors returned by table decoding.
///
/// Unknown table ids, descriptor tags and transmission format classes are
/// not errors; they decode with less detail.
///
/// # Examples
/// ```
/// use rcsshark_core::TableError;
///
/// let err = TableError::OutOfBounds { requested: 2, available: 1, offset: 9 };
/// assert!(err.to_string().contains("out of bounds"));
/// assert_eq!(err.offset(), 9);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("out of bounds at offset {offset}: need {requested} bytes, {available} available")]
    OutOfBounds {
        requested: usize,
        available: usize,
        offset: usize,
    },
    #[error(
        "malformed descriptor 0x{tag:02x} at offset {offset}: declared length {declared_length}, consumed {actual_consumed}"
    )]
    MalformedDescriptor {
        tag: u8,
        declared_length: usize,
        actual_consumed: usize,
        offset: usize,
    },
    #[error("invalid {field} value {value} at offset {offset}")]
    InvalidValue {
        field: &'static str,
        value: u64,
        offset: usize,
    },
    #[error("malformed {region} at offset {offset}: declared {declared} bytes, consumed {consumed}")]
    MalformedRegion {
        region: &'static str,
        declared: usize,
        consumed: usize,
        offset: usize,
    },
}

impl TableError {
    /// Buffer offset where decoding stopped.
    pub fn offset(&self) -> usize {
        match self {
            TableError::OutOfBounds { offset, .. }
            | TableError::MalformedDescriptor { offset, .. }
            | TableError::InvalidValue { offset, .. }
            | TableError::MalformedRegion { offset, .. } => *offset,
        }
    }

    /// Stable identifier for reports.
    pub fn kind(&self) -> &'static str {
        match self {
            TableError::OutOfBounds { .. } => "out_of_bounds",
            TableError::MalformedDescriptor { .. } => "malformed_descriptor",
            TableError::InvalidValue { .. } => "invalid_value",
            TableError::MalformedRegion { .. } => "malformed_region",
        }
    }
}

impl From<OutOfBounds> for TableError {
    fn from(value: OutOfBounds) -> Self {
        TableError::OutOfBounds {
            requested: value.requested,
            available: value.available,
            offset: value.offset,
        }
    }
}
