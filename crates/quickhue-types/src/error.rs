//! Error types for message decoding in quickhue-types.

use thiserror::Error;

/// Errors that can occur when decoding or interpreting a channel message.
///
/// This error type is transport-agnostic and does not include send
/// results (those belong in quickhue-core).
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// The buffer ended before a complete header or value could be read.
    #[error("Insufficient bytes: expected {expected}, got {actual}")]
    InsufficientBytes {
        /// Bytes required to continue decoding.
        expected: usize,
        /// Bytes actually remaining.
        actual: usize,
    },

    /// A tuple carried a type tag this codec does not know.
    #[error("Unknown tuple type 0x{0:02X}")]
    UnknownTupleType(u8),

    /// An integer tuple had a width other than 1, 2 or 4 bytes.
    #[error("Invalid integer width {width} for key {key}")]
    InvalidIntegerWidth {
        /// Key of the offending tuple.
        key: u32,
        /// Declared width in bytes.
        width: usize,
    },

    /// A string tuple was not NUL-terminated or was not valid UTF-8.
    #[error("Invalid string for key {key}: {reason}")]
    InvalidString {
        /// Key of the offending tuple.
        key: u32,
        /// What was wrong with it.
        reason: &'static str,
    },

    /// A value is too large to be encoded in a single tuple.
    #[error("Value for key {key} is {len} bytes, the limit is {max}")]
    ValueTooLarge {
        /// Key of the offending tuple.
        key: u32,
        /// Encoded value length.
        len: usize,
        /// Largest encodable length.
        max: usize,
    },

    /// More tuples than the one-byte count header can describe.
    #[error("Too many tuples: {0} (at most 255)")]
    TooManyTuples(usize),

    /// Bytes remained after the last tuple.
    #[error("{0} trailing bytes after last tuple")]
    TrailingBytes(usize),
}

/// Result type alias using quickhue-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
