//! Error types for the BSON-subset codec.
//!
//! All errors are structured, testable, and provide actionable information.

use thiserror::Error;

/// Errors that can occur while parsing or reading a document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BsonError {
    /// Buffer is shorter than the minimum document size
    #[error("document too short: expected at least {expected} bytes, got {actual}")]
    DocumentTooShort {
        /// Expected minimum size in bytes
        expected: usize,
        /// Actual size received
        actual: usize,
    },

    /// Declared document size exceeds the available buffer
    #[error("document size mismatch: declared {declared} bytes, buffer holds {actual}")]
    SizeMismatch {
        /// Size declared in the document prefix
        declared: usize,
        /// Actual bytes available
        actual: usize,
    },

    /// Document does not end with the required terminator byte
    #[error("missing document terminator")]
    MissingTerminator,

    /// Unrecognized element type tag
    #[error("unknown element type: {0:#04x}")]
    UnknownType(u8),

    /// Element holds a different type than the caller expected
    #[error("type mismatch: expected {expected:#04x}, got {actual:#04x}")]
    TypeMismatch {
        /// Type tag the caller asked for
        expected: u8,
        /// Type tag actually present
        actual: u8,
    },

    /// Element data is cut off before its declared end
    #[error("element truncated at offset {offset}")]
    Truncated {
        /// Offset of the first missing byte
        offset: usize,
    },

    /// Element key or string value is not valid UTF-8
    #[error("invalid UTF-8 in element at offset {offset}")]
    InvalidUtf8 {
        /// Offset where the invalid string starts
        offset: usize,
    },

    /// No element with the requested key exists in the document
    #[error("key not found: {0}")]
    KeyNotFound(String),
}

/// Convenient Result type alias for codec operations
pub type Result<T> = std::result::Result<T, BsonError>;
