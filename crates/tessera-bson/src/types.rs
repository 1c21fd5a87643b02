//! Element type tags for the BSON-subset wire format.
//!
//! Only the subset of tags used by the platform payloads is defined. Documents
//! containing any other tag in their first element are rejected at parse time.

/// Element type tags
///
/// # Representation
///
/// Tags are serialized as single bytes preceding each element's key. The
/// `#[repr(u8)]` ensures stable numeric values for wire compatibility.
///
/// # Security
///
/// Unknown tags are never mapped to a default. `from_u8` returns `None` for
/// unrecognized values so callers can reject malformed documents explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BsonType {
    /// 64-bit IEEE 754 floating point
    Double = 0x01,
    /// UTF-8 string, length prefix includes the trailing NUL
    String = 0x02,
    /// Embedded document
    Document = 0x03,
    /// Array, encoded as a document with decimal-string keys
    Array = 0x04,
    /// Binary blob with subtype byte, length prefix excludes any terminator
    Binary = 0x05,
    /// Boolean, one byte, 0x00 or 0x01
    Boolean = 0x08,
    /// UTC datetime, signed milliseconds since the Unix epoch
    Datetime = 0x09,
    /// 32-bit signed integer
    Int32 = 0x10,
    /// 64-bit signed integer
    Int64 = 0x12,
}

impl BsonType {
    /// Convert to the raw tag byte
    #[must_use]
    pub const fn to_u8(self) -> u8 {
        self as u8
    }

    /// Convert from a raw tag byte
    ///
    /// Returns `None` if the value doesn't correspond to a supported tag.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(Self::Double),
            0x02 => Some(Self::String),
            0x03 => Some(Self::Document),
            0x04 => Some(Self::Array),
            0x05 => Some(Self::Binary),
            0x08 => Some(Self::Boolean),
            0x09 => Some(Self::Datetime),
            0x10 => Some(Self::Int32),
            0x12 => Some(Self::Int64),
            _ => None,
        }
    }
}
