//! Append-only document builder.
//!
//! A [`BsonSerializer`] owns a growable buffer holding one document under
//! construction. Elements are appended in call order; [`BsonSerializer::finish`]
//! writes the terminator, patches the leading size prefix, and hands the
//! encoded bytes back as an immutable [`Bytes`].
//!
//! # Wire Layout
//!
//! ```text
//! document := size:u32le element* 0x00
//! element  := tag:u8 key:cstring value
//! ```
//!
//! Arrays are nested documents whose keys are the decimal element indices
//! ("0", "1", ...). Strings are length-prefixed including their trailing NUL;
//! binaries are length-prefixed excluding it and carry a subtype byte.

use bytes::Bytes;

use crate::types::BsonType;

/// Generic binary subtype byte
const BINARY_SUBTYPE_GENERIC: u8 = 0x00;

/// Incremental builder for one encoded document.
///
/// All appends are amortized O(1) in the element size; the backing buffer
/// grows by doubling. A serializer that is dropped without `finish` produces
/// nothing.
#[derive(Debug)]
pub struct BsonSerializer {
    buf: Vec<u8>,
}

impl BsonSerializer {
    /// Start a new empty document.
    ///
    /// The four size-prefix bytes are reserved immediately and patched by
    /// [`finish`](Self::finish).
    #[must_use]
    pub fn new() -> Self {
        Self { buf: vec![0u8; 4] }
    }

    fn append_element_header(&mut self, tag: BsonType, key: &str) {
        self.buf.push(tag.to_u8());
        self.buf.extend_from_slice(key.as_bytes());
        self.buf.push(0);
    }

    /// Append a 64-bit float element.
    pub fn append_double(&mut self, key: &str, value: f64) {
        self.append_element_header(BsonType::Double, key);
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Append a 32-bit integer element.
    pub fn append_int32(&mut self, key: &str, value: i32) {
        self.append_element_header(BsonType::Int32, key);
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Append a 64-bit integer element.
    pub fn append_int64(&mut self, key: &str, value: i64) {
        self.append_element_header(BsonType::Int64, key);
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Append a boolean element.
    pub fn append_boolean(&mut self, key: &str, value: bool) {
        self.append_element_header(BsonType::Boolean, key);
        self.buf.push(u8::from(value));
    }

    /// Append a UTC datetime element (milliseconds since the Unix epoch).
    pub fn append_datetime(&mut self, key: &str, epoch_millis: i64) {
        self.append_element_header(BsonType::Datetime, key);
        self.buf.extend_from_slice(&epoch_millis.to_le_bytes());
    }

    /// Append a UTF-8 string element.
    ///
    /// The length prefix counts the trailing NUL, per the wire format.
    pub fn append_string(&mut self, key: &str, value: &str) {
        self.append_element_header(BsonType::String, key);
        let len = value.len() as u32 + 1;
        self.buf.extend_from_slice(&len.to_le_bytes());
        self.buf.extend_from_slice(value.as_bytes());
        self.buf.push(0);
    }

    /// Append a binary blob element with the generic subtype.
    ///
    /// The length prefix counts only the blob bytes.
    pub fn append_binary(&mut self, key: &str, value: &[u8]) {
        self.append_element_header(BsonType::Binary, key);
        let len = value.len() as u32;
        self.buf.extend_from_slice(&len.to_le_bytes());
        self.buf.push(BINARY_SUBTYPE_GENERIC);
        self.buf.extend_from_slice(value);
    }

    /// Append an already-encoded document as an embedded document element.
    pub fn append_document(&mut self, key: &str, document: &[u8]) {
        self.append_element_header(BsonType::Document, key);
        self.buf.extend_from_slice(document);
    }

    fn append_array_document(&mut self, key: &str, inner: BsonSerializer) {
        self.append_element_header(BsonType::Array, key);
        let encoded = inner.finish();
        self.buf.extend_from_slice(&encoded);
    }

    /// Append an array of doubles.
    pub fn append_double_array(&mut self, key: &str, values: &[f64]) {
        let mut inner = BsonSerializer::new();
        for (i, value) in values.iter().enumerate() {
            inner.append_double(&i.to_string(), *value);
        }
        self.append_array_document(key, inner);
    }

    /// Append an array of 32-bit integers.
    pub fn append_int32_array(&mut self, key: &str, values: &[i32]) {
        let mut inner = BsonSerializer::new();
        for (i, value) in values.iter().enumerate() {
            inner.append_int32(&i.to_string(), *value);
        }
        self.append_array_document(key, inner);
    }

    /// Append an array of 64-bit integers.
    pub fn append_int64_array(&mut self, key: &str, values: &[i64]) {
        let mut inner = BsonSerializer::new();
        for (i, value) in values.iter().enumerate() {
            inner.append_int64(&i.to_string(), *value);
        }
        self.append_array_document(key, inner);
    }

    /// Append an array of booleans.
    pub fn append_boolean_array(&mut self, key: &str, values: &[bool]) {
        let mut inner = BsonSerializer::new();
        for (i, value) in values.iter().enumerate() {
            inner.append_boolean(&i.to_string(), *value);
        }
        self.append_array_document(key, inner);
    }

    /// Append an array of datetimes (milliseconds since the Unix epoch).
    pub fn append_datetime_array(&mut self, key: &str, values: &[i64]) {
        let mut inner = BsonSerializer::new();
        for (i, value) in values.iter().enumerate() {
            inner.append_datetime(&i.to_string(), *value);
        }
        self.append_array_document(key, inner);
    }

    /// Append an array of strings.
    pub fn append_string_array<S: AsRef<str>>(&mut self, key: &str, values: &[S]) {
        let mut inner = BsonSerializer::new();
        for (i, value) in values.iter().enumerate() {
            inner.append_string(&i.to_string(), value.as_ref());
        }
        self.append_array_document(key, inner);
    }

    /// Append an array of binary blobs.
    pub fn append_binary_array<B: AsRef<[u8]>>(&mut self, key: &str, values: &[B]) {
        let mut inner = BsonSerializer::new();
        for (i, value) in values.iter().enumerate() {
            inner.append_binary(&i.to_string(), value.as_ref());
        }
        self.append_array_document(key, inner);
    }

    /// Current encoded size if the document were finished now.
    ///
    /// Counts the size prefix and the terminator byte.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        self.buf.len() + 1
    }

    /// Write the terminator, patch the size prefix, and return the encoded
    /// document.
    #[must_use]
    pub fn finish(mut self) -> Bytes {
        self.buf.push(0);
        let size = self.buf.len() as u32;
        self.buf[0..4].copy_from_slice(&size.to_le_bytes());
        Bytes::from(self.buf)
    }
}

impl Default for BsonSerializer {
    fn default() -> Self {
        Self::new()
    }
}
