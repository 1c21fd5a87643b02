//! Zero-copy document parsing.
//!
//! [`Document`] is a borrowed, validated view over an encoded buffer.
//! Validation happens once at [`Document::parse`]; element walking and typed
//! extraction never read past the declared document size.
//!
//! # Validation Order
//!
//! `parse` rejects, in order: an empty buffer, a buffer too short to hold the
//! size prefix, a non-empty document shorter than the minimum element size, a
//! declared size exceeding the buffer, a missing terminator, and an
//! unrecognized first element tag. A five-byte document with a valid
//! terminator is the canonical empty document and always parses.

use crate::{
    errors::{BsonError, Result},
    types::BsonType,
};

/// Size prefix plus terminator
const EMPTY_DOCUMENT_SIZE: usize = 5;

/// Smallest non-empty document: prefix, tag, one-byte key with NUL, terminator
const MIN_NONEMPTY_SIZE: usize = 8;

/// A parsed, validated view over one encoded document.
#[derive(Debug, Clone, Copy)]
pub struct Document<'a> {
    data: &'a [u8],
    size: usize,
}

/// One element inside a [`Document`].
///
/// Holds the raw value bytes and enough context for typed extraction. The
/// element borrows from the buffer the document was parsed from.
#[derive(Debug, Clone, Copy)]
pub struct Element<'a> {
    tag: BsonType,
    name: &'a str,
    value: &'a [u8],
    value_offset: usize,
    end: usize,
}

impl<'a> Document<'a> {
    /// Parse and validate a document from a buffer.
    ///
    /// Trailing bytes beyond the declared size are ignored.
    ///
    /// # Errors
    ///
    /// Returns a [`BsonError`] describing the first structural violation
    /// found. Malformed input never panics.
    pub fn parse(buf: &'a [u8]) -> Result<Self> {
        if buf.is_empty() {
            return Err(BsonError::DocumentTooShort {
                expected: EMPTY_DOCUMENT_SIZE,
                actual: 0,
            });
        }
        if buf.len() < EMPTY_DOCUMENT_SIZE {
            return Err(BsonError::DocumentTooShort {
                expected: EMPTY_DOCUMENT_SIZE,
                actual: buf.len(),
            });
        }

        let declared = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;

        if declared == EMPTY_DOCUMENT_SIZE && buf[4] == 0 {
            return Ok(Self { data: buf, size: declared });
        }

        if declared < MIN_NONEMPTY_SIZE || buf.len() < MIN_NONEMPTY_SIZE {
            return Err(BsonError::DocumentTooShort {
                expected: MIN_NONEMPTY_SIZE,
                actual: declared.min(buf.len()),
            });
        }
        if declared > buf.len() {
            return Err(BsonError::SizeMismatch { declared, actual: buf.len() });
        }
        if buf[declared - 1] != 0 {
            return Err(BsonError::MissingTerminator);
        }
        if BsonType::from_u8(buf[4]).is_none() {
            return Err(BsonError::UnknownType(buf[4]));
        }

        Ok(Self { data: buf, size: declared })
    }

    /// Declared size of the document in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// True if the document holds no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size == EMPTY_DOCUMENT_SIZE
    }

    /// First element, or `None` for the empty document.
    ///
    /// # Errors
    ///
    /// Returns a [`BsonError`] if the element is structurally invalid.
    pub fn first(&self) -> Result<Option<Element<'a>>> {
        self.element_at(4)
    }

    /// Element following `current`, or `None` at the end of the document.
    ///
    /// # Errors
    ///
    /// Returns a [`BsonError`] if the element is structurally invalid.
    pub fn next(&self, current: &Element<'a>) -> Result<Option<Element<'a>>> {
        self.element_at(current.end)
    }

    /// Find the element with the given key.
    ///
    /// # Errors
    ///
    /// Returns [`BsonError::KeyNotFound`] when no element matches, or a
    /// structural error if the document is corrupt past the parse-time
    /// checks.
    pub fn lookup(&self, key: &str) -> Result<Element<'a>> {
        let mut cursor = self.first()?;
        while let Some(element) = cursor {
            if element.name == key {
                return Ok(element);
            }
            cursor = self.next(&element)?;
        }
        Err(BsonError::KeyNotFound(key.to_string()))
    }

    /// Iterator over all elements in declaration order.
    ///
    /// Yields `Err` once and stops if a structural violation is hit.
    pub fn elements(&self) -> Elements<'a> {
        Elements { doc: *self, offset: 4, failed: false }
    }

    fn element_at(&self, offset: usize) -> Result<Option<Element<'a>>> {
        if offset >= self.size {
            return Err(BsonError::Truncated { offset });
        }

        let tag_byte = self.data[offset];
        if tag_byte == 0 {
            return Ok(None);
        }
        let tag = BsonType::from_u8(tag_byte).ok_or(BsonError::UnknownType(tag_byte))?;

        let key_start = offset + 1;
        let key_len = self.data[key_start..self.size]
            .iter()
            .position(|&b| b == 0)
            .ok_or(BsonError::Truncated { offset: self.size })?;
        let name = std::str::from_utf8(&self.data[key_start..key_start + key_len])
            .map_err(|_| BsonError::InvalidUtf8 { offset: key_start })?;

        let value_offset = key_start + key_len + 1;
        let value_len = self.value_len(tag, value_offset)?;
        let end = value_offset + value_len;
        // Last element ends right before the terminator byte.
        if end > self.size - 1 {
            return Err(BsonError::Truncated { offset: end });
        }

        Ok(Some(Element {
            tag,
            name,
            value: &self.data[value_offset..end],
            value_offset,
            end,
        }))
    }

    fn value_len(&self, tag: BsonType, value_offset: usize) -> Result<usize> {
        let read_u32 = |at: usize| -> Result<usize> {
            if at + 4 > self.size {
                return Err(BsonError::Truncated { offset: at });
            }
            Ok(u32::from_le_bytes([
                self.data[at],
                self.data[at + 1],
                self.data[at + 2],
                self.data[at + 3],
            ]) as usize)
        };

        match tag {
            BsonType::Double | BsonType::Datetime | BsonType::Int64 => Ok(8),
            BsonType::Int32 => Ok(4),
            BsonType::Boolean => Ok(1),
            BsonType::String => Ok(4 + read_u32(value_offset)?),
            BsonType::Document | BsonType::Array => read_u32(value_offset),
            BsonType::Binary => Ok(4 + 1 + read_u32(value_offset)?),
        }
    }
}

/// Iterator over document elements. See [`Document::elements`].
#[derive(Debug)]
pub struct Elements<'a> {
    doc: Document<'a>,
    offset: usize,
    failed: bool,
}

impl<'a> Iterator for Elements<'a> {
    type Item = Result<Element<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.doc.element_at(self.offset) {
            Ok(Some(element)) => {
                self.offset = element.end;
                Some(Ok(element))
            },
            Ok(None) => None,
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            },
        }
    }
}

impl<'a> Element<'a> {
    /// Element type tag.
    #[must_use]
    pub fn tag(&self) -> BsonType {
        self.tag
    }

    /// Element key.
    #[must_use]
    pub fn name(&self) -> &'a str {
        self.name
    }

    fn require(&self, expected: BsonType) -> Result<()> {
        if self.tag != expected {
            return Err(BsonError::TypeMismatch {
                expected: expected.to_u8(),
                actual: self.tag.to_u8(),
            });
        }
        Ok(())
    }

    /// Extract a double value.
    ///
    /// # Errors
    ///
    /// Returns [`BsonError::TypeMismatch`] for any other tag.
    pub fn as_f64(&self) -> Result<f64> {
        self.require(BsonType::Double)?;
        Ok(f64::from_le_bytes(self.fixed::<8>()?))
    }

    /// Extract a 32-bit integer value.
    ///
    /// # Errors
    ///
    /// Returns [`BsonError::TypeMismatch`] for any other tag.
    pub fn as_i32(&self) -> Result<i32> {
        self.require(BsonType::Int32)?;
        Ok(i32::from_le_bytes(self.fixed::<4>()?))
    }

    /// Extract a 64-bit integer value.
    ///
    /// # Errors
    ///
    /// Returns [`BsonError::TypeMismatch`] for any other tag.
    pub fn as_i64(&self) -> Result<i64> {
        self.require(BsonType::Int64)?;
        Ok(i64::from_le_bytes(self.fixed::<8>()?))
    }

    /// Extract a boolean value.
    ///
    /// # Errors
    ///
    /// Returns [`BsonError::TypeMismatch`] for any other tag.
    pub fn as_bool(&self) -> Result<bool> {
        self.require(BsonType::Boolean)?;
        let bytes = self.fixed::<1>()?;
        Ok(bytes[0] != 0)
    }

    /// Extract a datetime value as milliseconds since the Unix epoch.
    ///
    /// # Errors
    ///
    /// Returns [`BsonError::TypeMismatch`] for any other tag.
    pub fn as_datetime(&self) -> Result<i64> {
        self.require(BsonType::Datetime)?;
        Ok(i64::from_le_bytes(self.fixed::<8>()?))
    }

    /// Extract a UTF-8 string value.
    ///
    /// # Errors
    ///
    /// Returns [`BsonError::TypeMismatch`] for any other tag,
    /// [`BsonError::Truncated`] if the declared length overruns the value, and
    /// [`BsonError::InvalidUtf8`] for malformed string bytes.
    pub fn as_str(&self) -> Result<&'a str> {
        self.require(BsonType::String)?;
        if self.value.len() < 5 {
            return Err(BsonError::Truncated { offset: self.value_offset });
        }
        let len = u32::from_le_bytes([self.value[0], self.value[1], self.value[2], self.value[3]])
            as usize;
        // Declared length counts the trailing NUL.
        if len == 0 || 4 + len > self.value.len() {
            return Err(BsonError::Truncated { offset: self.value_offset });
        }
        std::str::from_utf8(&self.value[4..4 + len - 1])
            .map_err(|_| BsonError::InvalidUtf8 { offset: self.value_offset + 4 })
    }

    /// Extract a binary blob value.
    ///
    /// # Errors
    ///
    /// Returns [`BsonError::TypeMismatch`] for any other tag and
    /// [`BsonError::Truncated`] if the declared length overruns the value.
    pub fn as_binary(&self) -> Result<&'a [u8]> {
        self.require(BsonType::Binary)?;
        if self.value.len() < 5 {
            return Err(BsonError::Truncated { offset: self.value_offset });
        }
        let len = u32::from_le_bytes([self.value[0], self.value[1], self.value[2], self.value[3]])
            as usize;
        if 5 + len > self.value.len() {
            return Err(BsonError::Truncated { offset: self.value_offset });
        }
        Ok(&self.value[5..5 + len])
    }

    /// Extract an embedded document or array value.
    ///
    /// Arrays share the document layout, so both tags are accepted.
    ///
    /// # Errors
    ///
    /// Returns [`BsonError::TypeMismatch`] for scalar tags, or any parse
    /// error from the nested document.
    pub fn as_document(&self) -> Result<Document<'a>> {
        if self.tag != BsonType::Document && self.tag != BsonType::Array {
            return Err(BsonError::TypeMismatch {
                expected: BsonType::Document.to_u8(),
                actual: self.tag.to_u8(),
            });
        }
        Document::parse(self.value)
    }

    fn fixed<const N: usize>(&self) -> Result<[u8; N]> {
        let bytes: &[u8; N] = self
            .value
            .try_into()
            .map_err(|_| BsonError::Truncated { offset: self.value_offset })?;
        Ok(*bytes)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::serializer::BsonSerializer;

    #[test]
    fn empty_document_parses() {
        let doc = Document::parse(&[5, 0, 0, 0, 0]).expect("empty document is valid");
        assert!(doc.is_empty());
        assert_eq!(doc.size(), 5);
        assert!(doc.first().expect("walk empty").is_none());
    }

    #[test]
    fn four_byte_buffer_is_too_short() {
        let err = Document::parse(&[4, 0, 0, 0]).unwrap_err();
        assert_eq!(err, BsonError::DocumentTooShort { expected: 5, actual: 4 });
    }

    #[test]
    fn empty_buffer_is_too_short() {
        let err = Document::parse(&[]).unwrap_err();
        assert_eq!(err, BsonError::DocumentTooShort { expected: 5, actual: 0 });
    }

    #[test]
    fn declared_size_beyond_buffer_is_rejected() {
        let mut ser = BsonSerializer::new();
        ser.append_int32("a", 1);
        let encoded = ser.finish();

        let truncated = &encoded[..encoded.len() - 2];
        let err = Document::parse(truncated).unwrap_err();
        assert_eq!(
            err,
            BsonError::SizeMismatch { declared: encoded.len(), actual: truncated.len() }
        );
    }

    #[test]
    fn missing_terminator_is_rejected() {
        let mut ser = BsonSerializer::new();
        ser.append_int32("a", 1);
        let mut encoded = ser.finish().to_vec();
        let last = encoded.len() - 1;
        encoded[last] = 0x42;

        assert_eq!(Document::parse(&encoded).unwrap_err(), BsonError::MissingTerminator);
    }

    #[test]
    fn unknown_first_tag_is_rejected() {
        let mut ser = BsonSerializer::new();
        ser.append_int32("a", 1);
        let mut encoded = ser.finish().to_vec();
        encoded[4] = 0x7F;

        assert_eq!(Document::parse(&encoded).unwrap_err(), BsonError::UnknownType(0x7F));
    }

    #[test]
    fn trailing_bytes_are_ignored() {
        let mut ser = BsonSerializer::new();
        ser.append_boolean("ok", true);
        let mut encoded = ser.finish().to_vec();
        let declared = encoded.len();
        encoded.extend_from_slice(&[0xAA, 0xBB]);

        let doc = Document::parse(&encoded).expect("padded document is valid");
        assert_eq!(doc.size(), declared);
        assert!(doc.lookup("ok").expect("lookup").as_bool().expect("bool"));
    }

    #[test]
    fn double_round_trip() {
        let mut ser = BsonSerializer::new();
        ser.append_double("v", 42.3);
        let encoded = ser.finish();

        let doc = Document::parse(&encoded).expect("parse");
        let value = doc.lookup("v").expect("lookup").as_f64().expect("double");
        assert!((value - 42.3).abs() < 1e-9);
    }

    #[test]
    fn lookup_walks_all_elements() {
        let mut ser = BsonSerializer::new();
        ser.append_int32("first", 1);
        ser.append_string("second", "two");
        ser.append_int64("third", 3);
        let encoded = ser.finish();

        let doc = Document::parse(&encoded).expect("parse");
        assert_eq!(doc.lookup("second").expect("lookup").as_str().expect("string"), "two");
        assert_eq!(doc.lookup("third").expect("lookup").as_i64().expect("int64"), 3);
        assert_eq!(
            doc.lookup("missing").unwrap_err(),
            BsonError::KeyNotFound("missing".to_string())
        );
    }

    #[test]
    fn elements_iterates_in_order() {
        let mut ser = BsonSerializer::new();
        ser.append_int32("a", 1);
        ser.append_int32("b", 2);
        let encoded = ser.finish();

        let doc = Document::parse(&encoded).expect("parse");
        let names: Vec<_> =
            doc.elements().map(|e| e.expect("element").name().to_string()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn type_mismatch_on_wrong_extractor() {
        let mut ser = BsonSerializer::new();
        ser.append_int32("v", 7);
        let encoded = ser.finish();

        let doc = Document::parse(&encoded).expect("parse");
        let element = doc.lookup("v").expect("lookup");
        assert_eq!(
            element.as_str().unwrap_err(),
            BsonError::TypeMismatch {
                expected: BsonType::String.to_u8(),
                actual: BsonType::Int32.to_u8()
            }
        );
    }

    #[test]
    fn array_round_trip_via_nested_document() {
        let mut ser = BsonSerializer::new();
        ser.append_string_array("v", &["x", "yy", "zzz"]);
        let encoded = ser.finish();

        let doc = Document::parse(&encoded).expect("parse");
        let array = doc.lookup("v").expect("lookup").as_document().expect("array doc");

        let values: Vec<_> =
            array.elements().map(|e| e.expect("element").as_str().expect("string")).collect();
        assert_eq!(values, vec!["x", "yy", "zzz"]);

        let keys: Vec<_> = array.elements().map(|e| e.expect("element").name()).collect();
        assert_eq!(keys, vec!["0", "1", "2"]);
    }

    #[test]
    fn binary_with_embedded_nul_round_trips() {
        let payload = [0u8, 1, 0, 2, 0];
        let mut ser = BsonSerializer::new();
        ser.append_binary("blob", &payload);
        let encoded = ser.finish();

        let doc = Document::parse(&encoded).expect("parse");
        assert_eq!(doc.lookup("blob").expect("lookup").as_binary().expect("binary"), &payload);
    }

    #[test]
    fn empty_array_parses_as_empty_document() {
        let mut ser = BsonSerializer::new();
        ser.append_int32_array("v", &[]);
        let encoded = ser.finish();

        let doc = Document::parse(&encoded).expect("parse");
        let array = doc.lookup("v").expect("lookup").as_document().expect("array doc");
        assert!(array.is_empty());
    }

    proptest! {
        #[test]
        fn int32_round_trip(value in any::<i32>()) {
            let mut ser = BsonSerializer::new();
            ser.append_int32("v", value);
            let encoded = ser.finish();

            let doc = Document::parse(&encoded).unwrap();
            prop_assert_eq!(doc.lookup("v").unwrap().as_i32().unwrap(), value);
        }

        #[test]
        fn int64_round_trip(value in any::<i64>()) {
            let mut ser = BsonSerializer::new();
            ser.append_int64("v", value);
            let encoded = ser.finish();

            let doc = Document::parse(&encoded).unwrap();
            prop_assert_eq!(doc.lookup("v").unwrap().as_i64().unwrap(), value);
        }

        #[test]
        fn finite_double_round_trip(value in prop::num::f64::NORMAL | prop::num::f64::ZERO) {
            let mut ser = BsonSerializer::new();
            ser.append_double("v", value);
            let encoded = ser.finish();

            let doc = Document::parse(&encoded).unwrap();
            prop_assert_eq!(doc.lookup("v").unwrap().as_f64().unwrap(), value);
        }

        #[test]
        fn string_round_trip(value in "[a-zA-Z0-9 _./-]{0,64}") {
            let mut ser = BsonSerializer::new();
            ser.append_string("v", &value);
            let encoded = ser.finish();

            let doc = Document::parse(&encoded).unwrap();
            prop_assert_eq!(doc.lookup("v").unwrap().as_str().unwrap(), value);
        }

        #[test]
        fn bool_round_trip(value in any::<bool>()) {
            let mut ser = BsonSerializer::new();
            ser.append_boolean("v", value);
            let encoded = ser.finish();

            let doc = Document::parse(&encoded).unwrap();
            prop_assert_eq!(doc.lookup("v").unwrap().as_bool().unwrap(), value);
        }

        #[test]
        fn parse_never_panics(buf in prop::collection::vec(any::<u8>(), 0..64)) {
            let _ = Document::parse(&buf);
        }

        #[test]
        fn walk_never_panics(buf in prop::collection::vec(any::<u8>(), 0..64)) {
            if let Ok(doc) = Document::parse(&buf) {
                for element in doc.elements() {
                    let _ = element.map(|e| {
                        let _ = e.as_str();
                        let _ = e.as_binary();
                        let _ = e.as_document();
                    });
                }
            }
        }
    }
}
