//! Typed values exchanged on interface endpoints.
//!
//! [`Individual`] is the tagged union covering every scalar and array type a
//! mapping can declare. It owns its heap data, so a value can outlive the
//! buffer it was decoded from.

use tessera_bson::{BsonSerializer, Element};

use crate::{error::Result, mapping::MappingType};

/// One typed value for a single endpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum Individual {
    /// 64-bit float
    Double(f64),
    /// 32-bit signed integer
    Int32(i32),
    /// 64-bit signed integer
    Int64(i64),
    /// Boolean
    Boolean(bool),
    /// UTC datetime, milliseconds since the Unix epoch
    Datetime(i64),
    /// UTF-8 string
    String(String),
    /// Binary blob
    Binary(Vec<u8>),
    /// Array of doubles
    DoubleArray(Vec<f64>),
    /// Array of 32-bit integers
    Int32Array(Vec<i32>),
    /// Array of 64-bit integers
    Int64Array(Vec<i64>),
    /// Array of booleans
    BooleanArray(Vec<bool>),
    /// Array of datetimes
    DatetimeArray(Vec<i64>),
    /// Array of strings
    StringArray(Vec<String>),
    /// Array of binary blobs
    BinaryArray(Vec<Vec<u8>>),
}

impl Individual {
    /// The mapping type this value satisfies.
    #[must_use]
    pub fn mapping_type(&self) -> MappingType {
        match self {
            Self::Double(_) => MappingType::Double,
            Self::Int32(_) => MappingType::Int32,
            Self::Int64(_) => MappingType::Int64,
            Self::Boolean(_) => MappingType::Boolean,
            Self::Datetime(_) => MappingType::Datetime,
            Self::String(_) => MappingType::String,
            Self::Binary(_) => MappingType::Binary,
            Self::DoubleArray(_) => MappingType::DoubleArray,
            Self::Int32Array(_) => MappingType::Int32Array,
            Self::Int64Array(_) => MappingType::Int64Array,
            Self::BooleanArray(_) => MappingType::BooleanArray,
            Self::DatetimeArray(_) => MappingType::DatetimeArray,
            Self::StringArray(_) => MappingType::StringArray,
            Self::BinaryArray(_) => MappingType::BinaryArray,
        }
    }

    /// Construct a datetime value (milliseconds since the Unix epoch).
    ///
    /// Datetimes and 64-bit integers share a representation, so the plain
    /// `From<i64>` conversion maps to [`Individual::Int64`].
    #[must_use]
    pub fn datetime(epoch_millis: i64) -> Self {
        Self::Datetime(epoch_millis)
    }

    /// Append this value to a document under the given key.
    pub fn append_to(&self, serializer: &mut BsonSerializer, key: &str) {
        match self {
            Self::Double(v) => serializer.append_double(key, *v),
            Self::Int32(v) => serializer.append_int32(key, *v),
            Self::Int64(v) => serializer.append_int64(key, *v),
            Self::Boolean(v) => serializer.append_boolean(key, *v),
            Self::Datetime(v) => serializer.append_datetime(key, *v),
            Self::String(v) => serializer.append_string(key, v),
            Self::Binary(v) => serializer.append_binary(key, v),
            Self::DoubleArray(v) => serializer.append_double_array(key, v),
            Self::Int32Array(v) => serializer.append_int32_array(key, v),
            Self::Int64Array(v) => serializer.append_int64_array(key, v),
            Self::BooleanArray(v) => serializer.append_boolean_array(key, v),
            Self::DatetimeArray(v) => serializer.append_datetime_array(key, v),
            Self::StringArray(v) => serializer.append_string_array(key, v),
            Self::BinaryArray(v) => serializer.append_binary_array(key, v),
        }
    }

    /// Decode a value from a document element, guided by the mapping type.
    ///
    /// The expected type comes from the matched mapping, so empty arrays
    /// decode unambiguously.
    ///
    /// # Errors
    ///
    /// Returns the underlying codec error when the element does not hold the
    /// expected type or is structurally invalid.
    pub fn deserialize(element: &Element<'_>, expected: MappingType) -> Result<Self> {
        let value = match expected {
            MappingType::Double => Self::Double(element.as_f64()?),
            MappingType::Int32 => Self::Int32(element.as_i32()?),
            MappingType::Int64 => Self::Int64(element.as_i64()?),
            MappingType::Boolean => Self::Boolean(element.as_bool()?),
            MappingType::Datetime => Self::Datetime(element.as_datetime()?),
            MappingType::String => Self::String(element.as_str()?.to_string()),
            MappingType::Binary => Self::Binary(element.as_binary()?.to_vec()),
            MappingType::DoubleArray => {
                Self::DoubleArray(collect_array(element, |e| e.as_f64())?)
            },
            MappingType::Int32Array => Self::Int32Array(collect_array(element, |e| e.as_i32())?),
            MappingType::Int64Array => Self::Int64Array(collect_array(element, |e| e.as_i64())?),
            MappingType::BooleanArray => {
                Self::BooleanArray(collect_array(element, |e| e.as_bool())?)
            },
            MappingType::DatetimeArray => {
                Self::DatetimeArray(collect_array(element, |e| e.as_datetime())?)
            },
            MappingType::StringArray => {
                Self::StringArray(collect_array(element, |e| e.as_str().map(str::to_string))?)
            },
            MappingType::BinaryArray => {
                Self::BinaryArray(collect_array(element, |e| e.as_binary().map(<[u8]>::to_vec))?)
            },
        };
        Ok(value)
    }
}

fn collect_array<T>(
    element: &Element<'_>,
    extract: impl Fn(&Element<'_>) -> tessera_bson::Result<T>,
) -> Result<Vec<T>> {
    let doc = element.as_document()?;
    let mut values = Vec::new();
    for entry in doc.elements() {
        values.push(extract(&entry?)?);
    }
    Ok(values)
}

/// One entry of an aggregated-object payload: a sub-path (without leading
/// separator) and its value.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectEntry {
    /// Leaf path relative to the common object path
    pub path: String,
    /// Value for the leaf
    pub individual: Individual,
}

impl ObjectEntry {
    /// Create an object entry.
    pub fn new(path: impl Into<String>, individual: impl Into<Individual>) -> Self {
        Self { path: path.into(), individual: individual.into() }
    }
}

impl From<f64> for Individual {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<i32> for Individual {
    fn from(v: i32) -> Self {
        Self::Int32(v)
    }
}

impl From<i64> for Individual {
    fn from(v: i64) -> Self {
        Self::Int64(v)
    }
}

impl From<bool> for Individual {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<&str> for Individual {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for Individual {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Vec<u8>> for Individual {
    fn from(v: Vec<u8>) -> Self {
        Self::Binary(v)
    }
}

impl From<Vec<f64>> for Individual {
    fn from(v: Vec<f64>) -> Self {
        Self::DoubleArray(v)
    }
}

impl From<Vec<i32>> for Individual {
    fn from(v: Vec<i32>) -> Self {
        Self::Int32Array(v)
    }
}

impl From<Vec<i64>> for Individual {
    fn from(v: Vec<i64>) -> Self {
        Self::Int64Array(v)
    }
}

impl From<Vec<bool>> for Individual {
    fn from(v: Vec<bool>) -> Self {
        Self::BooleanArray(v)
    }
}

impl From<Vec<String>> for Individual {
    fn from(v: Vec<String>) -> Self {
        Self::StringArray(v)
    }
}

impl From<Vec<Vec<u8>>> for Individual {
    fn from(v: Vec<Vec<u8>>) -> Self {
        Self::BinaryArray(v)
    }
}

#[cfg(test)]
mod tests {
    use tessera_bson::Document;

    use super::*;

    fn round_trip(value: Individual, expected: MappingType) -> Individual {
        let mut ser = BsonSerializer::new();
        value.append_to(&mut ser, "v");
        let encoded = ser.finish();

        let doc = Document::parse(&encoded).expect("parse");
        let element = doc.lookup("v").expect("lookup");
        Individual::deserialize(&element, expected).expect("deserialize")
    }

    #[test]
    fn scalar_round_trips() {
        assert_eq!(round_trip(Individual::Double(2.5), MappingType::Double), 2.5.into());
        assert_eq!(round_trip(Individual::Int32(-7), MappingType::Int32), (-7).into());
        assert_eq!(round_trip(Individual::Int64(1 << 40), MappingType::Int64), (1i64 << 40).into());
        assert_eq!(round_trip(Individual::Boolean(true), MappingType::Boolean), true.into());
        assert_eq!(
            round_trip(Individual::datetime(1_700_000_000_000), MappingType::Datetime),
            Individual::Datetime(1_700_000_000_000)
        );
        assert_eq!(round_trip(Individual::String("hi".into()), MappingType::String), "hi".into());
        assert_eq!(
            round_trip(Individual::Binary(vec![1, 2, 3]), MappingType::Binary),
            vec![1u8, 2, 3].into()
        );
    }

    #[test]
    fn array_round_trips() {
        assert_eq!(
            round_trip(Individual::Int32Array(vec![1, 2, 3]), MappingType::Int32Array),
            vec![1, 2, 3].into()
        );
        assert_eq!(
            round_trip(
                Individual::StringArray(vec!["a".into(), "b".into()]),
                MappingType::StringArray
            ),
            vec!["a".to_string(), "b".to_string()].into()
        );
        assert_eq!(
            round_trip(
                Individual::BinaryArray(vec![vec![0, 1], vec![2]]),
                MappingType::BinaryArray
            ),
            vec![vec![0u8, 1], vec![2u8]].into()
        );
    }

    #[test]
    fn empty_array_decodes_to_declared_type() {
        let decoded = round_trip(Individual::DoubleArray(vec![]), MappingType::DoubleArray);
        assert_eq!(decoded, Individual::DoubleArray(vec![]));
    }

    #[test]
    fn deserialize_rejects_type_mismatch() {
        let mut ser = BsonSerializer::new();
        ser.append_int32("v", 1);
        let encoded = ser.finish();

        let doc = Document::parse(&encoded).expect("parse");
        let element = doc.lookup("v").expect("lookup");
        assert!(Individual::deserialize(&element, MappingType::String).is_err());
        assert!(Individual::deserialize(&element, MappingType::Int64Array).is_err());
    }
}
