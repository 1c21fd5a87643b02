//! Mapping model: endpoint patterns, value types, delivery reliability.
//!
//! A mapping binds one endpoint pattern inside an interface to a value type
//! and delivery semantics. Endpoint segments are either literals or
//! parameters of the form `%{name}`; a parameter may carry a literal prefix
//! within its segment (`/sensor%{id}/value`).

use crate::{
    error::{DeviceError, Result},
    individual::Individual,
};

/// Delivery reliability for a mapping, mirroring transport QoS levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Reliability {
    /// Fire and forget
    Unreliable = 0,
    /// Delivered at least once
    Guaranteed = 1,
    /// Delivered exactly once
    Unique = 2,
}

impl TryFrom<i32> for Reliability {
    type Error = DeviceError;

    fn try_from(value: i32) -> Result<Self> {
        match value {
            0 => Ok(Self::Unreliable),
            1 => Ok(Self::Guaranteed),
            2 => Ok(Self::Unique),
            other => Err(DeviceError::InvalidQos(other)),
        }
    }
}

/// Value type a mapping accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MappingType {
    /// 64-bit float
    Double,
    /// 32-bit signed integer
    Int32,
    /// 64-bit signed integer
    Int64,
    /// Boolean
    Boolean,
    /// UTC datetime, millisecond precision
    Datetime,
    /// UTF-8 string
    String,
    /// Binary blob
    Binary,
    /// Array of doubles
    DoubleArray,
    /// Array of 32-bit integers
    Int32Array,
    /// Array of 64-bit integers
    Int64Array,
    /// Array of booleans
    BooleanArray,
    /// Array of datetimes
    DatetimeArray,
    /// Array of strings
    StringArray,
    /// Array of binary blobs
    BinaryArray,
}

impl MappingType {
    /// True for the array variants.
    #[must_use]
    pub const fn is_array(self) -> bool {
        matches!(
            self,
            Self::DoubleArray
                | Self::Int32Array
                | Self::Int64Array
                | Self::BooleanArray
                | Self::DatetimeArray
                | Self::StringArray
                | Self::BinaryArray
        )
    }

    /// Element type for arrays; identity for scalars.
    #[must_use]
    pub const fn scalar(self) -> Self {
        match self {
            Self::DoubleArray => Self::Double,
            Self::Int32Array => Self::Int32,
            Self::Int64Array => Self::Int64,
            Self::BooleanArray => Self::Boolean,
            Self::DatetimeArray => Self::Datetime,
            Self::StringArray => Self::String,
            Self::BinaryArray => Self::Binary,
            other => other,
        }
    }
}

/// One endpoint inside an interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapping {
    /// Endpoint pattern, `/`-rooted
    pub endpoint: String,
    /// Value type accepted on this endpoint
    pub mapping_type: MappingType,
    /// Delivery reliability
    pub reliability: Reliability,
    /// Whether samples must carry an explicit timestamp
    pub explicit_timestamp: bool,
    /// Whether a property on this endpoint may be unset
    pub allow_unset: bool,
}

impl Mapping {
    /// Create a mapping with default delivery semantics (unreliable, no
    /// explicit timestamp, no unset).
    pub fn new(endpoint: impl Into<String>, mapping_type: MappingType) -> Self {
        Self {
            endpoint: endpoint.into(),
            mapping_type,
            reliability: Reliability::Unreliable,
            explicit_timestamp: false,
            allow_unset: false,
        }
    }

    /// Set the delivery reliability.
    #[must_use]
    pub fn with_reliability(mut self, reliability: Reliability) -> Self {
        self.reliability = reliability;
        self
    }

    /// Require an explicit timestamp on every sample.
    #[must_use]
    pub fn with_explicit_timestamp(mut self) -> Self {
        self.explicit_timestamp = true;
        self
    }

    /// Allow unsetting a property on this endpoint.
    #[must_use]
    pub fn with_allow_unset(mut self) -> Self {
        self.allow_unset = true;
        self
    }

    /// True if the endpoint pattern is well-formed.
    ///
    /// Patterns must be `/`-rooted, must not end with a separator, and must
    /// have no empty segments.
    #[must_use]
    pub fn endpoint_is_valid(&self) -> bool {
        let Some(rest) = self.endpoint.strip_prefix('/') else {
            return false;
        };
        !rest.is_empty() && rest.split('/').all(|segment| !segment.is_empty())
    }

    /// Match a concrete path against the endpoint pattern.
    ///
    /// Empty paths, paths not rooted at `/`, and paths ending in `/` never
    /// match. Segment counts must be equal. Literal segments compare
    /// byte-for-byte; a parameter segment accepts any non-empty remainder
    /// after its literal prefix, provided the remainder contains no topic
    /// wildcard characters.
    #[must_use]
    pub fn matches_path(&self, path: &str) -> bool {
        if path.is_empty() || !path.starts_with('/') || path.ends_with('/') {
            return false;
        }

        let mut pattern_segments = self.endpoint.split('/');
        let mut path_segments = path.split('/');

        loop {
            match (pattern_segments.next(), path_segments.next()) {
                (Some(pattern), Some(segment)) => {
                    if !segment_matches(pattern, segment) {
                        return false;
                    }
                },
                (None, None) => return true,
                _ => return false,
            }
        }
    }

    /// Check a value against the mapping's declared type.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::IncompatibleValue`] on a type mismatch and
    /// [`DeviceError::NonFiniteValue`] for NaN or infinite doubles.
    pub fn check_individual(&self, value: &Individual) -> Result<()> {
        let actual = value.mapping_type();
        if actual != self.mapping_type {
            return Err(DeviceError::IncompatibleValue {
                expected: self.mapping_type,
                actual,
            });
        }

        match value {
            Individual::Double(sample) if !sample.is_finite() => {
                Err(DeviceError::NonFiniteValue { path: self.endpoint.clone() })
            },
            Individual::DoubleArray(samples) if samples.iter().any(|s| !s.is_finite()) => {
                Err(DeviceError::NonFiniteValue { path: self.endpoint.clone() })
            },
            _ => Ok(()),
        }
    }
}

fn segment_matches(pattern: &str, segment: &str) -> bool {
    match pattern.find("%{") {
        Some(idx) if pattern.ends_with('}') => {
            let prefix = &pattern[..idx];
            match segment.strip_prefix(prefix) {
                Some(remainder) => {
                    !remainder.is_empty() && !remainder.contains(['#', '+'])
                },
                None => false,
            }
        },
        _ => pattern == segment,
    }
}
