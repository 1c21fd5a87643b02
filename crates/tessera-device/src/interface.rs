//! Interface model: named, versioned collections of mappings.

use crate::{
    error::{DeviceError, Result},
    mapping::{Mapping, Reliability},
};

/// Which side of the connection produces data on an interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ownership {
    /// The device publishes, the platform consumes
    Device,
    /// The platform publishes, the device consumes
    Server,
}

/// Whether an interface carries a stream of samples or retained properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterfaceType {
    /// Time-ordered samples
    Datastream,
    /// Last-value-wins settable state
    Properties,
}

/// How values on an interface are grouped per publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Aggregation {
    /// One endpoint value per publish
    Individual,
    /// All endpoint values of one object per publish
    Object,
}

/// A named, versioned collection of mappings.
///
/// Immutable once registered with the device. Mapping declaration order is
/// significant: path resolution returns the first match.
#[derive(Debug, Clone, PartialEq)]
pub struct Interface {
    name: String,
    version_major: u32,
    version_minor: u32,
    ownership: Ownership,
    interface_type: InterfaceType,
    aggregation: Aggregation,
    mappings: Vec<Mapping>,
}

impl Interface {
    /// Create an interface with individual aggregation and no mappings.
    pub fn new(
        name: impl Into<String>,
        version_major: u32,
        version_minor: u32,
        ownership: Ownership,
        interface_type: InterfaceType,
    ) -> Self {
        Self {
            name: name.into(),
            version_major,
            version_minor,
            ownership,
            interface_type,
            aggregation: Aggregation::Individual,
            mappings: Vec::new(),
        }
    }

    /// Set the aggregation.
    #[must_use]
    pub fn with_aggregation(mut self, aggregation: Aggregation) -> Self {
        self.aggregation = aggregation;
        self
    }

    /// Append a mapping.
    #[must_use]
    pub fn with_mapping(mut self, mapping: Mapping) -> Self {
        self.mappings.push(mapping);
        self
    }

    /// Interface name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Major version.
    #[must_use]
    pub fn version_major(&self) -> u32 {
        self.version_major
    }

    /// Minor version.
    #[must_use]
    pub fn version_minor(&self) -> u32 {
        self.version_minor
    }

    /// Ownership side.
    #[must_use]
    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    /// Datastream or properties.
    #[must_use]
    pub fn interface_type(&self) -> InterfaceType {
        self.interface_type
    }

    /// Aggregation mode.
    #[must_use]
    pub fn aggregation(&self) -> Aggregation {
        self.aggregation
    }

    /// Declared mappings in declaration order.
    #[must_use]
    pub fn mappings(&self) -> &[Mapping] {
        &self.mappings
    }

    /// Check structural validity before registration.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::InvalidVersion`] for version 0.0,
    /// [`DeviceError::EmptyInterface`] when no mappings are declared, and
    /// [`DeviceError::InvalidEndpoint`] for malformed endpoint patterns.
    pub fn validate(&self) -> Result<()> {
        if self.version_major == 0 && self.version_minor == 0 {
            return Err(DeviceError::InvalidVersion { interface: self.name.clone() });
        }
        if self.mappings.is_empty() {
            return Err(DeviceError::EmptyInterface { interface: self.name.clone() });
        }
        for mapping in &self.mappings {
            if !mapping.endpoint_is_valid() {
                return Err(DeviceError::InvalidEndpoint {
                    interface: self.name.clone(),
                    endpoint: mapping.endpoint.clone(),
                });
            }
        }
        Ok(())
    }

    /// Resolve a concrete path to its mapping.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::MappingNotFound`] when no mapping matches.
    pub fn mapping_for_path(&self, path: &str) -> Result<&Mapping> {
        self.mappings.iter().find(|m| m.matches_path(path)).ok_or_else(|| {
            DeviceError::MappingNotFound { interface: self.name.clone(), path: path.to_string() }
        })
    }

    /// Delivery reliability for a publish to the given path.
    ///
    /// Individual aggregation resolves the matched mapping; object
    /// aggregation uses the first declared mapping for the whole object.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::MappingNotFound`] when resolution fails.
    pub fn reliability_for_path(&self, path: &str) -> Result<Reliability> {
        match self.aggregation {
            Aggregation::Individual => Ok(self.mapping_for_path(path)?.reliability),
            Aggregation::Object => {
                self.mappings.first().map(|m| m.reliability).ok_or_else(|| {
                    DeviceError::MappingNotFound {
                        interface: self.name.clone(),
                        path: path.to_string(),
                    }
                })
            },
        }
    }
}
