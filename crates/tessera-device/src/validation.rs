//! Publish-side validation pipeline.
//!
//! Every outbound operation runs through one of these checks before any
//! payload is encoded or any transport call is made. A failed check has no
//! side effects.

use crate::{
    error::{DeviceError, Result},
    individual::{Individual, ObjectEntry},
    interface::{Aggregation, Interface, InterfaceType, Ownership},
    mapping::Mapping,
};

fn check_path_shape(path: &str) -> Result<()> {
    if path.is_empty() || !path.starts_with('/') {
        return Err(DeviceError::InvalidPath(path.to_string()));
    }
    Ok(())
}

fn check_device_owned(interface: &Interface) -> Result<()> {
    if interface.ownership() != Ownership::Device {
        return Err(DeviceError::OwnershipViolation { interface: interface.name().to_string() });
    }
    Ok(())
}

fn check_timestamp(interface: &Interface, path: &str, mapping: &Mapping, timestamp: Option<i64>) -> Result<()> {
    match (mapping.explicit_timestamp, timestamp) {
        (true, None) => Err(DeviceError::TimestampRequired {
            interface: interface.name().to_string(),
            path: path.to_string(),
        }),
        (false, Some(_)) => Err(DeviceError::TimestampNotSupported {
            interface: interface.name().to_string(),
            path: path.to_string(),
        }),
        _ => Ok(()),
    }
}

/// Validate an individual datastream publish, resolving its mapping.
///
/// # Errors
///
/// Any structural, type, or timestamp-policy violation, as a structured
/// [`DeviceError`].
pub fn individual_datastream<'a>(
    interface: &'a Interface,
    path: &str,
    value: &Individual,
    timestamp: Option<i64>,
) -> Result<&'a Mapping> {
    check_path_shape(path)?;
    check_device_owned(interface)?;
    if interface.interface_type() != InterfaceType::Datastream {
        return Err(DeviceError::InterfaceTypeMismatch {
            interface: interface.name().to_string(),
            expected: InterfaceType::Datastream,
        });
    }
    if interface.aggregation() != Aggregation::Individual {
        return Err(DeviceError::AggregationMismatch {
            interface: interface.name().to_string(),
            expected: Aggregation::Individual,
        });
    }

    let mapping = interface.mapping_for_path(path)?;
    mapping.check_individual(value)?;
    check_timestamp(interface, path, mapping, timestamp)?;
    Ok(mapping)
}

/// Validate an aggregated-object publish.
///
/// Each entry is resolved against the mapping for `<path>/<entry.path>`.
/// The timestamp policy follows the first declared mapping, matching the
/// reliability rule for objects.
///
/// # Errors
///
/// Any structural, type, or timestamp-policy violation, as a structured
/// [`DeviceError`].
pub fn object_datastream(
    interface: &Interface,
    path: &str,
    entries: &[ObjectEntry],
    timestamp: Option<i64>,
) -> Result<()> {
    check_path_shape(path)?;
    check_device_owned(interface)?;
    if interface.interface_type() != InterfaceType::Datastream {
        return Err(DeviceError::InterfaceTypeMismatch {
            interface: interface.name().to_string(),
            expected: InterfaceType::Datastream,
        });
    }
    if interface.aggregation() != Aggregation::Object {
        return Err(DeviceError::AggregationMismatch {
            interface: interface.name().to_string(),
            expected: Aggregation::Object,
        });
    }

    for entry in entries {
        let full_path = format!("{path}/{}", entry.path);
        let mapping = interface.mapping_for_path(&full_path)?;
        mapping.check_individual(&entry.individual)?;
    }

    let first = interface.mappings().first().ok_or_else(|| DeviceError::MappingNotFound {
        interface: interface.name().to_string(),
        path: path.to_string(),
    })?;
    check_timestamp(interface, path, first, timestamp)?;
    Ok(())
}

/// Validate a property set, resolving its mapping.
///
/// Properties never carry explicit timestamps.
///
/// # Errors
///
/// Any structural or type violation, as a structured [`DeviceError`].
pub fn set_property<'a>(
    interface: &'a Interface,
    path: &str,
    value: &Individual,
) -> Result<&'a Mapping> {
    check_path_shape(path)?;
    check_device_owned(interface)?;
    if interface.interface_type() != InterfaceType::Properties {
        return Err(DeviceError::InterfaceTypeMismatch {
            interface: interface.name().to_string(),
            expected: InterfaceType::Properties,
        });
    }

    let mapping = interface.mapping_for_path(path)?;
    mapping.check_individual(value)?;
    Ok(mapping)
}

/// Validate a property unset, resolving its mapping.
///
/// # Errors
///
/// [`DeviceError::UnsetNotAllowed`] when the mapping forbids unset, plus the
/// structural checks shared with [`set_property`].
pub fn unset_property<'a>(interface: &'a Interface, path: &str) -> Result<&'a Mapping> {
    check_path_shape(path)?;
    check_device_owned(interface)?;
    if interface.interface_type() != InterfaceType::Properties {
        return Err(DeviceError::InterfaceTypeMismatch {
            interface: interface.name().to_string(),
            expected: InterfaceType::Properties,
        });
    }

    let mapping = interface.mapping_for_path(path)?;
    if !mapping.allow_unset {
        return Err(DeviceError::UnsetNotAllowed {
            interface: interface.name().to_string(),
            path: path.to_string(),
        });
    }
    Ok(mapping)
}
