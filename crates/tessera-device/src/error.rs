//! Error types for the device SDK.
//!
//! [`DeviceError`] is the single error surface of the public API. Collaborator
//! layers (credential store, crypto, pairing, transport) keep their own small
//! error enums and convert at the boundary via `From`.

use thiserror::Error;

use crate::{
    credentials::{CredentialKind, CryptoError, StoreError},
    interface::{Aggregation, InterfaceType},
    mapping::MappingType,
    pairing::PairingError,
    transport::TransportError,
};

/// Errors returned by the public device API.
#[derive(Error, Debug)]
pub enum DeviceError {
    // Interface registration errors
    /// Interface declares version 0.0, which is reserved
    #[error("interface {interface} declares invalid version 0.0")]
    InvalidVersion {
        /// Offending interface name
        interface: String,
    },

    /// Interface has no mappings
    #[error("interface {interface} declares no mappings")]
    EmptyInterface {
        /// Offending interface name
        interface: String,
    },

    /// Mapping endpoint is not a valid pattern
    #[error("interface {interface} declares invalid endpoint {endpoint}")]
    InvalidEndpoint {
        /// Offending interface name
        interface: String,
        /// Offending endpoint pattern
        endpoint: String,
    },

    /// An interface with the same name is already registered
    #[error("interface {0} is already registered")]
    DuplicateInterface(String),

    // Publish-side validation errors
    /// No registered interface has the given name
    #[error("interface {0} is not registered")]
    InterfaceNotFound(String),

    /// No mapping in the interface matches the path
    #[error("no mapping in {interface} matches path {path}")]
    MappingNotFound {
        /// Interface that was searched
        interface: String,
        /// Path that failed to match
        path: String,
    },

    /// Path is empty or not `/`-rooted
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// Value type does not match the mapping's declared type
    #[error("incompatible value: mapping expects {expected:?}, got {actual:?}")]
    IncompatibleValue {
        /// Type declared by the mapping
        expected: MappingType,
        /// Type of the supplied value
        actual: MappingType,
    },

    /// Double value is NaN or infinite
    #[error("non-finite sample for path {path}")]
    NonFiniteValue {
        /// Path the sample was destined for
        path: String,
    },

    /// Mapping requires an explicit timestamp and none was supplied
    #[error("mapping for {interface}{path} requires an explicit timestamp")]
    TimestampRequired {
        /// Interface name
        interface: String,
        /// Path within the interface
        path: String,
    },

    /// Mapping does not accept an explicit timestamp
    #[error("mapping for {interface}{path} does not accept a timestamp")]
    TimestampNotSupported {
        /// Interface name
        interface: String,
        /// Path within the interface
        path: String,
    },

    /// Property mapping does not allow unset
    #[error("mapping for {interface}{path} does not allow unset")]
    UnsetNotAllowed {
        /// Interface name
        interface: String,
        /// Path within the interface
        path: String,
    },

    /// Device tried to write a server-owned interface
    #[error("interface {interface} is server-owned and cannot be written by the device")]
    OwnershipViolation {
        /// Offending interface name
        interface: String,
    },

    /// Operation does not match the interface aggregation
    #[error("interface {interface} has {expected:?} aggregation")]
    AggregationMismatch {
        /// Offending interface name
        interface: String,
        /// Aggregation the operation requires
        expected: Aggregation,
    },

    /// Operation does not match the interface type
    #[error("interface {interface} is not a {expected:?} interface")]
    InterfaceTypeMismatch {
        /// Offending interface name
        interface: String,
        /// Interface type the operation requires
        expected: InterfaceType,
    },

    /// Raw QoS value outside the supported 0..=2 range
    #[error("invalid QoS value: {0}")]
    InvalidQos(i32),

    // Lifecycle errors
    /// Reinitialization in progress; the call could not acquire the session
    /// guard within the bounded wait
    #[error("device is not ready")]
    NotReady,

    /// Operation requires a started device
    #[error("device has not been started")]
    NotStarted,

    /// `start` called while the device is already running
    #[error("device is already started")]
    AlreadyStarted,

    /// Builder finished without a required collaborator
    #[error("missing collaborator: {0}")]
    MissingCollaborator(&'static str),

    /// Transport rejected or failed a publish
    #[error("publish to {topic} failed: {reason}")]
    PublishFailed {
        /// Destination topic
        topic: String,
        /// Transport-reported reason
        reason: String,
    },

    /// A credential the flow depends on is absent from the store
    #[error("missing credential: {0}")]
    MissingCredential(CredentialKind),

    // Collaborator errors
    /// Key or CSR generation failed
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Pairing service call failed
    #[error(transparent)]
    Pairing(#[from] PairingError),

    /// Credential store backend failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Transport operation failed
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Payload encoding or decoding failed
    #[error(transparent)]
    Bson(#[from] tessera_bson::BsonError),
}

/// Convenient Result type alias for device operations
pub type Result<T> = std::result::Result<T, DeviceError>;
