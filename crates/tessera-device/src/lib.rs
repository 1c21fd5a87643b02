//! Device-side SDK for the Tessera IoT platform.
//!
//! A device declares typed [`Interface`]s, authenticates with a client
//! certificate obtained through the pairing service, and exchanges
//! BSON-subset payloads with the platform over a publish/subscribe
//! transport.
//!
//! # Architecture
//!
//! - [`Device`]: lifecycle, publish pipeline, inbound dispatch, and the
//!   reinitialization state machine
//! - [`Interface`] / [`Mapping`]: the typed data model and path matching
//! - [`Introspection`]: the registered interface set and topic construction
//! - [`CredentialManager`]: key, CSR, and certificate coordination
//! - Collaborator traits ([`Transport`], [`PairingClient`],
//!   [`CredentialStore`], [`CryptoProvider`], [`ConnectivityProbe`]): the
//!   seams where the application plugs in network and storage backends
//!
//! # Example
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use tessera_device::{Device, PairingConfig, Interface, Mapping, MappingType,
//! #     Ownership, InterfaceType, MemoryCredentialStore};
//! # async fn example(
//! #     crypto: Arc<dyn tessera_device::CryptoProvider>,
//! #     pairing: Arc<dyn tessera_device::PairingClient>,
//! #     transport: Arc<dyn tessera_device::Transport>,
//! #     probe: Arc<dyn tessera_device::ConnectivityProbe>,
//! # ) -> tessera_device::Result<()> {
//! let config = PairingConfig::new("https://pairing.example", "acme", "device-1")
//!     .with_credentials_secret("secret");
//!
//! let device = Device::builder(config)
//!     .credential_store(Arc::new(MemoryCredentialStore::new()))
//!     .crypto(crypto)
//!     .pairing(pairing)
//!     .transport(transport)
//!     .connectivity(probe)
//!     .build()?;
//!
//! let sensors = Interface::new(
//!     "org.acme.Sensors", 1, 0, Ownership::Device, InterfaceType::Datastream,
//! )
//! .with_mapping(Mapping::new("/%{sensor}/value", MappingType::Double));
//!
//! device.add_interface(sensors).await?;
//! device.start().await?;
//! device.send_individual("org.acme.Sensors", "/temp/value", 21.5, None).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod credentials;
mod device;
mod error;
mod events;
mod individual;
mod interface;
mod introspection;
mod mapping;
mod pairing;
mod transport;
mod validation;

pub use credentials::{
    CredentialKind, CredentialManager, CredentialStore, CryptoError, CryptoProvider,
    MemoryCredentialStore, StoreError,
};
pub use device::{
    ConnectionState, Device, DeviceBuilder, REINIT_RETRY_INTERVAL, SESSION_GUARD_WAIT,
};
pub use error::{DeviceError, Result};
pub use events::{EventHandler, NoopHandler};
pub use individual::{Individual, ObjectEntry};
pub use interface::{Aggregation, Interface, InterfaceType, Ownership};
pub use introspection::{device_topic, empty_cache_topic, publish_topic, Introspection};
pub use mapping::{Mapping, MappingType, Reliability};
pub use pairing::{ConnectivityProbe, PairingClient, PairingConfig, PairingError};
pub use transport::{Qos, SessionSetup, Transport, TransportError, TransportEvent};
