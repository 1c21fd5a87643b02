//! Registered interface set, topic construction, and the introspection
//! string announced to the platform on every fresh session.

use crate::{
    error::{DeviceError, Result},
    interface::{Interface, Ownership},
};

/// Topic suffix the platform uses to push retained property state
const CONSUMER_PROPERTIES_SUFFIX: &str = "control/consumer/properties";

/// Topic suffix for the session cache reset marker
const EMPTY_CACHE_SUFFIX: &str = "control/emptyCache";

/// Ordered set of registered interfaces, unique by name.
#[derive(Debug, Default, Clone)]
pub struct Introspection {
    interfaces: Vec<Interface>,
}

impl Introspection {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an interface.
    ///
    /// # Errors
    ///
    /// Returns the interface's own validation error, or
    /// [`DeviceError::DuplicateInterface`] when the name is taken.
    pub fn add(&mut self, interface: Interface) -> Result<()> {
        interface.validate()?;
        if self.get(interface.name()).is_some() {
            return Err(DeviceError::DuplicateInterface(interface.name().to_string()));
        }
        self.interfaces.push(interface);
        Ok(())
    }

    /// Look up an interface by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Interface> {
        self.interfaces.iter().find(|i| i.name() == name)
    }

    /// Registered interfaces in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Interface> {
        self.interfaces.iter()
    }

    /// Number of registered interfaces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.interfaces.len()
    }

    /// True when no interface is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.interfaces.is_empty()
    }

    /// The `name:major:minor` list announced to the platform, `;`-separated
    /// with no trailing separator.
    #[must_use]
    pub fn introspection_string(&self) -> String {
        self.interfaces
            .iter()
            .map(|i| format!("{}:{}:{}", i.name(), i.version_major(), i.version_minor()))
            .collect::<Vec<_>>()
            .join(";")
    }

    /// Topics the device must subscribe to for a session.
    ///
    /// Always contains the consumer properties topic; server-owned
    /// interfaces additionally get a wildcard subscription.
    #[must_use]
    pub fn subscription_topics(&self, device_topic: &str) -> Vec<String> {
        let mut topics = vec![format!("{device_topic}/{CONSUMER_PROPERTIES_SUFFIX}")];
        for interface in &self.interfaces {
            if interface.ownership() == Ownership::Server {
                topics.push(format!("{device_topic}/{}/#", interface.name()));
            }
        }
        topics
    }
}

/// Root topic for one device: `<realm>/<device_id>`.
#[must_use]
pub fn device_topic(realm: &str, device_id: &str) -> String {
    format!("{realm}/{device_id}")
}

/// Publish topic for one endpoint: `<device_topic>/<interface><path>`.
#[must_use]
pub fn publish_topic(device_topic: &str, interface: &str, path: &str) -> String {
    format!("{device_topic}/{interface}{path}")
}

/// Session cache reset topic.
#[must_use]
pub fn empty_cache_topic(device_topic: &str) -> String {
    format!("{device_topic}/{EMPTY_CACHE_SUFFIX}")
}
