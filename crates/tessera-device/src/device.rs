//! Device lifecycle, publish pipeline, inbound dispatch, and the
//! reinitialization state machine.
//!
//! # Concurrency
//!
//! Three contexts touch a device: public API callers, the supervisory task,
//! and whatever context delivers transport events. Session state (credential
//! material, transport configuration, the interface set) is mutated only
//! under the session guard. Public API calls acquire the guard with a short
//! bounded wait and fail fast with [`DeviceError::NotReady`] while a
//! reinitialization holds it; the supervisor acquires it with an unbounded
//! wait. The connected flag and the connection state are atomics readable
//! from any context without the guard.
//!
//! # Reinitialization
//!
//! When the broker rejects the client certificate while the network is
//! reachable, the supervisor discards the certificate and loops through the
//! credential flow with a fixed retry interval until the transport is
//! reconfigured, abandoning silently if the device reconnects on its own in
//! the meantime.

use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, AtomicU8, Ordering},
        Arc, Mutex as StdMutex, RwLock,
    },
    time::Duration,
};

use bytes::Bytes;
use tessera_bson::{BsonSerializer, Document};
use tokio::{
    sync::{mpsc, Mutex, MutexGuard},
    task::JoinHandle,
    time,
};

use crate::{
    credentials::{CredentialManager, CredentialStore, CryptoProvider},
    error::{DeviceError, Result},
    events::EventHandler,
    individual::{Individual, ObjectEntry},
    interface::Interface,
    introspection::{empty_cache_topic, publish_topic, Introspection},
    pairing::{ConnectivityProbe, PairingClient, PairingConfig, PairingError},
    transport::{Qos, SessionSetup, Transport, TransportEvent},
    validation,
};

/// Bounded wait for the session guard on public API calls.
pub const SESSION_GUARD_WAIT: Duration = Duration::from_millis(100);

/// Fixed delay between reinitialization attempts.
pub const REINIT_RETRY_INTERVAL: Duration = Duration::from_secs(30);

/// Payload of the session cache reset marker
const EMPTY_CACHE_PAYLOAD: &[u8] = b"1";

/// Coarse connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    /// Never started
    Uninitialized = 0,
    /// Started, waiting for the transport to establish a session
    Connecting = 1,
    /// Session established
    Connected = 2,
    /// Session lost or stopped
    Disconnected = 3,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Connecting,
            2 => Self::Connected,
            3 => Self::Disconnected,
            _ => Self::Uninitialized,
        }
    }
}

enum Signal {
    Terminate,
    Reinit,
}

/// Builder for [`Device`]. See [`Device::builder`].
pub struct DeviceBuilder {
    config: PairingConfig,
    store: Option<Arc<dyn CredentialStore>>,
    crypto: Option<Arc<dyn CryptoProvider>>,
    pairing: Option<Arc<dyn PairingClient>>,
    transport: Option<Arc<dyn Transport>>,
    probe: Option<Arc<dyn ConnectivityProbe>>,
    handler: Arc<dyn EventHandler>,
}

impl fmt::Debug for DeviceBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceBuilder").field("config", &self.config).finish_non_exhaustive()
    }
}

impl DeviceBuilder {
    /// Set the credential store.
    #[must_use]
    pub fn credential_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the crypto provider.
    #[must_use]
    pub fn crypto(mut self, crypto: Arc<dyn CryptoProvider>) -> Self {
        self.crypto = Some(crypto);
        self
    }

    /// Set the pairing client.
    #[must_use]
    pub fn pairing(mut self, pairing: Arc<dyn PairingClient>) -> Self {
        self.pairing = Some(pairing);
        self
    }

    /// Set the transport.
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Set the connectivity probe.
    #[must_use]
    pub fn connectivity(mut self, probe: Arc<dyn ConnectivityProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Set the event handler. Defaults to a no-op handler.
    #[must_use]
    pub fn handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.handler = handler;
        self
    }

    /// Build the device and spawn its supervisory task.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// [`DeviceError::MissingCollaborator`] when a required collaborator was
    /// not supplied.
    pub fn build(self) -> Result<Device> {
        let store = self.store.ok_or(DeviceError::MissingCollaborator("credential store"))?;
        let crypto = self.crypto.ok_or(DeviceError::MissingCollaborator("crypto provider"))?;
        let pairing = self.pairing.ok_or(DeviceError::MissingCollaborator("pairing client"))?;
        let transport = self.transport.ok_or(DeviceError::MissingCollaborator("transport"))?;
        let probe = self.probe.ok_or(DeviceError::MissingCollaborator("connectivity probe"))?;

        let (signal_tx, signal_rx) = mpsc::unbounded_channel();

        let inner = Arc::new(DeviceInner {
            config: self.config,
            credentials: CredentialManager::new(store, crypto),
            pairing,
            transport,
            probe,
            handler: self.handler,
            gate: Mutex::new(()),
            interfaces: RwLock::new(Introspection::new()),
            device_topic: RwLock::new(None),
            secret: Mutex::new(None),
            state: AtomicU8::new(ConnectionState::Uninitialized as u8),
            connected: AtomicBool::new(false),
            signal_tx,
            supervisor: StdMutex::new(None),
        });

        let supervisor = tokio::spawn(supervisor_loop(inner.clone(), signal_rx));
        *inner.supervisor.lock().expect("supervisor handle mutex poisoned") = Some(supervisor);

        Ok(Device { inner })
    }
}

/// A device connection to the platform.
///
/// Cheap to clone; all clones share one connection. Locks are held only for
/// short critical sections, so the `expect` calls on the internal std locks
/// fire only after a panic already unwound through one of them.
#[derive(Clone)]
pub struct Device {
    inner: Arc<DeviceInner>,
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("device_id", &self.inner.config.device_id)
            .field("state", &self.connection_state())
            .finish_non_exhaustive()
    }
}

struct DeviceInner {
    config: PairingConfig,
    credentials: CredentialManager,
    pairing: Arc<dyn PairingClient>,
    transport: Arc<dyn Transport>,
    probe: Arc<dyn ConnectivityProbe>,
    handler: Arc<dyn EventHandler>,

    /// Session guard: held for the whole of a reinitialization, briefly by
    /// public API calls.
    gate: Mutex<()>,
    interfaces: RwLock<Introspection>,
    device_topic: RwLock<Option<String>>,
    /// Credentials secret cache for registration-based provisioning.
    secret: Mutex<Option<String>>,
    state: AtomicU8,
    connected: AtomicBool,
    signal_tx: mpsc::UnboundedSender<Signal>,
    supervisor: StdMutex<Option<JoinHandle<()>>>,
}

impl Device {
    /// Start building a device for the given identity.
    #[must_use]
    pub fn builder(config: PairingConfig) -> DeviceBuilder {
        DeviceBuilder {
            config,
            store: None,
            crypto: None,
            pairing: None,
            transport: None,
            probe: None,
            handler: Arc::new(crate::events::NoopHandler),
        }
    }

    /// Register an interface.
    ///
    /// Allowed at any time; when the device is connected the updated
    /// interface list is announced to the platform immediately.
    ///
    /// # Errors
    ///
    /// Validation and duplicate errors from the interface set,
    /// [`DeviceError::NotReady`] while reinitializing, and publish failures
    /// for the re-announcement.
    pub async fn add_interface(&self, interface: Interface) -> Result<()> {
        let inner = &self.inner;
        let _gate = inner.acquire_gate().await?;

        inner.interfaces.write().expect("interface set lock poisoned").add(interface)?;

        if inner.connected.load(Ordering::SeqCst) {
            if let Some(topic) = inner.device_topic() {
                let announcement = inner
                    .interfaces
                    .read()
                    .expect("interface set lock poisoned")
                    .introspection_string();
                inner
                    .transport
                    .publish(&topic, Bytes::from(announcement), Qos::ExactlyOnce)
                    .await
                    .map_err(|err| DeviceError::PublishFailed {
                        topic,
                        reason: err.to_string(),
                    })?;
            }
        }
        Ok(())
    }

    /// Provision credentials, configure the transport, and start connecting.
    ///
    /// Connection progress is reported through the event handler once the
    /// transport delivers its events.
    ///
    /// # Errors
    ///
    /// [`DeviceError::AlreadyStarted`] when running, [`DeviceError::NotReady`]
    /// while reinitializing, and any credential, pairing, or transport error.
    /// Failures here are not retried; retrying is the caller's decision.
    pub async fn start(&self) -> Result<()> {
        let inner = &self.inner;
        let _gate = inner.acquire_gate().await?;

        match self.connection_state() {
            ConnectionState::Connecting | ConnectionState::Connected => {
                return Err(DeviceError::AlreadyStarted);
            },
            ConnectionState::Uninitialized | ConnectionState::Disconnected => {},
        }

        inner.init_connection().await?;
        inner.transport.start().await?;
        inner.set_state(ConnectionState::Connecting);
        tracing::info!(device_id = %inner.config.device_id, "device started");
        Ok(())
    }

    /// Disconnect from the broker and stop reconnecting.
    ///
    /// The transport emits no event for a locally requested stop, so the
    /// disconnect callback is delivered directly.
    ///
    /// # Errors
    ///
    /// [`DeviceError::NotStarted`] when the device never started,
    /// [`DeviceError::NotReady`] while reinitializing, and transport errors.
    pub async fn stop(&self) -> Result<()> {
        let inner = &self.inner;
        let _gate = inner.acquire_gate().await?;

        if self.connection_state() == ConnectionState::Uninitialized {
            return Err(DeviceError::NotStarted);
        }

        inner.transport.stop().await?;
        inner.connected.store(false, Ordering::SeqCst);
        inner.set_state(ConnectionState::Disconnected);
        inner.handler.on_disconnected();
        tracing::info!(device_id = %inner.config.device_id, "device stopped");
        Ok(())
    }

    /// Publish one value on an individual datastream endpoint.
    ///
    /// The timestamp is milliseconds since the Unix epoch and is mandatory or
    /// forbidden according to the mapping. Delivery QoS follows the mapping's
    /// reliability.
    ///
    /// # Errors
    ///
    /// Validation errors before any side effect; [`DeviceError::NotReady`]
    /// while reinitializing; [`DeviceError::PublishFailed`] from the
    /// transport.
    pub async fn send_individual(
        &self,
        interface: &str,
        path: &str,
        value: impl Into<Individual>,
        timestamp: Option<i64>,
    ) -> Result<()> {
        let inner = &self.inner;
        let value = value.into();

        let (topic, payload, qos) = {
            let interfaces = inner.interfaces.read().expect("interface set lock poisoned");
            let iface = interfaces
                .get(interface)
                .ok_or_else(|| DeviceError::InterfaceNotFound(interface.to_string()))?;
            let mapping = validation::individual_datastream(iface, path, &value, timestamp)?;
            let topic = publish_topic(&inner.require_device_topic()?, interface, path);
            (topic, encode_individual(&value, timestamp), Qos::from(mapping.reliability))
        };

        inner.publish(topic, payload, qos).await
    }

    /// Publish all values of one aggregated object.
    ///
    /// Entry paths are leaves relative to `path`; each is validated against
    /// its own mapping. QoS follows the interface's first declared mapping.
    ///
    /// # Errors
    ///
    /// Validation errors before any side effect; [`DeviceError::NotReady`]
    /// while reinitializing; [`DeviceError::PublishFailed`] from the
    /// transport.
    pub async fn send_object(
        &self,
        interface: &str,
        path: &str,
        entries: &[ObjectEntry],
        timestamp: Option<i64>,
    ) -> Result<()> {
        let inner = &self.inner;

        let (topic, payload, qos) = {
            let interfaces = inner.interfaces.read().expect("interface set lock poisoned");
            let iface = interfaces
                .get(interface)
                .ok_or_else(|| DeviceError::InterfaceNotFound(interface.to_string()))?;
            validation::object_datastream(iface, path, entries, timestamp)?;
            let qos = Qos::from(iface.reliability_for_path(path)?);
            let topic = publish_topic(&inner.require_device_topic()?, interface, path);
            (topic, encode_object(entries, timestamp), qos)
        };

        inner.publish(topic, payload, qos).await
    }

    /// Set a device-owned property.
    ///
    /// Properties are retained state; they publish at exactly-once QoS and
    /// never carry timestamps.
    ///
    /// # Errors
    ///
    /// Validation errors before any side effect; [`DeviceError::NotReady`]
    /// while reinitializing; [`DeviceError::PublishFailed`] from the
    /// transport.
    pub async fn set_property(
        &self,
        interface: &str,
        path: &str,
        value: impl Into<Individual>,
    ) -> Result<()> {
        let inner = &self.inner;
        let value = value.into();

        let (topic, payload) = {
            let interfaces = inner.interfaces.read().expect("interface set lock poisoned");
            let iface = interfaces
                .get(interface)
                .ok_or_else(|| DeviceError::InterfaceNotFound(interface.to_string()))?;
            validation::set_property(iface, path, &value)?;
            let topic = publish_topic(&inner.require_device_topic()?, interface, path);
            (topic, encode_individual(&value, None))
        };

        inner.publish(topic, payload, Qos::ExactlyOnce).await
    }

    /// Unset a device-owned property.
    ///
    /// Publishes a zero-length payload at exactly-once QoS. Only valid on
    /// mappings that allow unset.
    ///
    /// # Errors
    ///
    /// Validation errors before any side effect; [`DeviceError::NotReady`]
    /// while reinitializing; [`DeviceError::PublishFailed`] from the
    /// transport.
    pub async fn unset_property(&self, interface: &str, path: &str) -> Result<()> {
        let inner = &self.inner;

        let topic = {
            let interfaces = inner.interfaces.read().expect("interface set lock poisoned");
            let iface = interfaces
                .get(interface)
                .ok_or_else(|| DeviceError::InterfaceNotFound(interface.to_string()))?;
            validation::unset_property(iface, path)?;
            publish_topic(&inner.require_device_topic()?, interface, path)
        };

        inner.publish(topic, Bytes::new(), Qos::ExactlyOnce).await
    }

    /// Feed one transport event into the device.
    ///
    /// The transport implementation calls this for every event it produces.
    /// Events must be delivered one at a time per device.
    pub async fn handle_event(&self, event: TransportEvent) {
        self.inner.handle_event(event).await;
    }

    /// True while a session to the broker is established.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.inner.state.load(Ordering::SeqCst))
    }

    /// The device's root topic, known once started.
    #[must_use]
    pub fn device_topic(&self) -> Option<String> {
        self.inner.device_topic()
    }

    /// Terminate the supervisory task and wait for it to finish.
    ///
    /// The device is unusable for reinitialization afterwards; call once
    /// when tearing down.
    pub async fn shutdown(&self) {
        let _ = self.inner.signal_tx.send(Signal::Terminate);
        let handle =
            self.inner.supervisor.lock().expect("supervisor handle mutex poisoned").take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

impl DeviceInner {
    async fn acquire_gate(&self) -> Result<MutexGuard<'_, ()>> {
        time::timeout(SESSION_GUARD_WAIT, self.gate.lock())
            .await
            .map_err(|_| DeviceError::NotReady)
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    fn device_topic(&self) -> Option<String> {
        self.device_topic.read().expect("device topic lock poisoned").clone()
    }

    fn require_device_topic(&self) -> Result<String> {
        self.device_topic().ok_or(DeviceError::NotStarted)
    }

    async fn publish(&self, topic: String, payload: Bytes, qos: Qos) -> Result<()> {
        let _gate = self.acquire_gate().await?;
        self.transport
            .publish(&topic, payload, qos)
            .await
            .map_err(|err| DeviceError::PublishFailed { topic, reason: err.to_string() })
    }

    /// Resolve the credentials secret: configured, cached, or obtained by
    /// registering the device once.
    async fn credentials_secret(&self) -> Result<String> {
        if let Some(secret) = &self.config.credentials_secret {
            return Ok(secret.clone());
        }

        let mut cached = self.secret.lock().await;
        if let Some(secret) = cached.as_ref() {
            return Ok(secret.clone());
        }
        if self.config.jwt.is_none() {
            return Err(PairingError::MissingSecret.into());
        }

        tracing::info!(device_id = %self.config.device_id, "registering device");
        let secret = self.pairing.register_device(&self.config).await?;
        *cached = Some(secret.clone());
        Ok(secret)
    }

    /// Run the credential flow and hand the transport a fresh session setup.
    ///
    /// Caller must hold the session guard.
    async fn init_connection(&self) -> Result<()> {
        let secret = self.credentials_secret().await?;
        let certificate = self
            .credentials
            .ensure_certificate(self.pairing.as_ref(), &self.config, &secret)
            .await?;
        let private_key = self.credentials.private_key().await?;
        let broker_url = self.pairing.broker_url(&self.config, &secret).await?;

        // The certificate common name is the authoritative root topic.
        let topic = self.credentials.common_name(&certificate)?;
        *self.device_topic.write().expect("device topic lock poisoned") = Some(topic);

        self.transport
            .configure(SessionSetup {
                broker_url,
                client_certificate: certificate,
                private_key,
            })
            .await?;
        Ok(())
    }

    async fn handle_event(&self, event: TransportEvent) {
        match event {
            TransportEvent::Connected { session_present } => {
                self.connected.store(true, Ordering::SeqCst);
                self.set_state(ConnectionState::Connected);
                tracing::info!(session_present, "session established");
                self.handler.on_connected(session_present);
                if !session_present {
                    self.setup_session().await;
                }
            },
            TransportEvent::Disconnected => {
                self.connected.store(false, Ordering::SeqCst);
                self.set_state(ConnectionState::Disconnected);
                tracing::info!("session lost");
                self.handler.on_disconnected();
            },
            TransportEvent::Incoming { topic, payload } => {
                self.dispatch(&topic, &payload);
            },
            TransportEvent::CertificateError => {
                if self.probe.has_connectivity().await {
                    tracing::warn!("certificate rejected with network reachable, scheduling reinitialization");
                    let _ = self.signal_tx.send(Signal::Reinit);
                } else {
                    tracing::debug!("certificate error without connectivity, ignoring");
                }
            },
        }
    }

    /// Fresh-session setup: subscriptions, interface announcement, cache
    /// reset marker. Failures are logged; the session stays up either way.
    async fn setup_session(&self) {
        let Some(topic) = self.device_topic() else {
            tracing::warn!("connected without a device topic, skipping session setup");
            return;
        };

        let (subscriptions, announcement) = {
            let interfaces = self.interfaces.read().expect("interface set lock poisoned");
            (interfaces.subscription_topics(&topic), interfaces.introspection_string())
        };

        for subscription in &subscriptions {
            if let Err(err) = self.transport.subscribe(subscription, Qos::ExactlyOnce).await {
                tracing::error!(topic = %subscription, %err, "subscription failed");
            }
        }

        if let Err(err) =
            self.transport.publish(&topic, Bytes::from(announcement), Qos::ExactlyOnce).await
        {
            tracing::error!(%err, "interface announcement failed");
        }

        let cache_topic = empty_cache_topic(&topic);
        if let Err(err) = self
            .transport
            .publish(&cache_topic, Bytes::from_static(EMPTY_CACHE_PAYLOAD), Qos::ExactlyOnce)
            .await
        {
            tracing::error!(%err, "cache reset marker failed");
        }
    }

    /// Route one inbound message. Every malformed message is dropped with a
    /// log line; nothing here propagates.
    fn dispatch(&self, topic: &str, payload: &Bytes) {
        let Some(device_topic) = self.device_topic() else {
            tracing::debug!(topic, "message before session setup, dropping");
            return;
        };
        let Some(rest) = topic.strip_prefix(device_topic.as_str()) else {
            tracing::warn!(topic, "message outside device topic, dropping");
            return;
        };
        let Some(rest) = rest.strip_prefix('/') else {
            tracing::warn!(topic, "message on bare device topic, dropping");
            return;
        };
        if rest == "control" || rest.starts_with("control/") {
            tracing::debug!(topic, "control message");
            return;
        }
        let Some((interface, leaf)) = rest.split_once('/') else {
            tracing::warn!(topic, "message without a path, dropping");
            return;
        };
        let path = format!("/{leaf}");

        if payload.is_empty() {
            self.handler.on_unset(interface, &path);
            return;
        }

        // Copy the expected type out so no lock is held across the callback.
        let mapping_type = {
            let interfaces = self.interfaces.read().expect("interface set lock poisoned");
            let Some(iface) = interfaces.get(interface) else {
                tracing::warn!(interface, "message for unknown interface, dropping");
                return;
            };
            match iface.mapping_for_path(&path) {
                Ok(mapping) => mapping.mapping_type,
                Err(err) => {
                    tracing::warn!(interface, %path, %err, "message for unknown path, dropping");
                    return;
                },
            }
        };

        let document = match Document::parse(payload) {
            Ok(document) => document,
            Err(err) => {
                tracing::warn!(topic, %err, "malformed payload, dropping");
                return;
            },
        };
        let element = match document.lookup("v") {
            Ok(element) => element,
            Err(err) => {
                tracing::warn!(topic, %err, "payload without value element, dropping");
                return;
            },
        };
        let value = match Individual::deserialize(&element, mapping_type) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(topic, %err, "payload type mismatch, dropping");
                return;
            },
        };

        self.handler.on_data(interface, &path, value);
    }

    /// Discard the certificate and loop the credential flow until the
    /// transport is back up. Holds the session guard throughout.
    async fn reinitialize(&self) {
        let _gate = self.gate.lock().await;
        tracing::warn!("reinitializing connection after certificate rejection");

        self.connected.store(false, Ordering::SeqCst);
        self.set_state(ConnectionState::Connecting);
        if let Err(err) = self.credentials.invalidate_certificate().await {
            tracing::error!(%err, "failed to discard certificate");
        }

        loop {
            match self.init_connection().await {
                Ok(()) => {
                    if self.connected.load(Ordering::SeqCst) {
                        tracing::info!("device reconnected on its own, leaving transport untouched");
                        return;
                    }
                    match self.transport.start().await {
                        Ok(()) => {
                            tracing::info!("reinitialization complete");
                            return;
                        },
                        Err(err) => {
                            tracing::warn!(%err, "transport restart failed, retrying");
                        },
                    }
                },
                Err(err) => {
                    tracing::warn!(%err, "reinitialization attempt failed, retrying");
                },
            }

            time::sleep(REINIT_RETRY_INTERVAL).await;
            if self.connected.load(Ordering::SeqCst) {
                tracing::info!("device reconnected during retry wait, abandoning reinitialization");
                return;
            }
        }
    }
}

async fn supervisor_loop(inner: Arc<DeviceInner>, mut signals: mpsc::UnboundedReceiver<Signal>) {
    while let Some(signal) = signals.recv().await {
        match signal {
            Signal::Terminate => {
                tracing::debug!("supervisor terminating");
                break;
            },
            Signal::Reinit => inner.reinitialize().await,
        }
    }
}

fn encode_individual(value: &Individual, timestamp: Option<i64>) -> Bytes {
    let mut serializer = BsonSerializer::new();
    value.append_to(&mut serializer, "v");
    if let Some(t) = timestamp {
        serializer.append_datetime("t", t);
    }
    serializer.finish()
}

fn encode_object(entries: &[ObjectEntry], timestamp: Option<i64>) -> Bytes {
    let mut inner = BsonSerializer::new();
    for entry in entries {
        entry.individual.append_to(&mut inner, &entry.path);
    }
    let nested = inner.finish();

    let mut serializer = BsonSerializer::new();
    serializer.append_document("v", &nested);
    if let Some(t) = timestamp {
        serializer.append_datetime("t", t);
    }
    serializer.finish()
}
