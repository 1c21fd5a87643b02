//! Shared test doubles: recording transport, scriptable pairing service,
//! deterministic crypto, and an event-recording handler.

#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use bytes::Bytes;
use tessera_device::{
    ConnectivityProbe, CryptoError, CryptoProvider, Device, EventHandler, Individual, Interface,
    InterfaceType, Mapping, MappingType, MemoryCredentialStore, Ownership, PairingClient,
    PairingConfig, PairingError, Qos, Reliability, SessionSetup, Transport, TransportError,
};

pub const REALM: &str = "acme";
pub const DEVICE_ID: &str = "dev123";
pub const DEVICE_TOPIC: &str = "acme/dev123";

#[derive(Default)]
struct TransportState {
    sessions: Vec<SessionSetup>,
    starts: usize,
    stops: usize,
    publishes: Vec<(String, Bytes, Qos)>,
    subscribes: Vec<(String, Qos)>,
}

/// Transport double that records every call.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<TransportState>>,
    fail_publish: Arc<AtomicBool>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_publishes(&self, fail: bool) {
        self.fail_publish.store(fail, Ordering::SeqCst);
    }

    pub fn sessions(&self) -> Vec<SessionSetup> {
        self.state.lock().expect("transport state poisoned").sessions.clone()
    }

    pub fn start_count(&self) -> usize {
        self.state.lock().expect("transport state poisoned").starts
    }

    pub fn stop_count(&self) -> usize {
        self.state.lock().expect("transport state poisoned").stops
    }

    pub fn publishes(&self) -> Vec<(String, Bytes, Qos)> {
        self.state.lock().expect("transport state poisoned").publishes.clone()
    }

    pub fn subscribes(&self) -> Vec<(String, Qos)> {
        self.state.lock().expect("transport state poisoned").subscribes.clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn configure(&self, session: SessionSetup) -> Result<(), TransportError> {
        self.state.lock().expect("transport state poisoned").sessions.push(session);
        Ok(())
    }

    async fn start(&self) -> Result<(), TransportError> {
        self.state.lock().expect("transport state poisoned").starts += 1;
        Ok(())
    }

    async fn stop(&self) -> Result<(), TransportError> {
        self.state.lock().expect("transport state poisoned").stops += 1;
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: Bytes, qos: Qos) -> Result<(), TransportError> {
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(TransportError::Failed("publish rejected".to_string()));
        }
        self.state
            .lock()
            .expect("transport state poisoned")
            .publishes
            .push((topic.to_string(), payload, qos));
        Ok(())
    }

    async fn subscribe(&self, topic: &str, qos: Qos) -> Result<(), TransportError> {
        self.state
            .lock()
            .expect("transport state poisoned")
            .subscribes
            .push((topic.to_string(), qos));
        Ok(())
    }
}

/// How the pairing double answers certificate requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairingMode {
    /// Sign every CSR
    Ok,
    /// Answer 503 to every CSR
    Fail,
    /// Never answer
    Pending,
}

/// Pairing service double with a switchable failure mode.
#[derive(Clone)]
pub struct MockPairing {
    mode: Arc<Mutex<PairingMode>>,
    sign_calls: Arc<AtomicUsize>,
    register_calls: Arc<AtomicUsize>,
}

impl MockPairing {
    pub fn new() -> Self {
        Self {
            mode: Arc::new(Mutex::new(PairingMode::Ok)),
            sign_calls: Arc::new(AtomicUsize::new(0)),
            register_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn set_mode(&self, mode: PairingMode) {
        *self.mode.lock().expect("pairing mode poisoned") = mode;
    }

    pub fn sign_calls(&self) -> usize {
        self.sign_calls.load(Ordering::SeqCst)
    }

    pub fn register_calls(&self) -> usize {
        self.register_calls.load(Ordering::SeqCst)
    }

    fn mode(&self) -> PairingMode {
        *self.mode.lock().expect("pairing mode poisoned")
    }
}

impl Default for MockPairing {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PairingClient for MockPairing {
    async fn register_device(&self, _config: &PairingConfig) -> Result<String, PairingError> {
        self.register_calls.fetch_add(1, Ordering::SeqCst);
        Ok("registered-secret".to_string())
    }

    async fn broker_url(
        &self,
        _config: &PairingConfig,
        _secret: &str,
    ) -> Result<String, PairingError> {
        Ok("mqtts://broker.test:8883".to_string())
    }

    async fn sign_csr(
        &self,
        config: &PairingConfig,
        _secret: &str,
        _csr_pem: &str,
    ) -> Result<String, PairingError> {
        self.sign_calls.fetch_add(1, Ordering::SeqCst);
        match self.mode() {
            PairingMode::Ok => Ok(format!("cn={}/{}", config.realm, config.device_id)),
            PairingMode::Fail => {
                Err(PairingError::Api { status: 503, message: "unavailable".to_string() })
            },
            PairingMode::Pending => std::future::pending().await,
        }
    }
}

/// Deterministic crypto double. Certificates are `cn=<common name>` strings.
#[derive(Clone, Default)]
pub struct MockCrypto {
    keys_created: Arc<AtomicUsize>,
}

impl MockCrypto {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keys_created(&self) -> usize {
        self.keys_created.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CryptoProvider for MockCrypto {
    async fn create_key(&self) -> Result<String, CryptoError> {
        let n = self.keys_created.fetch_add(1, Ordering::SeqCst);
        Ok(format!("KEY-{n}"))
    }

    async fn create_csr(&self, key_pem: &str) -> Result<String, CryptoError> {
        Ok(format!("CSR({key_pem})"))
    }

    fn certificate_common_name(&self, cert_pem: &str) -> Result<String, CryptoError> {
        cert_pem
            .strip_prefix("cn=")
            .map(str::to_string)
            .ok_or_else(|| CryptoError::CertificateParse("no common name".to_string()))
    }
}

/// Connectivity probe with a switchable answer.
#[derive(Clone)]
pub struct MockProbe {
    online: Arc<AtomicBool>,
}

impl MockProbe {
    pub fn new(online: bool) -> Self {
        Self { online: Arc::new(AtomicBool::new(online)) }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

#[async_trait]
impl ConnectivityProbe for MockProbe {
    async fn has_connectivity(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}

/// One recorded handler invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerEvent {
    Connected(bool),
    Disconnected,
    Data { interface: String, path: String, value: Individual },
    Unset { interface: String, path: String },
}

/// Event handler that records every callback.
#[derive(Default)]
pub struct RecordingHandler {
    events: Mutex<Vec<HandlerEvent>>,
}

impl RecordingHandler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<HandlerEvent> {
        self.events.lock().expect("handler events poisoned").clone()
    }
}

impl EventHandler for RecordingHandler {
    fn on_connected(&self, session_present: bool) {
        self.events
            .lock()
            .expect("handler events poisoned")
            .push(HandlerEvent::Connected(session_present));
    }

    fn on_disconnected(&self) {
        self.events.lock().expect("handler events poisoned").push(HandlerEvent::Disconnected);
    }

    fn on_data(&self, interface: &str, path: &str, value: Individual) {
        self.events.lock().expect("handler events poisoned").push(HandlerEvent::Data {
            interface: interface.to_string(),
            path: path.to_string(),
            value,
        });
    }

    fn on_unset(&self, interface: &str, path: &str) {
        self.events.lock().expect("handler events poisoned").push(HandlerEvent::Unset {
            interface: interface.to_string(),
            path: path.to_string(),
        });
    }
}

/// A device wired to fresh test doubles.
pub struct Fixture {
    pub device: Device,
    pub transport: MockTransport,
    pub pairing: MockPairing,
    pub crypto: MockCrypto,
    pub store: MemoryCredentialStore,
    pub probe: MockProbe,
    pub handler: Arc<RecordingHandler>,
}

pub fn default_config() -> PairingConfig {
    PairingConfig::new("https://pairing.test", REALM, DEVICE_ID)
        .with_credentials_secret("secret")
}

pub fn fixture() -> Fixture {
    fixture_with(default_config())
}

pub fn fixture_with(config: PairingConfig) -> Fixture {
    let transport = MockTransport::new();
    let pairing = MockPairing::new();
    let crypto = MockCrypto::new();
    let store = MemoryCredentialStore::new();
    let probe = MockProbe::new(true);
    let handler = RecordingHandler::new();

    let device = Device::builder(config)
        .credential_store(Arc::new(store.clone()))
        .crypto(Arc::new(crypto.clone()))
        .pairing(Arc::new(pairing.clone()))
        .transport(Arc::new(transport.clone()))
        .connectivity(Arc::new(probe.clone()))
        .handler(handler.clone())
        .build()
        .expect("device builds");

    Fixture { device, transport, pairing, crypto, store, probe, handler }
}

pub fn sensors_interface() -> Interface {
    Interface::new("org.acme.Sensors", 1, 0, Ownership::Device, InterfaceType::Datastream)
        .with_mapping(
            Mapping::new("/%{sensor}/value", MappingType::Double)
                .with_reliability(Reliability::Guaranteed),
        )
        .with_mapping(Mapping::new("/%{sensor}/status", MappingType::String))
}

pub fn stamped_interface() -> Interface {
    Interface::new("org.acme.Stamped", 1, 0, Ownership::Device, InterfaceType::Datastream)
        .with_mapping(Mapping::new("/sample", MappingType::Double).with_explicit_timestamp())
}

pub fn object_interface() -> Interface {
    Interface::new("org.acme.Position", 1, 0, Ownership::Device, InterfaceType::Datastream)
        .with_aggregation(tessera_device::Aggregation::Object)
        .with_mapping(
            Mapping::new("/pose/x", MappingType::Double).with_reliability(Reliability::Unique),
        )
        .with_mapping(Mapping::new("/pose/y", MappingType::Double))
}

pub fn properties_interface() -> Interface {
    Interface::new("org.acme.Settings", 1, 0, Ownership::Device, InterfaceType::Properties)
        .with_mapping(Mapping::new("/interval", MappingType::Int32).with_allow_unset())
        .with_mapping(Mapping::new("/label", MappingType::String))
}

pub fn server_interface() -> Interface {
    Interface::new("org.acme.Commands", 1, 0, Ownership::Server, InterfaceType::Datastream)
        .with_mapping(Mapping::new("/led", MappingType::Boolean))
        .with_mapping(Mapping::new("/levels", MappingType::Int32Array))
}
