//! Pairing service abstraction.
//!
//! The pairing service registers devices, hands out broker URLs, and signs
//! certificate requests. The HTTP client behind those calls is the
//! application's concern; this crate only defines the seam.

use async_trait::async_trait;
use thiserror::Error;

/// Identity and endpoint configuration for one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairingConfig {
    /// Base URL of the pairing service
    pub base_url: String,
    /// Tenant realm the device belongs to
    pub realm: String,
    /// Unique device identifier within the realm
    pub device_id: String,
    /// Per-device credentials secret, when already known
    pub credentials_secret: Option<String>,
    /// Registration token for first-time device registration
    pub jwt: Option<String>,
}

impl PairingConfig {
    /// Create a config with no secret and no registration token.
    pub fn new(
        base_url: impl Into<String>,
        realm: impl Into<String>,
        device_id: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            realm: realm.into(),
            device_id: device_id.into(),
            credentials_secret: None,
            jwt: None,
        }
    }

    /// Set the credentials secret.
    #[must_use]
    pub fn with_credentials_secret(mut self, secret: impl Into<String>) -> Self {
        self.credentials_secret = Some(secret.into());
        self
    }

    /// Set the registration token.
    #[must_use]
    pub fn with_jwt(mut self, jwt: impl Into<String>) -> Self {
        self.jwt = Some(jwt.into());
        self
    }
}

/// Errors from pairing service calls.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PairingError {
    /// Service answered with a non-success status
    #[error("pairing API error {status}: {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Service-provided message
        message: String,
    },

    /// Request never reached the service
    #[error("pairing network error: {0}")]
    Network(String),

    /// Credentials secret or registration token rejected
    #[error("pairing authorization rejected")]
    Unauthorized,

    /// No credentials secret available and no way to register for one
    #[error("no credentials secret and no registration token configured")]
    MissingSecret,
}

/// Client for the pairing service API.
#[async_trait]
pub trait PairingClient: Send + Sync {
    /// Register the device, returning its credentials secret.
    ///
    /// Requires a registration token in the config.
    async fn register_device(
        &self,
        config: &PairingConfig,
    ) -> std::result::Result<String, PairingError>;

    /// Resolve the broker URL for the device's realm.
    async fn broker_url(
        &self,
        config: &PairingConfig,
        secret: &str,
    ) -> std::result::Result<String, PairingError>;

    /// Submit a CSR and return the signed client certificate PEM.
    async fn sign_csr(
        &self,
        config: &PairingConfig,
        secret: &str,
        csr_pem: &str,
    ) -> std::result::Result<String, PairingError>;
}

/// Network reachability check used to triage certificate errors.
///
/// A certificate rejection with no connectivity is indistinguishable from a
/// captive portal or broken uplink, so the device only discards its
/// certificate when the network is confirmed reachable.
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    /// True when the network is currently reachable.
    async fn has_connectivity(&self) -> bool;
}
