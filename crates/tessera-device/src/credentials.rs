//! Credential storage and the key/CSR/certificate coordinator.
//!
//! Credential material lives behind the [`CredentialStore`] trait so the
//! application decides where PEM blobs are persisted. Key and CSR generation
//! live behind [`CryptoProvider`]; this crate never touches X.509 primitives
//! itself.
//!
//! # Coordinator Invariants
//!
//! - Regenerating the private key always deletes the stored CSR.
//! - A failed certificate request persists nothing.
//! - Certificate invalidation deletes only the certificate; key and CSR
//!   survive so the next request reuses them.

use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use thiserror::Error;

use crate::{
    error::{DeviceError, Result},
    pairing::{PairingClient, PairingConfig},
};

/// The three independently stored credential blobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialKind {
    /// Device private key, PEM
    PrivateKey,
    /// Certificate signing request, PEM
    Csr,
    /// Platform-signed client certificate, PEM
    Certificate,
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PrivateKey => write!(f, "private key"),
            Self::Csr => write!(f, "CSR"),
            Self::Certificate => write!(f, "certificate"),
        }
    }
}

/// Errors from a credential store backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Backend I/O or storage failure
    #[error("credential store failure: {0}")]
    Backend(String),

    /// Stored blob exists but is unreadable
    #[error("stored {0} is corrupted")]
    Corrupted(CredentialKind),
}

/// Errors from key and CSR generation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Key pair generation failed
    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    /// CSR generation failed
    #[error("CSR generation failed: {0}")]
    CsrGeneration(String),

    /// Certificate could not be parsed
    #[error("certificate parse failed: {0}")]
    CertificateParse(String),
}

/// Persistent storage for credential PEM blobs.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Load a blob, `None` when absent.
    async fn load(&self, kind: CredentialKind) -> std::result::Result<Option<String>, StoreError>;

    /// Persist a blob, overwriting any previous value.
    async fn save(&self, kind: CredentialKind, pem: &str) -> std::result::Result<(), StoreError>;

    /// Delete a blob. Deleting an absent blob is not an error.
    async fn delete(&self, kind: CredentialKind) -> std::result::Result<(), StoreError>;

    /// True when a blob is present.
    async fn contains(&self, kind: CredentialKind) -> std::result::Result<bool, StoreError> {
        Ok(self.load(kind).await?.is_some())
    }
}

/// Key and CSR generation, and certificate inspection.
#[async_trait]
pub trait CryptoProvider: Send + Sync {
    /// Generate a fresh private key, returned as PEM.
    async fn create_key(&self) -> std::result::Result<String, CryptoError>;

    /// Generate a CSR for the given private key, returned as PEM.
    async fn create_csr(&self, key_pem: &str) -> std::result::Result<String, CryptoError>;

    /// Extract the subject common name from a certificate.
    ///
    /// For platform-issued certificates the common name is
    /// `<realm>/<device_id>`, which doubles as the device's root topic.
    fn certificate_common_name(&self, cert_pem: &str) -> std::result::Result<String, CryptoError>;
}

/// Coordinates the credential flow over a store and a crypto provider.
pub struct CredentialManager {
    store: Arc<dyn CredentialStore>,
    crypto: Arc<dyn CryptoProvider>,
}

impl fmt::Debug for CredentialManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialManager").finish_non_exhaustive()
    }
}

impl CredentialManager {
    /// Create a manager over the given collaborators.
    pub fn new(store: Arc<dyn CredentialStore>, crypto: Arc<dyn CryptoProvider>) -> Self {
        Self { store, crypto }
    }

    /// Run the credential flow to a usable certificate, returning its PEM.
    ///
    /// Creates whatever is missing: key (invalidating any stale CSR), CSR,
    /// then the signed certificate via the pairing service. Present material
    /// is reused as-is.
    ///
    /// # Errors
    ///
    /// The originating store, crypto, or pairing error. No partial
    /// certificate is persisted on failure.
    pub async fn ensure_certificate(
        &self,
        pairing: &dyn PairingClient,
        config: &PairingConfig,
        secret: &str,
    ) -> Result<String> {
        if !self.store.contains(CredentialKind::PrivateKey).await? {
            tracing::info!("no private key present, generating");
            let key = self.crypto.create_key().await?;
            self.store.save(CredentialKind::PrivateKey, &key).await?;
            // A CSR for a previous key can never be signed again.
            self.store.delete(CredentialKind::Csr).await?;
        }

        if !self.store.contains(CredentialKind::Csr).await? {
            tracing::info!("no CSR present, generating");
            let key = self
                .load_required(CredentialKind::PrivateKey)
                .await?;
            let csr = self.crypto.create_csr(&key).await?;
            self.store.save(CredentialKind::Csr, &csr).await?;
        }

        if let Some(cert) = self.store.load(CredentialKind::Certificate).await? {
            return Ok(cert);
        }

        tracing::info!("no certificate present, requesting from pairing service");
        let csr = self.load_required(CredentialKind::Csr).await?;
        let cert = pairing.sign_csr(config, secret, &csr).await?;
        self.store.save(CredentialKind::Certificate, &cert).await?;
        Ok(cert)
    }

    /// Load the stored private key.
    ///
    /// # Errors
    ///
    /// [`DeviceError::MissingCredential`] when absent.
    pub async fn private_key(&self) -> Result<String> {
        self.load_required(CredentialKind::PrivateKey).await
    }

    /// Delete the stored certificate, keeping key and CSR.
    ///
    /// # Errors
    ///
    /// The store's deletion error.
    pub async fn invalidate_certificate(&self) -> Result<()> {
        tracing::warn!("invalidating stored certificate");
        self.store.delete(CredentialKind::Certificate).await?;
        Ok(())
    }

    /// Subject common name of a certificate.
    ///
    /// # Errors
    ///
    /// The crypto provider's parse error.
    pub fn common_name(&self, cert_pem: &str) -> Result<String> {
        Ok(self.crypto.certificate_common_name(cert_pem)?)
    }

    async fn load_required(&self, kind: CredentialKind) -> Result<String> {
        self.store
            .load(kind)
            .await?
            .ok_or(DeviceError::MissingCredential(kind))
    }
}

/// In-memory credential store for testing and simulation.
///
/// # Thread Safety
///
/// State is wrapped in `Arc<Mutex<>>` to allow Clone and concurrent access.
/// Lock acquisition uses `lock().expect()`, which panics if the mutex is
/// poisoned. This is acceptable for test/simulation code.
#[derive(Clone, Default)]
pub struct MemoryCredentialStore {
    inner: Arc<Mutex<HashMap<CredentialKind, String>>>,
}

impl fmt::Debug for MemoryCredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryCredentialStore").finish_non_exhaustive()
    }
}

impl MemoryCredentialStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. This is acceptable for test
    /// code.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().expect("MemoryCredentialStore mutex poisoned").len()
    }

    /// True when nothing is stored.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. This is acceptable for test
    /// code.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. This is acceptable for test
    /// code.
    async fn load(&self, kind: CredentialKind) -> std::result::Result<Option<String>, StoreError> {
        let inner = self.inner.lock().expect("MemoryCredentialStore mutex poisoned");
        Ok(inner.get(&kind).cloned())
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. This is acceptable for test
    /// code.
    async fn save(&self, kind: CredentialKind, pem: &str) -> std::result::Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("MemoryCredentialStore mutex poisoned");
        inner.insert(kind, pem.to_string());
        Ok(())
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. This is acceptable for test
    /// code.
    async fn delete(&self, kind: CredentialKind) -> std::result::Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("MemoryCredentialStore mutex poisoned");
        inner.remove(&kind);
        Ok(())
    }
}
