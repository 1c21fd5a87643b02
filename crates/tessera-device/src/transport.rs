//! Publish/subscribe transport abstraction.
//!
//! The [`Transport`] trait covers the operations the device needs from a
//! broker connection. A production implementation wraps an MQTT client with
//! mutual-TLS; tests drive the device through a recording fake. Transport
//! events flow back into the device via
//! [`Device::handle_event`](crate::Device::handle_event), serialized by the
//! caller.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::{
    error::{DeviceError, Result},
    mapping::Reliability,
};

/// Delivery guarantee for one publish or subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Qos {
    /// Fire and forget
    AtMostOnce = 0,
    /// Delivered at least once
    AtLeastOnce = 1,
    /// Delivered exactly once
    ExactlyOnce = 2,
}

impl TryFrom<i32> for Qos {
    type Error = DeviceError;

    fn try_from(value: i32) -> Result<Self> {
        match value {
            0 => Ok(Self::AtMostOnce),
            1 => Ok(Self::AtLeastOnce),
            2 => Ok(Self::ExactlyOnce),
            other => Err(DeviceError::InvalidQos(other)),
        }
    }
}

impl From<Reliability> for Qos {
    fn from(reliability: Reliability) -> Self {
        match reliability {
            Reliability::Unreliable => Self::AtMostOnce,
            Reliability::Guaranteed => Self::AtLeastOnce,
            Reliability::Unique => Self::ExactlyOnce,
        }
    }
}

/// Everything the transport needs to establish a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSetup {
    /// Broker URL resolved through the pairing service
    pub broker_url: String,
    /// Client certificate PEM for mutual TLS
    pub client_certificate: String,
    /// Private key PEM matching the certificate
    pub private_key: String,
}

/// Errors from transport operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Operation requires a configured session
    #[error("transport is not configured")]
    NotConfigured,

    /// No connection to the broker
    #[error("transport is not connected")]
    NotConnected,

    /// Operation failed at the broker or on the wire
    #[error("transport failure: {0}")]
    Failed(String),
}

/// Events the transport reports back to the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Session established.
    Connected {
        /// True when the broker resumed a previous session
        session_present: bool,
    },
    /// Connection lost; the transport keeps retrying on its own.
    Disconnected,
    /// Message received on a subscribed topic.
    Incoming {
        /// Full topic the message arrived on
        topic: String,
        /// Raw payload bytes
        payload: Bytes,
    },
    /// TLS handshake failed because the broker rejected the client
    /// certificate.
    CertificateError,
}

/// Broker connection used by the device.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Install session parameters. May be called again after certificate
    /// renewal.
    async fn configure(&self, session: SessionSetup) -> std::result::Result<(), TransportError>;

    /// Start connecting. Connection progress is reported through events.
    async fn start(&self) -> std::result::Result<(), TransportError>;

    /// Disconnect and stop reconnecting.
    async fn stop(&self) -> std::result::Result<(), TransportError>;

    /// Publish a payload.
    async fn publish(
        &self,
        topic: &str,
        payload: Bytes,
        qos: Qos,
    ) -> std::result::Result<(), TransportError>;

    /// Subscribe to a topic filter.
    async fn subscribe(&self, topic: &str, qos: Qos) -> std::result::Result<(), TransportError>;
}
