//! Application callbacks.

use crate::individual::Individual;

/// Callbacks the device invokes as its state and data change.
///
/// All methods default to no-ops so applications implement only what they
/// consume. Callbacks run on the context that delivered the transport event;
/// implementations should hand heavy work off to their own tasks.
pub trait EventHandler: Send + Sync {
    /// Session established.
    fn on_connected(&self, session_present: bool) {
        let _ = session_present;
    }

    /// Session lost or stopped.
    fn on_disconnected(&self) {}

    /// Server-owned data arrived for an endpoint.
    fn on_data(&self, interface: &str, path: &str, value: Individual) {
        let _ = (interface, path, value);
    }

    /// A server-owned property was unset.
    fn on_unset(&self, interface: &str, path: &str) {
        let _ = (interface, path);
    }
}

/// Handler that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHandler;

impl EventHandler for NoopHandler {}
