//! Broker event hooks.
//!
//! A fixed set of named callbacks invoked from the engine observation loop.
//! Implementations must be cheap and non-blocking; they run on the
//! notification thread.

use tracing::{debug, info};

/// Named hooks for broker events. All methods default to no-ops so
/// implementations override only what they care about.
pub trait BrokerHooks: Send + Sync {
    fn on_publish(&self, _topic: &str, _payload: &[u8]) {}
    fn on_client_connected(&self, _client_id: &str) {}
    fn on_client_disconnected(&self, _client_id: &str) {}
    fn on_subscribe(&self, _client_id: &str, _filter: &str) {}
    fn on_unsubscribe(&self, _client_id: &str, _filter: &str) {}
    fn on_connection_lost(&self, _client_id: &str) {}
}

/// Default hooks: log broker traffic at debug/info level.
pub struct LogHooks;

impl BrokerHooks for LogHooks {
    fn on_publish(&self, topic: &str, payload: &[u8]) {
        debug!(topic = %topic, bytes = payload.len(), "publish observed");
    }

    fn on_client_connected(&self, client_id: &str) {
        info!(client = %client_id, "client connected");
    }

    fn on_client_disconnected(&self, client_id: &str) {
        info!(client = %client_id, "client disconnected");
    }

    fn on_subscribe(&self, client_id: &str, filter: &str) {
        info!(client = %client_id, filter = %filter, "subscription added");
    }

    fn on_unsubscribe(&self, client_id: &str, filter: &str) {
        info!(client = %client_id, filter = %filter, "subscription removed");
    }

    fn on_connection_lost(&self, client_id: &str) {
        info!(client = %client_id, "connection lost");
    }
}
