//! Broker capability: the narrow surface the liaison drives the embedded
//! MQTT engine through.
//!
//! The engine itself (topic matching, session state, wire parsing) is
//! rumqttd's concern; everything here is lifecycle, the publish path, and
//! the named event hooks.

pub mod embedded;
pub mod error;
pub mod hooks;

use std::time::Duration;

use async_trait::async_trait;

pub use {
    embedded::EmbeddedBroker,
    error::{Error, Result},
    hooks::{BrokerHooks, LogHooks},
};

/// Narrow capability trait over the embedded broker engine.
///
/// The liaison and the admin surface only ever talk to this trait; tests
/// substitute their own implementations.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Start serving. Idempotent: starting a running broker is a no-op.
    async fn start(&self) -> Result<()>;

    /// Stop serving. Idempotent: stopping a stopped broker is a no-op.
    async fn stop(&self) -> Result<()>;

    async fn is_running(&self) -> bool;

    /// Time since the last successful `start`, or zero when stopped.
    async fn uptime(&self) -> Duration;

    /// Publish a message from inside the process (no client connection).
    async fn publish(&self, topic: &str, payload: &[u8], qos: u8) -> Result<()>;
}
