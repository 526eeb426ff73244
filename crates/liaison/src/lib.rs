//! Plugin liaison: the control-plane subsystem connecting the local broker
//! to a remote orchestrator ("host").
//!
//! The liaison owns the control channel, performs idempotent registration,
//! sustains periodic heartbeats, and executes host-issued commands against
//! the broker capability. Channel failures are recovered autonomously: a
//! transport-class error invalidates the channel, and the next heartbeat
//! tick rebuilds it and re-registers if needed.

pub mod channel;
pub mod dispatch;
pub mod error;
pub mod heartbeat;
pub mod host_client;
pub mod registration;

use std::{sync::Arc, time::Duration};

use tracing::warn;

pub use {
    channel::{ChannelManager, Ensured},
    dispatch::{CommandDispatcher, coerce_qos},
    error::{Error, Result},
    heartbeat::HeartbeatSupervisor,
    host_client::HostChannel,
    registration::RegistrationManager,
};

use {moqlink_config::HostConfig, moqlink_protocol::PluginIdentity};

/// Composition root for the control plane: one channel manager and one
/// registration manager, wired so a channel rebuild re-triggers
/// registration when no identity is held.
pub struct Liaison {
    channel: Arc<ChannelManager>,
    registration: Arc<RegistrationManager>,
}

impl Liaison {
    pub fn new(host_cfg: HostConfig, identity: PluginIdentity) -> Self {
        let channel = Arc::new(ChannelManager::new(host_cfg));
        let registration = Arc::new(RegistrationManager::new(identity, Arc::clone(&channel)));
        Self {
            channel,
            registration,
        }
    }

    pub fn channel_manager(&self) -> &Arc<ChannelManager> {
        &self.channel
    }

    pub fn registration(&self) -> &Arc<RegistrationManager> {
        &self.registration
    }

    /// Fetch the live channel handle, building one if needed. A fresh build
    /// triggers a registration attempt when no registration exists;
    /// registration failures here are logged, never fatal.
    pub async fn ensure_channel(&self) -> Result<Arc<HostChannel>> {
        let ensured = self.channel.ensure().await?;
        if ensured.rebuilt && self.registration.plugin_id().await.is_none() {
            if let Err(e) = self.registration.register().await {
                warn!(error = %e, "registration after channel rebuild failed");
            }
        }
        Ok(ensured.channel)
    }

    /// Ordered control-plane shutdown: best-effort unregister (bounded by
    /// the per-call deadline, failures ignored), then close the channel
    /// within `grace`.
    pub async fn shutdown(&self, grace: Duration) {
        self.registration.unregister().await;
        self.channel.close(grace).await;
    }
}
