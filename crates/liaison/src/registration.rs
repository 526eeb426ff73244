//! Idempotent plugin registration against the host.
//!
//! Every `register()` call runs find-by-name before create, so repeated
//! registration never duplicates host-side entries; the host-assigned
//! `plugin_id` is the only externally valid reference to this process.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use {
    tokio::sync::{Mutex, RwLock},
    tracing::{info, warn},
};

use {
    crate::{
        channel::ChannelManager,
        error::{Error, Result},
    },
    moqlink_protocol::{
        PluginIdentity, PluginRegistration, RegistrationStatus, UpdatePluginRequest,
    },
};

pub struct RegistrationManager {
    identity: PluginIdentity,
    channel: Arc<ChannelManager>,
    current: RwLock<Option<PluginRegistration>>,
    /// Single-flight guard: one registration attempt satisfies all
    /// concurrent callers.
    flight: Mutex<()>,
    epoch: AtomicU64,
}

impl RegistrationManager {
    /// A wildcard bind address is replaced with a resolvable one before it
    /// can ever be advertised.
    pub fn new(mut identity: PluginIdentity, channel: Arc<ChannelManager>) -> Self {
        identity.host = advertised_host(&identity.host);
        Self {
            identity,
            channel,
            current: RwLock::new(None),
            flight: Mutex::new(()),
            epoch: AtomicU64::new(0),
        }
    }

    pub fn identity(&self) -> &PluginIdentity {
        &self.identity
    }

    pub async fn plugin_id(&self) -> Option<String> {
        self.current
            .read()
            .await
            .as_ref()
            .map(|r| r.plugin_id.clone())
    }

    pub async fn current(&self) -> Option<PluginRegistration> {
        self.current.read().await.clone()
    }

    /// Register this instance with the host, adopting an existing host-side
    /// entry when one matches our name.
    pub async fn register(&self) -> Result<PluginRegistration> {
        let epoch_before = self.epoch.load(Ordering::SeqCst);
        let _flight = self.flight.lock().await;
        // A registration that completed while we waited satisfies this call.
        if self.epoch.load(Ordering::SeqCst) != epoch_before {
            if let Some(reg) = self.current.read().await.clone() {
                return Ok(reg);
            }
        }

        let channel = self.channel.ensure().await?.channel;

        let found = channel.find_plugin_by_name(&self.identity.name).await?;
        let registration = match found.registration.filter(|_| found.found) {
            Some(existing) => {
                // Known to the host: refresh status and reachability, adopt
                // the existing id.
                let update = UpdatePluginRequest {
                    plugin_id: existing.plugin_id.clone(),
                    status: RegistrationStatus::Registered,
                    host: self.identity.host.clone(),
                    port: self.identity.port,
                };
                let resp = channel.update_plugin(&update).await?;
                if !resp.success {
                    // A transient update failure must not un-register a
                    // healthy instance; keep whatever id we already hold,
                    // downgraded until the next successful registration.
                    warn!(plugin_id = %existing.plugin_id, message = %resp.message, "plugin update rejected");
                    if let Some(current) = self.current.write().await.as_mut() {
                        current.status = RegistrationStatus::Degraded;
                    }
                    return Err(Error::RegistrationFailed(format!(
                        "update rejected: {}",
                        resp.message
                    )));
                }
                info!(plugin_id = %existing.plugin_id, "adopted existing registration");
                PluginRegistration {
                    plugin_id: existing.plugin_id,
                    identity: self.identity.clone(),
                    status: RegistrationStatus::Registered,
                }
            },
            None => {
                let resp = channel.register_plugin(&self.identity).await?;
                if !resp.success || resp.plugin_id.is_empty() {
                    // Leave the id unset so the next heartbeat tick retries
                    // from scratch.
                    return Err(Error::RegistrationFailed(resp.message));
                }
                info!(plugin_id = %resp.plugin_id, "plugin registered");
                PluginRegistration {
                    plugin_id: resp.plugin_id,
                    identity: self.identity.clone(),
                    status: RegistrationStatus::Registered,
                }
            },
        };

        *self.current.write().await = Some(registration.clone());
        self.epoch.fetch_add(1, Ordering::SeqCst);
        Ok(registration)
    }

    /// Best-effort unregister notification at shutdown. Failures are logged
    /// and ignored; they never block process exit.
    pub async fn unregister(&self) {
        let Some(registration) = self.current.write().await.take() else {
            return;
        };
        let Ok(ensured) = self.channel.ensure().await else {
            return;
        };
        match ensured.channel.stop_plugin(&registration.plugin_id).await {
            Ok(resp) => info!(message = %resp.message, "unregistered from host"),
            Err(e) => warn!(error = %e, "best-effort unregister failed"),
        }
    }
}

/// The address advertised to the host for inbound calls. Wildcard binds are
/// invalid there; substitute the machine hostname, or loopback when the
/// hostname is unavailable.
pub fn advertised_host(raw: &str) -> String {
    let trimmed = raw.trim();
    let wildcard = matches!(trimmed, "" | "0.0.0.0" | "::" | "[::]");
    if !wildcard {
        return trimmed.to_string();
    }
    hostname::get()
        .ok()
        .map(|h| h.to_string_lossy().into_owned())
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "127.0.0.1".to_string())
}
