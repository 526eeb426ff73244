//! Config schema types (broker, plugin identity, host endpoint, heartbeat, admin).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MoqlinkConfig {
    pub broker: BrokerSection,
    pub plugin: PluginConfig,
    pub host: HostConfig,
    pub heartbeat: HeartbeatConfig,
    pub admin: AdminConfig,
}

/// Embedded MQTT broker settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerSection {
    /// Address the broker listens on. A wildcard here is fine for the
    /// listener but is never advertised to the host as-is.
    pub host: String,
    pub port: u16,
    /// MQTT-over-WebSocket listener port.
    pub ws_port: u16,
    /// Accept clients without credentials. When false, `credentials`
    /// supplies the accepted username/password pairs.
    pub allow_anonymous: bool,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub credentials: HashMap<String, String>,
    /// Maximum MQTT payload size in bytes.
    pub max_payload_size: usize,
}

impl Default for BrokerSection {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 1883,
            ws_port: 8083,
            allow_anonymous: true,
            credentials: HashMap::new(),
            max_payload_size: 20 * 1024,
        }
    }
}

/// Identity advertised to the host, and the inbound RPC listener.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginConfig {
    pub name: String,
    /// Defaults to the crate version when empty.
    pub version: String,
    pub kind: String,
    pub description: String,
    /// Address the plugin RPC server binds to.
    pub bind: String,
    /// Port the host uses to reach this plugin; also the bind port.
    pub port: u16,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            name: "moqlink".into(),
            version: String::new(),
            kind: "mqtt-broker".into(),
            description: "Embedded MQTT broker plugin".into(),
            bind: "0.0.0.0".into(),
            port: 8085,
        }
    }
}

/// Remote orchestrator endpoint and channel tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Base URL of the host control API, e.g. `http://orchestrator:9190`.
    pub url: String,
    /// Deadline applied to registration/heartbeat/status calls, seconds.
    pub request_timeout_secs: u64,
    /// Deadline applied to command calls, seconds.
    pub command_timeout_secs: u64,
    /// TCP keepalive on the control channel. Off by default: aggressive
    /// keepalive has caused reconnect storms against some hosts.
    pub keepalive: bool,
    /// Cap on response bodies read from the host, bytes.
    pub max_response_bytes: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:9190".into(),
            request_timeout_secs: 5,
            command_timeout_secs: 10,
            keepalive: false,
            max_response_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Heartbeat supervisor settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartbeatConfig {
    /// Seconds between liveness reports to the host.
    pub interval_secs: u64,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self { interval_secs: 30 }
    }
}

/// Local administrative HTTP surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 8080,
        }
    }
}
