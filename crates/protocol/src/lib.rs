//! Host ⇄ plugin RPC wire types.
//!
//! The control contract has two directions, both JSON over HTTP:
//!
//! - plugin → host: find-by-name, register, update, heartbeat, status, stop
//!   (`POST {host}/v1/plugins/...`)
//! - host → plugin: execute-command, heartbeat, status
//!   (`/v1/plugin/...` on the plugin's advertised port)
//!
//! Field names use camelCase on the wire. The transport itself is a fixed,
//! versioned contract owned by the host; only the shapes live here.

use serde::{Deserialize, Serialize};

// ── Plugin identity & registration ───────────────────────────────────────────

/// Static descriptor of this plugin instance, built once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginIdentity {
    pub name: String,
    pub version: String,
    pub kind: String,
    pub description: String,
    /// Address the host should use for inbound calls. Never a wildcard.
    pub host: String,
    pub port: u16,
}

/// Registration state as tracked by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegistrationStatus {
    Registered,
    Degraded,
}

impl RegistrationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Registered => "REGISTERED",
            Self::Degraded => "DEGRADED",
        }
    }
}

/// A live registration: the host-assigned id plus the identity it refers to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginRegistration {
    pub plugin_id: String,
    pub identity: PluginIdentity,
    pub status: RegistrationStatus,
}

// ── Plugin → host operations ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindPluginByNameRequest {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindPluginByNameResponse {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration: Option<PluginRegistration>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPluginResponse {
    pub success: bool,
    #[serde(default)]
    pub plugin_id: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePluginRequest {
    pub plugin_id: String,
    pub status: RegistrationStatus,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePluginResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatRequest {
    pub plugin_id: String,
    /// Broker liveness as seen by the plugin ("RUNNING" or "STOPPED").
    pub status_info: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatResponse {
    pub received: bool,
    /// Milliseconds since the Unix epoch, host clock.
    #[serde(default)]
    pub server_time: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRequest {
    pub plugin_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub status: String,
    #[serde(default)]
    pub uptime: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopPluginRequest {
    pub plugin_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopPluginResponse {
    #[serde(default)]
    pub message: String,
}

// ── Host → plugin operations ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteCommandRequest {
    #[serde(default)]
    pub plugin_id: String,
    pub command: String,
    #[serde(default)]
    pub parameters: std::collections::HashMap<String, String>,
}

/// Command results are always data, never transport errors: a failed command
/// still travels back as a normal response with `success = false`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteCommandResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ExecuteCommandResponse {
    pub fn ok(result: impl Into<String>) -> Self {
        Self {
            success: true,
            result: Some(result.into()),
            error_message: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            result: None,
            error_message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginStatusResponse {
    pub status: String,
    pub uptime: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugin_id: Option<String>,
}

// ── Command outcomes ─────────────────────────────────────────────────────────

/// Result of executing a named command locally. A sum type by construction:
/// a success message and a failure error can never coexist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Ok { message: String },
    Failed { error: String },
}

impl CommandOutcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self::Ok {
            message: message.into(),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self::Failed {
            error: error.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }
}

impl From<CommandOutcome> for ExecuteCommandResponse {
    fn from(outcome: CommandOutcome) -> Self {
        match outcome {
            CommandOutcome::Ok { message } => Self::ok(message),
            CommandOutcome::Failed { error } => Self::err(error),
        }
    }
}
