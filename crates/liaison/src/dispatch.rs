//! Host-issued command execution against the local broker.

use std::{collections::HashMap, sync::Arc};

use tracing::info;

use {moqlink_broker::Broker, moqlink_protocol::CommandOutcome};

/// Maps a named command plus string parameters to an outcome. No network
/// state; every broker failure is converted into a failed outcome and never
/// propagates to the caller.
pub struct CommandDispatcher {
    broker: Arc<dyn Broker>,
}

impl CommandDispatcher {
    pub fn new(broker: Arc<dyn Broker>) -> Self {
        Self { broker }
    }

    pub async fn dispatch(&self, command: &str, params: &HashMap<String, String>) -> CommandOutcome {
        info!(command = %command, "dispatching command");

        match command.to_ascii_lowercase().as_str() {
            "publish" => self.handle_publish(params).await,
            "status" => self.handle_status().await,
            "restart" => self.handle_restart().await,
            _ => CommandOutcome::failed(format!("unknown command: {command}")),
        }
    }

    async fn handle_publish(&self, params: &HashMap<String, String>) -> CommandOutcome {
        let (Some(topic), Some(message)) = (params.get("topic"), params.get("message")) else {
            return CommandOutcome::failed("missing required parameters: topic and message");
        };
        let qos = coerce_qos(params.get("qos").map(String::as_str));

        match self.broker.publish(topic, message.as_bytes(), qos).await {
            Ok(()) => CommandOutcome::ok(format!("message published to topic: {topic}")),
            Err(e) => CommandOutcome::failed(format!("failed to publish message: {e}")),
        }
    }

    async fn handle_status(&self) -> CommandOutcome {
        let running = self.broker.is_running().await;
        let uptime = self.broker.uptime().await.as_millis();
        CommandOutcome::ok(format!("running={running} uptime_ms={uptime}"))
    }

    /// Stop (when running) then start. The start phase is attempted even
    /// when the stop phase failed; when both phases fail, the outcome
    /// reports both errors.
    async fn handle_restart(&self) -> CommandOutcome {
        let mut stop_error = None;
        if self.broker.is_running().await {
            if let Err(e) = self.broker.stop().await {
                stop_error = Some(e.to_string());
            }
        }

        match (self.broker.start().await, stop_error) {
            (Ok(()), None) => CommandOutcome::ok("broker restarted"),
            (Ok(()), Some(stop)) => {
                CommandOutcome::failed(format!("restart degraded; stop phase failed: {stop}"))
            },
            (Err(start), None) => {
                CommandOutcome::failed(format!("failed to restart broker: {start}"))
            },
            (Err(start), Some(stop)) => {
                CommandOutcome::failed(format!("restart failed; stop: {stop}; start: {start}"))
            },
        }
    }
}

/// Parse a qos parameter, coercing anything outside 0–2 to 0.
pub fn coerce_qos(raw: Option<&str>) -> u8 {
    raw.and_then(|v| v.parse::<u8>().ok())
        .filter(|q| *q <= 2)
        .unwrap_or(0)
}
