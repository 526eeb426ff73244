//! Host-facing plugin RPC surface.
//!
//! Three operations: execute-command, heartbeat, status. Failures are data:
//! a command that cannot run still produces a 200 with `success = false`,
//! so the host can tell "my request was invalid" from "the plugin is
//! unreachable".

use {
    axum::{
        Json, Router,
        extract::State,
        routing::{get, post},
    },
    tracing::{debug, info},
};

use {
    crate::state::GatewayState,
    moqlink_broker::Broker,
    moqlink_liaison::coerce_qos,
    moqlink_protocol::{ExecuteCommandRequest, ExecuteCommandResponse, PluginStatusResponse},
};

/// Build the `/v1/plugin/*` router.
pub fn plugin_router() -> Router<GatewayState> {
    Router::new()
        .route("/v1/plugin/command", post(execute_command_handler))
        .route("/v1/plugin/heartbeat", post(heartbeat_handler))
        .route("/v1/plugin/status", get(status_handler))
}

async fn execute_command_handler(
    State(state): State<GatewayState>,
    Json(req): Json<ExecuteCommandRequest>,
) -> Json<ExecuteCommandResponse> {
    info!(command = %req.command, "inbound command");

    let execution = execute(&state, &req);
    let response = match tokio::time::timeout(state.command_timeout, execution).await {
        Ok(response) => response,
        Err(_) => ExecuteCommandResponse::err(format!(
            "command '{}' timed out after {:?}",
            req.command, state.command_timeout
        )),
    };
    Json(response)
}

/// `start`, `stop` and `publish` act directly on the broker capability and
/// are intercepted before generic dispatch.
async fn execute(state: &GatewayState, req: &ExecuteCommandRequest) -> ExecuteCommandResponse {
    match req.command.as_str() {
        "start" => match state.broker.start().await {
            Ok(()) => ExecuteCommandResponse::ok("mqtt broker started"),
            Err(e) => ExecuteCommandResponse::err(format!("failed to start mqtt broker: {e}")),
        },
        "stop" => match state.broker.stop().await {
            Ok(()) => ExecuteCommandResponse::ok("mqtt broker stopped"),
            Err(e) => ExecuteCommandResponse::err(format!("failed to stop mqtt broker: {e}")),
        },
        "publish" => {
            let topic = req.parameters.get("topic").map(String::as_str).unwrap_or("");
            if topic.is_empty() {
                return ExecuteCommandResponse::err("topic must not be empty");
            }
            let message = req.parameters.get("message").map(String::as_str).unwrap_or("");
            let qos = coerce_qos(req.parameters.get("qos").map(String::as_str));
            match state.broker.publish(topic, message.as_bytes(), qos).await {
                Ok(()) => {
                    ExecuteCommandResponse::ok(format!("message published to topic: {topic}"))
                },
                Err(e) => ExecuteCommandResponse::err(format!("failed to publish message: {e}")),
            }
        },
        _ => state
            .dispatcher
            .dispatch(&req.command, &req.parameters)
            .await
            .into(),
    }
}

/// Echo/ack with server time. The request body is deliberately ignored:
/// the ack is the signal.
async fn heartbeat_handler() -> Json<serde_json::Value> {
    debug!("inbound heartbeat");
    Json(serde_json::json!({
        "received": true,
        "serverTime": chrono::Utc::now().timestamp_millis(),
    }))
}

async fn status_handler(State(state): State<GatewayState>) -> Json<PluginStatusResponse> {
    let running = state.broker.is_running().await;
    let uptime = state.broker.uptime().await.as_millis() as u64;
    Json(PluginStatusResponse {
        status: if running { "RUNNING" } else { "STOPPED" }.to_string(),
        uptime,
        plugin_id: state.registration.plugin_id().await,
    })
}
