//! Local administrative HTTP surface.
//!
//! A thin read-through to broker state. The status endpoint returns a
//! best-effort snapshot and never waits on host connectivity.

use {
    axum::{
        Json, Router,
        extract::{Query, State},
        routing::{get, post},
    },
    serde::Deserialize,
    tracing::warn,
};

use {crate::state::GatewayState, moqlink_broker::Broker, moqlink_liaison::coerce_qos};

/// Build the `/api/mqtt/*` router.
pub fn admin_router() -> Router<GatewayState> {
    Router::new()
        .route("/api/mqtt/status", get(status_handler))
        .route("/api/mqtt/publish", post(publish_handler))
}

async fn status_handler(State(state): State<GatewayState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "running": state.broker.is_running().await,
        "uptime": state.broker.uptime().await.as_millis() as u64,
    }))
}

#[derive(Debug, Deserialize)]
struct PublishParams {
    topic: String,
    message: String,
    qos: Option<String>,
}

/// Fire-and-forget publish: failures are logged, the response shape is
/// fixed.
async fn publish_handler(
    State(state): State<GatewayState>,
    Query(params): Query<PublishParams>,
) -> Json<serde_json::Value> {
    let qos = coerce_qos(params.qos.as_deref());
    if let Err(e) = state
        .broker
        .publish(&params.topic, params.message.as_bytes(), qos)
        .await
    {
        warn!(topic = %params.topic, error = %e, "admin publish failed");
    }
    Json(serde_json::json!({
        "status": "success",
        "message": format!("Message published to topic: {}", params.topic),
    }))
}
