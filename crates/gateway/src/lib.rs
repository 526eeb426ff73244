//! HTTP surfaces of the plugin: the host-facing RPC server and the local
//! admin API.

pub mod admin_routes;
pub mod plugin_routes;
pub mod state;

use {axum::Router, tower_http::limit::RequestBodyLimitLayer};

pub use state::GatewayState;

/// Inbound request body cap, matching the channel-level message size cap.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Assemble the host-facing plugin app.
pub fn build_plugin_app(state: GatewayState) -> Router {
    plugin_routes::plugin_router()
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}

/// Assemble the local admin app.
pub fn build_admin_app(state: GatewayState) -> Router {
    admin_routes::admin_router()
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}
