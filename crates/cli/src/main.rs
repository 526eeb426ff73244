use std::{sync::Arc, time::Duration};

use {
    clap::Parser,
    tokio_util::sync::CancellationToken,
    tracing::{info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use {
    moqlink_broker::{Broker, EmbeddedBroker, LogHooks},
    moqlink_gateway::{GatewayState, build_admin_app, build_plugin_app},
    moqlink_liaison::{CommandDispatcher, HeartbeatSupervisor, Liaison},
    moqlink_protocol::PluginIdentity,
};

/// Grace period for draining the control channel at shutdown.
const CHANNEL_CLOSE_GRACE: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "moqlink", about = "moqlink — embedded MQTT broker plugin")]
struct Cli {
    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, default_value_t = false)]
    json_logs: bool,

    /// Path to moqlink.toml (overrides discovery).
    #[arg(long, env = "MOQLINK_CONFIG")]
    config: Option<std::path::PathBuf>,

    /// Plugin RPC port (overrides config value).
    #[arg(long)]
    plugin_port: Option<u16>,

    /// Admin HTTP port (overrides config value).
    #[arg(long)]
    admin_port: Option<u16>,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "moqlink starting");

    let mut config = moqlink_config::discover_and_load(cli.config.as_deref());
    if let Some(port) = cli.plugin_port {
        config.plugin.port = port;
    }
    if let Some(port) = cli.admin_port {
        config.admin.port = port;
    }

    // The broker serves local clients regardless of host reachability.
    let broker: Arc<dyn Broker> = Arc::new(EmbeddedBroker::new(
        config.broker.clone(),
        Arc::new(LogHooks),
    ));
    broker
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("failed to start mqtt broker: {e}"))?;

    let identity = PluginIdentity {
        name: config.plugin.name.clone(),
        version: if config.plugin.version.is_empty() {
            env!("CARGO_PKG_VERSION").into()
        } else {
            config.plugin.version.clone()
        },
        kind: config.plugin.kind.clone(),
        description: config.plugin.description.clone(),
        host: config.broker.host.clone(),
        port: config.plugin.port,
    };

    let liaison = Arc::new(Liaison::new(config.host.clone(), identity));
    // First contact with the host; downtime here is recovered by the
    // heartbeat supervisor, never fatal.
    if let Err(e) = liaison.ensure_channel().await {
        warn!(error = %e, "host not reachable at startup");
    }

    let dispatcher = Arc::new(CommandDispatcher::new(Arc::clone(&broker)));
    let state = GatewayState::new(
        Arc::clone(&broker),
        dispatcher,
        Arc::clone(liaison.registration()),
        Duration::from_secs(config.host.command_timeout_secs),
    );

    let shutdown = CancellationToken::new();

    let plugin_listener =
        tokio::net::TcpListener::bind((config.plugin.bind.as_str(), config.plugin.port)).await?;
    info!(addr = %plugin_listener.local_addr()?, "plugin RPC server listening");
    let plugin_server = {
        let app = build_plugin_app(state.clone());
        let token = shutdown.clone();
        tokio::spawn(async move {
            axum::serve(plugin_listener, app)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await
        })
    };

    let admin_listener =
        tokio::net::TcpListener::bind((config.admin.bind.as_str(), config.admin.port)).await?;
    info!(addr = %admin_listener.local_addr()?, "admin server listening");
    let admin_server = {
        let app = build_admin_app(state);
        let token = shutdown.clone();
        tokio::spawn(async move {
            axum::serve(admin_listener, app)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await
        })
    };

    let supervisor = HeartbeatSupervisor::new(
        Arc::clone(&liaison),
        Arc::clone(&broker),
        Duration::from_secs(config.heartbeat.interval_secs),
    );
    let heartbeat_task = tokio::spawn(supervisor.run(shutdown.clone()));

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");

    // Ordered teardown: stop heartbeats, best-effort unregister, close the
    // channel, drain the servers, and stop the broker last so in-flight
    // command executions are not starved.
    shutdown.cancel();
    let _ = heartbeat_task.await;
    liaison.shutdown(CHANNEL_CLOSE_GRACE).await;
    let _ = plugin_server.await;
    let _ = admin_server.await;
    if let Err(e) = broker.stop().await {
        warn!(error = %e, "broker stop failed");
    }

    info!("moqlink stopped");
    Ok(())
}
