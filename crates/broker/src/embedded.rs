//! Embedded rumqttd engine behind the [`Broker`] capability trait.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use {
    async_trait::async_trait,
    bytes::Bytes,
    rumqttd::{Broker as Engine, Notification, local::LinkRx, local::LinkTx},
    tokio::sync::Mutex,
    tracing::{debug, error, info, warn},
};

use {
    crate::{
        Broker,
        error::{Error, Result},
        hooks::BrokerHooks,
    },
    moqlink_config::BrokerSection,
};

/// Client id of the in-process link used for internal publishes and the
/// hook observation loop.
const LINK_CLIENT_ID: &str = "moqlink-internal";

/// The embedded MQTT broker.
///
/// rumqttd's event loop has no shutdown API, so the engine thread is spawned
/// once and lives for the process lifetime; `start`/`stop` gate the publish
/// path, the running flag, and the uptime clock.
pub struct EmbeddedBroker {
    cfg: BrokerSection,
    hooks: Arc<dyn BrokerHooks>,
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    link_tx: Option<LinkTx>,
    running: bool,
    started_at: Option<Instant>,
}

impl EmbeddedBroker {
    pub fn new(cfg: BrokerSection, hooks: Arc<dyn BrokerHooks>) -> Self {
        Self {
            cfg,
            hooks,
            inner: Mutex::new(Inner::default()),
        }
    }

    fn spawn_engine(&self, inner: &mut Inner) -> Result<()> {
        let config = engine_config(&self.cfg)?;
        let mut engine = Engine::new(config);

        let (mut link_tx, link_rx) = engine
            .link(LINK_CLIENT_ID)
            .map_err(|e| Error::Engine(e.to_string()))?;
        // Observe all traffic for the hook loop.
        link_tx
            .subscribe("#")
            .map_err(|e| Error::Engine(e.to_string()))?;

        std::thread::Builder::new()
            .name("moqlink-engine".into())
            .spawn(move || {
                if let Err(e) = engine.start() {
                    error!(error = %e, "mqtt engine exited");
                }
            })
            .map_err(|e| Error::Engine(e.to_string()))?;

        let hooks = Arc::clone(&self.hooks);
        std::thread::Builder::new()
            .name("moqlink-hooks".into())
            .spawn(move || observe(link_rx, hooks))
            .map_err(|e| Error::Engine(e.to_string()))?;

        inner.link_tx = Some(link_tx);
        Ok(())
    }
}

#[async_trait]
impl Broker for EmbeddedBroker {
    async fn start(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.running {
            return Ok(());
        }
        if inner.link_tx.is_none() {
            self.spawn_engine(&mut inner)?;
        }
        inner.running = true;
        inner.started_at = Some(Instant::now());
        info!(
            port = self.cfg.port,
            ws_port = self.cfg.ws_port,
            "mqtt broker started"
        );
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if !inner.running {
            return Ok(());
        }
        inner.running = false;
        inner.started_at = None;
        info!("mqtt broker stopped");
        Ok(())
    }

    async fn is_running(&self) -> bool {
        self.inner.lock().await.running
    }

    async fn uptime(&self) -> Duration {
        let inner = self.inner.lock().await;
        if !inner.running {
            return Duration::ZERO;
        }
        inner.started_at.map(|t| t.elapsed()).unwrap_or_default()
    }

    async fn publish(&self, topic: &str, payload: &[u8], qos: u8) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if !inner.running {
            return Err(Error::NotRunning);
        }
        let link = inner.link_tx.as_mut().ok_or(Error::NotRunning)?;
        link.publish(topic.to_string(), Bytes::copy_from_slice(payload))
            .map_err(|e| Error::Engine(e.to_string()))?;
        debug!(topic = %topic, qos, bytes = payload.len(), "published internal message");
        Ok(())
    }
}

/// Drain engine notifications and fan them out to the hooks.
fn observe(mut link_rx: LinkRx, hooks: Arc<dyn BrokerHooks>) {
    loop {
        match link_rx.recv() {
            Ok(Some(Notification::Forward(forward))) => {
                let topic = String::from_utf8_lossy(&forward.publish.topic).to_string();
                hooks.on_publish(&topic, &forward.publish.payload);
            },
            Ok(Some(other)) => debug!(notification = ?other, "engine notification"),
            Ok(None) => continue,
            Err(e) => {
                warn!(error = %e, "engine notification stream closed");
                break;
            },
        }
    }
}

/// Assemble the rumqttd engine config from the broker section.
///
/// rumqttd's own TOML schema is the source of truth here; rendering TOML and
/// deserializing keeps us aligned with the engine across versions.
fn engine_config(cfg: &BrokerSection) -> Result<rumqttd::Config> {
    let mut auth = String::new();
    if !cfg.allow_anonymous {
        auth.push_str("[v4.1.connections.auth]\n");
        for (user, pass) in &cfg.credentials {
            auth.push_str(&format!("{user:?} = {pass:?}\n"));
        }
    }

    let raw = format!(
        r#"
id = 0

[router]
max_connections = 10010
max_outgoing_packet_count = 200
max_segment_size = 104857600
max_segment_count = 10

[v4.1]
name = "v4-1"
listen = "{host}:{port}"
next_connection_delay_ms = 1

[v4.1.connections]
connection_timeout_ms = 60000
max_payload_size = {max_payload}
max_inflight_count = 100
dynamic_filters = true

{auth}
[ws.1]
name = "ws-1"
listen = "{host}:{ws_port}"
next_connection_delay_ms = 1

[ws.1.connections]
connection_timeout_ms = 60000
max_payload_size = {max_payload}
max_inflight_count = 100
dynamic_filters = true
"#,
        host = cfg.host,
        port = cfg.port,
        ws_port = cfg.ws_port,
        max_payload = cfg.max_payload_size,
    );

    toml::from_str(&raw).map_err(|e| Error::Config(e.to_string()))
}
