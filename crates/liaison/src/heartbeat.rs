//! Periodic liveness reporting to the host.

use std::{sync::Arc, time::Duration};

use {
    tokio::time::MissedTickBehavior,
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

use {crate::Liaison, moqlink_broker::Broker};

/// Timer-driven supervisor: each tick reports broker liveness and drives
/// channel/registration recovery. Ticks never overlap; a tick that is
/// still in flight when the next is due causes the new tick to be skipped,
/// not queued.
pub struct HeartbeatSupervisor {
    liaison: Arc<Liaison>,
    broker: Arc<dyn Broker>,
    interval: Duration,
}

impl HeartbeatSupervisor {
    pub fn new(liaison: Arc<Liaison>, broker: Arc<dyn Broker>, interval: Duration) -> Self {
        Self {
            liaison,
            broker,
            interval,
        }
    }

    /// Run the tick loop until `shutdown` fires.
    pub async fn run(self, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("heartbeat supervisor stopping");
                    break;
                }
                _ = ticker.tick() => self.tick().await,
            }
        }
    }

    /// One supervision cycle. Split out from [`run`](Self::run) so tests can
    /// drive ticks manually.
    pub async fn tick(&self) {
        let channel_mgr = self.liaison.channel_manager();

        // No usable channel: spend this cycle on recovery, not heartbeats.
        if !channel_mgr.is_open().await {
            debug!("control channel down, attempting rebuild");
            match self.liaison.ensure_channel().await {
                Ok(_) => info!("control channel rebuilt"),
                Err(e) => warn!(error = %e, "control channel rebuild failed"),
            }
            return;
        }

        // No identity yet: register before reporting liveness.
        let plugin_id = match self.liaison.registration().plugin_id().await {
            Some(id) => id,
            None => match self.liaison.registration().register().await {
                Ok(registration) => registration.plugin_id,
                Err(e) => {
                    if e.is_transport() {
                        channel_mgr.invalidate(&e).await;
                    }
                    warn!(error = %e, "registration attempt failed, skipping heartbeat");
                    return;
                },
            },
        };

        let status_info = if self.broker.is_running().await {
            "RUNNING"
        } else {
            "STOPPED"
        };

        let channel = match channel_mgr.ensure().await {
            Ok(ensured) => ensured.channel,
            Err(e) => {
                warn!(error = %e, "no channel for heartbeat");
                return;
            },
        };

        match channel.heartbeat(&plugin_id, status_info).await {
            Ok(ack) if ack.received => {
                debug!(server_time = ack.server_time, "heartbeat acknowledged");
            },
            Ok(_) => warn!("host did not acknowledge heartbeat"),
            Err(e) if e.is_transport() => {
                warn!(error = %e, "transport failure on heartbeat, invalidating channel");
                channel_mgr.invalidate(&e).await;
            },
            Err(e) => warn!(error = %e, "heartbeat rejected"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;

    use super::*;
    use {
        crate::error::Error,
        moqlink_broker::Result as BrokerResult,
        moqlink_config::HostConfig,
        moqlink_protocol::PluginIdentity,
    };

    struct StoppedBroker(AtomicBool);

    #[async_trait]
    impl Broker for StoppedBroker {
        async fn start(&self) -> BrokerResult<()> {
            self.0.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn stop(&self) -> BrokerResult<()> {
            self.0.store(false, Ordering::SeqCst);
            Ok(())
        }

        async fn is_running(&self) -> bool {
            self.0.load(Ordering::SeqCst)
        }

        async fn uptime(&self) -> Duration {
            Duration::ZERO
        }

        async fn publish(&self, _topic: &str, _payload: &[u8], _qos: u8) -> BrokerResult<()> {
            Ok(())
        }
    }

    fn identity() -> PluginIdentity {
        PluginIdentity {
            name: "edge-mqtt".into(),
            version: "1.0.0".into(),
            kind: "mqtt-broker".into(),
            description: String::new(),
            host: "127.0.0.1".into(),
            port: 8085,
        }
    }

    fn supervisor_for(url: &str, running: bool) -> (Arc<Liaison>, HeartbeatSupervisor) {
        let liaison = Arc::new(Liaison::new(
            HostConfig {
                url: url.to_string(),
                request_timeout_secs: 2,
                ..HostConfig::default()
            },
            identity(),
        ));
        let broker = Arc::new(StoppedBroker(AtomicBool::new(running)));
        let supervisor =
            HeartbeatSupervisor::new(Arc::clone(&liaison), broker, Duration::from_secs(30));
        (liaison, supervisor)
    }

    #[tokio::test]
    async fn down_channel_tick_rebuilds_without_heartbeat() {
        let mut server = mockito::Server::new_async().await;
        let heartbeat = server
            .mock("POST", "/v1/plugins/heartbeat")
            .expect(0)
            .create_async()
            .await;
        // Registration after the rebuild is attempted but fails; that is
        // fine for this cycle.
        server
            .mock("POST", "/v1/plugins/find-by-name")
            .with_status(503)
            .create_async()
            .await;

        let (liaison, supervisor) = supervisor_for(&server.url(), true);
        assert!(!liaison.channel_manager().is_open().await);

        supervisor.tick().await;

        // Exactly one reconnect attempt, zero heartbeat RPCs.
        assert_eq!(liaison.channel_manager().generation(), 1);
        heartbeat.assert_async().await;
    }

    #[tokio::test]
    async fn tick_registers_then_heartbeats() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/plugins/find-by-name")
            .with_body(r#"{"found": false}"#)
            .create_async()
            .await;
        server
            .mock("POST", "/v1/plugins/register")
            .with_body(r#"{"success": true, "pluginId": "p-1", "message": "ok"}"#)
            .create_async()
            .await;
        let heartbeat = server
            .mock("POST", "/v1/plugins/heartbeat")
            .match_body(mockito::Matcher::PartialJson(
                serde_json::json!({"pluginId": "p-1", "statusInfo": "STOPPED"}),
            ))
            .with_body(r#"{"received": true, "serverTime": 1}"#)
            .create_async()
            .await;

        let (liaison, supervisor) = supervisor_for(&server.url(), false);
        // Open the channel directly (bypassing the rebuild hook) so the tick
        // itself has to register before heartbeating.
        liaison.channel_manager().ensure().await.unwrap();
        supervisor.tick().await;

        assert_eq!(liaison.registration().plugin_id().await.as_deref(), Some("p-1"));
        heartbeat.assert_async().await;
    }

    #[tokio::test]
    async fn transport_failure_invalidates_channel() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/plugins/find-by-name")
            .with_body(r#"{"found": false}"#)
            .create_async()
            .await;
        server
            .mock("POST", "/v1/plugins/register")
            .with_body(r#"{"success": true, "pluginId": "p-1", "message": "ok"}"#)
            .create_async()
            .await;
        server
            .mock("POST", "/v1/plugins/heartbeat")
            .with_status(503)
            .with_body("down for maintenance")
            .create_async()
            .await;

        let (liaison, supervisor) = supervisor_for(&server.url(), true);
        liaison.channel_manager().ensure().await.unwrap();

        supervisor.tick().await;

        assert!(!liaison.channel_manager().is_open().await);
        assert!(liaison.channel_manager().last_error().await.is_some());
    }

    #[tokio::test]
    async fn negative_ack_is_not_fatal() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/plugins/find-by-name")
            .with_body(r#"{"found": false}"#)
            .create_async()
            .await;
        server
            .mock("POST", "/v1/plugins/register")
            .with_body(r#"{"success": true, "pluginId": "p-1", "message": "ok"}"#)
            .create_async()
            .await;
        server
            .mock("POST", "/v1/plugins/heartbeat")
            .with_body(r#"{"received": false, "serverTime": 0}"#)
            .create_async()
            .await;

        let (liaison, supervisor) = supervisor_for(&server.url(), true);
        liaison.channel_manager().ensure().await.unwrap();

        supervisor.tick().await;

        // The channel stays open: a negative ack is logged, not fatal.
        assert!(liaison.channel_manager().is_open().await);
    }

    #[tokio::test]
    async fn rejected_registration_skips_heartbeat() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/plugins/find-by-name")
            .with_body(r#"{"found": false}"#)
            .create_async()
            .await;
        server
            .mock("POST", "/v1/plugins/register")
            .with_body(r#"{"success": false, "pluginId": "", "message": "quota"}"#)
            .create_async()
            .await;
        let heartbeat = server
            .mock("POST", "/v1/plugins/heartbeat")
            .expect(0)
            .create_async()
            .await;

        let (liaison, supervisor) = supervisor_for(&server.url(), true);
        liaison.channel_manager().ensure().await.unwrap();

        supervisor.tick().await;

        assert!(liaison.registration().plugin_id().await.is_none());
        // Host-level rejection is not a transport fault: channel stays open.
        assert!(liaison.channel_manager().is_open().await);
        heartbeat.assert_async().await;
    }

    #[test]
    fn error_classification_feeds_invalidation() {
        let rejected = Error::RegistrationFailed("quota".into());
        assert!(!rejected.is_transport());
    }
}
