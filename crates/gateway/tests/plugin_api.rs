//! Integration tests for the plugin RPC and admin surfaces.

use std::{
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use {async_trait::async_trait, tokio::net::TcpListener, tokio::sync::Mutex};

use {
    moqlink_broker::{Broker, Error as BrokerError, Result as BrokerResult},
    moqlink_config::HostConfig,
    moqlink_gateway::{GatewayState, build_admin_app, build_plugin_app},
    moqlink_liaison::{ChannelManager, CommandDispatcher, RegistrationManager},
    moqlink_protocol::PluginIdentity,
};

#[derive(Default)]
struct RecordingBroker {
    running: AtomicBool,
    published: Mutex<Vec<(String, Vec<u8>, u8)>>,
}

#[async_trait]
impl Broker for RecordingBroker {
    async fn start(&self) -> BrokerResult<()> {
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> BrokerResult<()> {
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    async fn uptime(&self) -> Duration {
        Duration::ZERO
    }

    async fn publish(&self, topic: &str, payload: &[u8], qos: u8) -> BrokerResult<()> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(BrokerError::NotRunning);
        }
        self.published
            .lock()
            .await
            .push((topic.to_string(), payload.to_vec(), qos));
        Ok(())
    }
}

fn test_state(broker: Arc<RecordingBroker>) -> GatewayState {
    let channel = Arc::new(ChannelManager::new(HostConfig {
        url: "http://127.0.0.1:9".into(),
        ..HostConfig::default()
    }));
    let registration = Arc::new(RegistrationManager::new(
        PluginIdentity {
            name: "edge-mqtt".into(),
            version: "1.0.0".into(),
            kind: "mqtt-broker".into(),
            description: String::new(),
            host: "127.0.0.1".into(),
            port: 8085,
        },
        channel,
    ));
    let dispatcher = Arc::new(CommandDispatcher::new(
        Arc::clone(&broker) as Arc<dyn Broker>
    ));
    GatewayState::new(
        broker,
        dispatcher,
        registration,
        Duration::from_secs(10),
    )
}

async fn start_plugin_server(broker: Arc<RecordingBroker>) -> SocketAddr {
    let app = build_plugin_app(test_state(broker));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn start_admin_server(broker: Arc<RecordingBroker>) -> SocketAddr {
    let app = build_admin_app(test_state(broker));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

#[tokio::test]
async fn status_before_registration_reports_stopped() {
    let addr = start_plugin_server(Arc::new(RecordingBroker::default())).await;

    let body: serde_json::Value = reqwest::get(format!("http://{addr}/v1/plugin/status"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["status"], "STOPPED");
    assert_eq!(body["uptime"], 0);
    assert!(body.get("pluginId").is_none());
}

#[tokio::test]
async fn heartbeat_echoes_with_server_time() {
    let addr = start_plugin_server(Arc::new(RecordingBroker::default())).await;

    let client = reqwest::Client::new();
    let body: serde_json::Value = client
        .post(format!("http://{addr}/v1/plugin/heartbeat"))
        .json(&serde_json::json!({"pluginId": "p-1", "statusInfo": "RUNNING"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["received"], true);
    assert!(body["serverTime"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn intercepted_start_and_stop_drive_the_broker() {
    let broker = Arc::new(RecordingBroker::default());
    let addr = start_plugin_server(Arc::clone(&broker)).await;
    let client = reqwest::Client::new();

    let body: serde_json::Value = client
        .post(format!("http://{addr}/v1/plugin/command"))
        .json(&serde_json::json!({"command": "start"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["success"], true);
    assert!(broker.running.load(Ordering::SeqCst));

    let body: serde_json::Value = client
        .post(format!("http://{addr}/v1/plugin/command"))
        .json(&serde_json::json!({"command": "stop"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["success"], true);
    assert!(!broker.running.load(Ordering::SeqCst));
}

#[tokio::test]
async fn intercepted_publish_requires_topic() {
    let broker = Arc::new(RecordingBroker::default());
    broker.running.store(true, Ordering::SeqCst);
    let addr = start_plugin_server(Arc::clone(&broker)).await;
    let client = reqwest::Client::new();

    let body: serde_json::Value = client
        .post(format!("http://{addr}/v1/plugin/command"))
        .json(&serde_json::json!({"command": "publish", "parameters": {"message": "m"}}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["success"], false);
    assert!(
        body["errorMessage"]
            .as_str()
            .unwrap()
            .contains("topic must not be empty")
    );
    assert!(broker.published.lock().await.is_empty());
}

#[tokio::test]
async fn intercepted_publish_reaches_the_broker() {
    let broker = Arc::new(RecordingBroker::default());
    broker.running.store(true, Ordering::SeqCst);
    let addr = start_plugin_server(Arc::clone(&broker)).await;
    let client = reqwest::Client::new();

    let body: serde_json::Value = client
        .post(format!("http://{addr}/v1/plugin/command"))
        .json(&serde_json::json!({
            "command": "publish",
            "parameters": {"topic": "sensors/1", "message": "on", "qos": "7"}
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["success"], true);
    let published = broker.published.lock().await;
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].0, "sensors/1");
    assert_eq!(published[0].2, 0); // qos "7" coerced
}

#[tokio::test]
async fn unknown_command_is_a_structured_failure() {
    let addr = start_plugin_server(Arc::new(RecordingBroker::default())).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("http://{addr}/v1/plugin/command"))
        .json(&serde_json::json!({"command": "frobnicate"}))
        .send()
        .await
        .unwrap();
    // Errors are data, never transport-level failures.
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert!(body["errorMessage"].as_str().unwrap().contains("frobnicate"));
}

#[tokio::test]
async fn restart_round_trips_through_the_dispatcher() {
    let broker = Arc::new(RecordingBroker::default());
    broker.running.store(true, Ordering::SeqCst);
    let addr = start_plugin_server(Arc::clone(&broker)).await;
    let client = reqwest::Client::new();

    let body: serde_json::Value = client
        .post(format!("http://{addr}/v1/plugin/command"))
        .json(&serde_json::json!({"command": "restart"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["success"], true);
    assert!(broker.running.load(Ordering::SeqCst));
}

#[tokio::test]
async fn admin_status_snapshot_never_requires_host() {
    let addr = start_admin_server(Arc::new(RecordingBroker::default())).await;

    let body: serde_json::Value = reqwest::get(format!("http://{addr}/api/mqtt/status"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["running"], false);
    assert_eq!(body["uptime"], 0);
}

#[tokio::test]
async fn admin_publish_is_fire_and_forget() {
    let broker = Arc::new(RecordingBroker::default());
    let addr = start_admin_server(Arc::clone(&broker)).await;
    let client = reqwest::Client::new();

    // Broker is stopped, so the publish fails internally; the response is
    // still the fixed success shape.
    let body: serde_json::Value = client
        .post(format!(
            "http://{addr}/api/mqtt/publish?topic=alerts&message=hi&qos=1"
        ))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["status"], "success");
    assert!(
        body["message"]
            .as_str()
            .unwrap()
            .contains("alerts")
    );
}
