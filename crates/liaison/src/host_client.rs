//! HTTP client for the host control API.
//!
//! One `HostChannel` is one logical control channel: a pooled HTTP client
//! pinned to the host base URL. Every call carries an explicit deadline;
//! a hung host must never stall the heartbeat loop.

use std::{
    sync::atomic::{AtomicUsize, Ordering},
    time::{Duration, Instant},
};

use {
    serde::{Serialize, de::DeserializeOwned},
    tracing::debug,
};

use {
    crate::error::{Error, Result},
    moqlink_config::HostConfig,
    moqlink_protocol::{
        FindPluginByNameRequest, FindPluginByNameResponse, HeartbeatRequest, HeartbeatResponse,
        PluginIdentity, RegisterPluginResponse, StatusRequest, StatusResponse, StopPluginRequest,
        StopPluginResponse, UpdatePluginRequest, UpdatePluginResponse,
    },
};

/// How long idle pooled connections are kept when keepalive is off.
const IDLE_POOL_TIMEOUT: Duration = Duration::from_secs(10);
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);

pub struct HostChannel {
    http: reqwest::Client,
    base: String,
    request_timeout: Duration,
    max_response_bytes: usize,
    opened_at: Instant,
    in_flight: AtomicUsize,
}

impl HostChannel {
    /// Build a channel from config. This does not touch the network; HTTP
    /// connections are established lazily per call.
    pub fn connect(cfg: &HostConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(cfg.request_timeout_secs));
        // Keepalive is a deployment tunable, off by default: aggressive
        // probes have caused reconnect storms against some hosts.
        if cfg.keepalive {
            builder = builder.tcp_keepalive(KEEPALIVE_INTERVAL);
        } else {
            builder = builder
                .tcp_keepalive(Option::<Duration>::None)
                .pool_idle_timeout(IDLE_POOL_TIMEOUT);
        }
        let http = builder.build()?;

        Ok(Self {
            http,
            base: cfg.url.trim_end_matches('/').to_string(),
            request_timeout: Duration::from_secs(cfg.request_timeout_secs),
            max_response_bytes: cfg.max_response_bytes,
            opened_at: Instant::now(),
            in_flight: AtomicUsize::new(0),
        })
    }

    pub fn opened_at(&self) -> Instant {
        self.opened_at
    }

    /// Number of requests currently awaiting a host response.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    // ── Host operations ─────────────────────────────────────────────────

    pub async fn find_plugin_by_name(&self, name: &str) -> Result<FindPluginByNameResponse> {
        self.post("find-by-name", &FindPluginByNameRequest {
            name: name.to_string(),
        })
        .await
    }

    pub async fn register_plugin(&self, identity: &PluginIdentity) -> Result<RegisterPluginResponse> {
        self.post("register", identity).await
    }

    pub async fn update_plugin(&self, req: &UpdatePluginRequest) -> Result<UpdatePluginResponse> {
        self.post("update", req).await
    }

    pub async fn heartbeat(&self, plugin_id: &str, status_info: &str) -> Result<HeartbeatResponse> {
        self.post("heartbeat", &HeartbeatRequest {
            plugin_id: plugin_id.to_string(),
            status_info: status_info.to_string(),
        })
        .await
    }

    pub async fn get_status(&self, plugin_id: &str) -> Result<StatusResponse> {
        self.post("status", &StatusRequest {
            plugin_id: plugin_id.to_string(),
        })
        .await
    }

    pub async fn stop_plugin(&self, plugin_id: &str) -> Result<StopPluginResponse> {
        self.post("stop", &StopPluginRequest {
            plugin_id: plugin_id.to_string(),
        })
        .await
    }

    // ── Plumbing ────────────────────────────────────────────────────────

    async fn post<B, R>(&self, op: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}/v1/plugins/{op}", self.base);
        debug!(op = %op, "host call");

        let _guard = FlightGuard::enter(&self.in_flight);
        let resp = self
            .http
            .post(&url)
            .timeout(self.request_timeout)
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        let bytes = resp.bytes().await?;
        if bytes.len() > self.max_response_bytes {
            return Err(Error::ResponseTooLarge {
                limit: self.max_response_bytes,
            });
        }
        if !status.is_success() {
            let message: String = String::from_utf8_lossy(&bytes).trim().chars().take(256).collect();
            return Err(Error::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        Ok(serde_json::from_slice(&bytes)?)
    }
}

struct FlightGuard<'a>(&'a AtomicUsize);

impl<'a> FlightGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
