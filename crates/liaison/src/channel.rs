//! Control channel lifecycle: creation, invalidation, teardown.
//!
//! The channel handle is the only route to the host; consumers must fetch it
//! through [`ChannelManager::ensure`] on every use and never cache it across
//! calls, so nobody holds a stale handle after a rebuild.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use {
    tokio::sync::{Mutex, RwLock},
    tracing::{info, warn},
};

use {
    crate::{
        error::{Error, Result},
        host_client::HostChannel,
    },
    moqlink_config::HostConfig,
};

/// Result of [`ChannelManager::ensure`]: the live handle, and whether this
/// call built it.
pub struct Ensured {
    pub channel: Arc<HostChannel>,
    pub rebuilt: bool,
}

#[derive(Default)]
struct ChannelState {
    handle: Option<Arc<HostChannel>>,
    last_error: Option<String>,
}

pub struct ChannelManager {
    cfg: HostConfig,
    state: RwLock<ChannelState>,
    /// Single-flight guard: concurrent callers converge on one rebuild
    /// instead of stampeding the host.
    rebuild: Mutex<()>,
    generation: AtomicU64,
}

impl ChannelManager {
    pub fn new(cfg: HostConfig) -> Self {
        Self {
            cfg,
            state: RwLock::new(ChannelState::default()),
            rebuild: Mutex::new(()),
            generation: AtomicU64::new(0),
        }
    }

    /// Whether a usable handle currently exists.
    pub async fn is_open(&self) -> bool {
        self.state.read().await.handle.is_some()
    }

    /// Number of handles built over the manager's lifetime.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Last transport failure recorded by [`invalidate`](Self::invalidate).
    pub async fn last_error(&self) -> Option<String> {
        self.state.read().await.last_error.clone()
    }

    /// Return the live handle, building one if absent.
    pub async fn ensure(&self) -> Result<Ensured> {
        if let Some(handle) = self.state.read().await.handle.clone() {
            return Ok(Ensured {
                channel: handle,
                rebuilt: false,
            });
        }

        let _flight = self.rebuild.lock().await;
        // Another caller may have rebuilt while we waited for the guard.
        if let Some(handle) = self.state.read().await.handle.clone() {
            return Ok(Ensured {
                channel: handle,
                rebuilt: false,
            });
        }

        let channel = Arc::new(HostChannel::connect(&self.cfg)?);
        self.generation.fetch_add(1, Ordering::SeqCst);
        {
            let mut state = self.state.write().await;
            state.handle = Some(Arc::clone(&channel));
            state.last_error = None;
        }
        info!(url = %self.cfg.url, "control channel established");

        Ok(Ensured {
            channel,
            rebuilt: true,
        })
    }

    /// Mark the current handle unusable. Does not reconnect; the next
    /// `ensure` call rebuilds lazily.
    pub async fn invalidate(&self, reason: &Error) {
        let mut state = self.state.write().await;
        if state.handle.take().is_some() {
            warn!(error = %reason, "control channel marked unusable");
        }
        state.last_error = Some(reason.to_string());
    }

    /// Tear down the channel, waiting up to `grace` for in-flight requests
    /// before forcing the drop.
    pub async fn close(&self, grace: Duration) {
        let handle = self.state.write().await.handle.take();
        let Some(handle) = handle else { return };

        let deadline = Instant::now() + grace;
        while handle.in_flight() > 0 && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        if handle.in_flight() > 0 {
            warn!(
                in_flight = handle.in_flight(),
                "closing control channel with requests still in flight"
            );
        }
        info!("control channel closed");
    }
}
