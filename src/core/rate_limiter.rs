//! Sliding-window request limiter keyed by `(route, client)`.
//!
//! The store is an explicit object shared through `Arc`; each key's
//! prune-check-append runs under that key's map entry lock, so two requests
//! for the same key can never both see the last free slot. A background
//! sweeper removes keys whose requests have all aged past both their window
//! and a cleanup horizon.

use crate::domain::ports::Clock;
use dashmap::DashMap;
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

pub const UNKNOWN_CLIENT: &str = "unknown";

/// `max_requests` per trailing `window_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitPolicy {
    pub max_requests: u32,
    pub window_ms: u64,
}

impl RateLimitPolicy {
    pub const fn new(max_requests: u32, window_ms: u64) -> Self {
        Self {
            max_requests,
            window_ms,
        }
    }

    /// Strict policy used for admin login.
    pub const fn admin_login() -> Self {
        Self::new(5, 60_000)
    }

    pub const fn chat() -> Self {
        Self::new(20, 60_000)
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RateLimitKey {
    pub route: String,
    pub client: String,
}

impl RateLimitKey {
    pub fn new(route: impl Into<String>, client: impl Into<String>) -> Self {
        Self {
            route: route.into(),
            client: client.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed { remaining: u32 },
    Limited { retry_after: Duration },
}

impl RateLimitDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitDecision::Allowed { .. })
    }
}

/// Client identity from `x-forwarded-for` (first hop), then `x-real-ip`.
pub fn client_identity(headers: &HeaderMap) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    let real_ip = || {
        headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    forwarded
        .or_else(real_ip)
        .unwrap_or(UNKNOWN_CLIENT)
        .to_string()
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        chrono::Utc::now().timestamp_millis().max(0) as u64
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicU64,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now_ms: AtomicU64::new(start_ms),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now_ms.fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn set(&self, now_ms: u64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

/// Request instants for one key, oldest first, with the window of the
/// policy that last checked it.
#[derive(Debug, Default)]
struct RequestLog {
    window_ms: u64,
    timestamps: VecDeque<u64>,
}

impl RequestLog {
    /// Idle once the newest request is older than both the key's own window
    /// and `horizon_ms`.
    fn is_idle(&self, now_ms: u64, horizon_ms: u64) -> bool {
        self.timestamps
            .back()
            .map_or(true, |&newest| now_ms.saturating_sub(newest) >= horizon_ms.max(self.window_ms))
    }
}

#[derive(Debug, Default)]
pub struct RateLimitStore {
    entries: DashMap<RateLimitKey, RequestLog>,
}

impl RateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Requests currently recorded for `key`, without pruning.
    pub fn recorded(&self, key: &RateLimitKey) -> usize {
        self.entries.get(key).map(|e| e.timestamps.len()).unwrap_or(0)
    }

    /// Removes keys with no request inside their window or `horizon_ms`.
    /// Kept keys are not trimmed; only [`RateLimiter::check`] prunes.
    /// Returns the number of keys removed.
    pub fn sweep(&self, now_ms: u64, horizon_ms: u64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, log| !log.is_idle(now_ms, horizon_ms));
        before.saturating_sub(self.entries.len())
    }
}

fn prune(timestamps: &mut VecDeque<u64>, now_ms: u64, window_ms: u64) {
    while let Some(&oldest) = timestamps.front() {
        if now_ms.saturating_sub(oldest) >= window_ms {
            timestamps.pop_front();
        } else {
            break;
        }
    }
}

#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<RateLimitStore>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(store: Arc<RateLimitStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn with_system_clock(store: Arc<RateLimitStore>) -> Self {
        Self::new(store, Arc::new(SystemClock))
    }

    pub fn store(&self) -> &Arc<RateLimitStore> {
        &self.store
    }

    pub fn check(&self, key: &RateLimitKey, policy: &RateLimitPolicy) -> RateLimitDecision {
        let now = self.clock.now_ms();
        let mut entry = self.store.entries.entry(key.clone()).or_default();
        let log = entry.value_mut();
        log.window_ms = policy.window_ms;
        let timestamps = &mut log.timestamps;

        prune(timestamps, now, policy.window_ms);

        if timestamps.len() >= policy.max_requests as usize {
            tracing::warn!(
                "Rate limit hit for {} from {} ({} in {}ms)",
                key.route,
                key.client,
                timestamps.len(),
                policy.window_ms
            );
            return RateLimitDecision::Limited {
                retry_after: policy.window(),
            };
        }

        timestamps.push_back(now);
        RateLimitDecision::Allowed {
            remaining: policy.max_requests - timestamps.len() as u32,
        }
    }

    pub fn check_request(&self, route: &str, headers: &HeaderMap, policy: &RateLimitPolicy) -> RateLimitDecision {
        let key = RateLimitKey::new(route, client_identity(headers));
        self.check(&key, policy)
    }

    pub fn sweep(&self, horizon: Duration) -> usize {
        let removed = self.store.sweep(self.clock.now_ms(), horizon.as_millis() as u64);
        if removed > 0 {
            tracing::debug!("Rate limit sweep removed {} idle keys", removed);
        }
        removed
    }

    /// Starts the periodic sweep. Stop it with [`SweeperHandle::shutdown`].
    pub fn spawn_sweeper(&self, interval: Duration, horizon: Duration) -> SweeperHandle {
        let limiter = self.clone();
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // the first tick completes immediately
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        limiter.sweep(horizon);
                    }
                    _ = &mut shutdown_rx => {
                        tracing::debug!("Rate limit sweeper stopped");
                        break;
                    }
                }
            }
        });

        SweeperHandle {
            shutdown: Some(shutdown_tx),
            task,
        }
    }
}

pub struct SweeperHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Err(e) = (&mut self.task).await {
            tracing::warn!("Rate limit sweeper ended abnormally: {}", e);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        if self.shutdown.is_some() {
            self.task.abort();
        }
    }
}
