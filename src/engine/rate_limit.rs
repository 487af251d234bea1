use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::store::StoreError;

/// Expiring per-key counters. The first increment of a key opens its window;
/// later increments inside the window do not extend it.
#[async_trait]
pub trait CounterStore: Send + Sync {
    async fn increment(&self, key: &str, window: Duration) -> Result<u64, StoreError>;
}

#[derive(Debug, Clone, Copy)]
struct WindowCounter {
    count: u64,
    expires_at: Instant,
}

#[derive(Debug, Default)]
pub struct MemoryCounterStore {
    counters: DashMap<String, WindowCounter>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops windows that have already closed. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.counters.len();
        self.counters.retain(|_, counter| counter.expires_at > now);
        before.saturating_sub(self.counters.len())
    }

    pub fn len(&self) -> usize {
        self.counters.len()
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn increment(&self, key: &str, window: Duration) -> Result<u64, StoreError> {
        let now = Instant::now();
        let mut entry = self
            .counters
            .entry(key.to_string())
            .or_insert(WindowCounter {
                count: 0,
                expires_at: now + window,
            });

        if entry.expires_at <= now {
            *entry = WindowCounter {
                count: 0,
                expires_at: now + window,
            };
        }

        entry.count += 1;
        Ok(entry.count)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    Denied,
}

/// Fixed-window limit on delivery creation per actor.
pub struct RateLimiter {
    counters: Arc<dyn CounterStore>,
    max_requests: u64,
    window: Duration,
}

impl RateLimiter {
    pub fn new(counters: Arc<dyn CounterStore>, max_requests: u64, window: Duration) -> Self {
        Self {
            counters,
            max_requests,
            window,
        }
    }

    pub async fn admit(&self, actor_id: Uuid) -> Admission {
        let key = format!("create_delivery:{actor_id}");

        match self.counters.increment(&key, self.window).await {
            Ok(count) if count > self.max_requests => {
                debug!(%actor_id, count, "rate limit exceeded");
                Admission::Denied
            }
            Ok(_) => Admission::Allowed,
            Err(err) => {
                // counter store outage must not block order creation
                warn!(%actor_id, error = %err, "rate limit counter unavailable; admitting");
                Admission::Allowed
            }
        }
    }
}

pub async fn run_counter_sweeper(counters: Arc<MemoryCounterStore>, every: Duration) {
    info!("rate limit sweeper started");

    let mut ticker = tokio::time::interval(every);
    loop {
        ticker.tick().await;
        let purged = counters.purge_expired();
        if purged > 0 {
            debug!(purged, "expired rate limit windows removed");
        }
    }
}
