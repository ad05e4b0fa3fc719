// /mp-checkout/services/checkout-service/src/middleware/rate_limit.rs

use std::{collections::VecDeque, num::NonZeroUsize};
use chrono::{DateTime, Duration, Utc};
use lru::LruCache;
use tokio::sync::RwLock;
use crate::{
    config::RateLimitConfig,
    middleware::admission::{Decision, RejectReason},
};

/// Longest accepted window, one day
pub const MAX_WINDOW_SECONDS: i64 = 86_400;

/// Rate limiter dengan sliding window per client
///
/// Every admitted request leaves a timestamp in its client's window. A check
/// prunes the window to `[now - window, now]`, rejects once the remaining
/// count reaches `max_requests`, and records `now` otherwise. The whole
/// prune-check-append sequence runs under the write lock so concurrent
/// requests from one client cannot overshoot the limit.
///
/// Clients live in an LRU cache bounded by `max_clients`; a new client at
/// capacity evicts the least recently seen one in O(1). Stale clients are
/// only dropped by [`RateLimiter::sweep`], driven by the background scheduler.
///
/// `now` is wall-clock time. If the clock steps backwards a client's `now` is
/// clamped to its latest hit, so its window stays ordered and the step back
/// never frees quota.
pub struct RateLimiter {
    clients: RwLock<LruCache<String, ClientWindow>>,
    max_requests: usize,
    window: Duration,
}

#[derive(Debug, Default)]
struct ClientWindow {
    hits: VecDeque<DateTime<Utc>>,
}

impl ClientWindow {
    fn prune(&mut self, cutoff: DateTime<Utc>) {
        while self.hits.front().is_some_and(|hit| *hit < cutoff) {
            self.hits.pop_front();
        }
    }

    fn is_stale(&self, cutoff: DateTime<Utc>) -> bool {
        self.hits.back().map_or(true, |latest| *latest < cutoff)
    }

    fn latest(&self) -> Option<DateTime<Utc>> {
        self.hits.back().copied()
    }
}

impl RateLimiter {
    /// Create rate limiter baru, window di-clamp ke `1..=MAX_WINDOW_SECONDS`
    pub fn new(max_requests: usize, window_seconds: i64, max_clients: usize) -> Self {
        let capacity = NonZeroUsize::new(max_clients).unwrap_or(NonZeroUsize::MIN);
        Self {
            clients: RwLock::new(LruCache::new(capacity)),
            max_requests,
            window: Duration::seconds(window_seconds.clamp(1, MAX_WINDOW_SECONDS)),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.max_requests, config.window_seconds, config.max_clients)
    }

    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    pub fn window_seconds(&self) -> i64 {
        self.window.num_seconds()
    }

    fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_sub_signed(self.window).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Check rate limit untuk satu client pada waktu `now`
    pub async fn check(&self, client_id: &str, now: DateTime<Utc>) -> Decision {
        let mut clients = self.clients.write().await;

        if !clients.contains(client_id) && clients.len() >= clients.cap().get() {
            if let Some((evicted, _)) = clients.pop_lru() {
                tracing::debug!("Rate limiter at capacity, evicting least recently seen client {}", evicted);
            }
        }

        let window = clients.get_or_insert_mut(client_id.to_string(), ClientWindow::default);
        let now = window.latest().map_or(now, |latest| latest.max(now));
        window.prune(self.cutoff(now));

        if window.hits.len() >= self.max_requests {
            return Decision::Reject(RejectReason::RateLimited {
                limit: self.max_requests,
                window_seconds: self.window.num_seconds(),
            });
        }

        window.hits.push_back(now);
        Decision::Allow
    }

    /// Drop semua client yang window-nya sudah stale, return jumlah yang dihapus
    pub async fn sweep(&self, now: DateTime<Utc>) -> usize {
        let cutoff = self.cutoff(now);
        let mut clients = self.clients.write().await;

        let stale: Vec<String> = clients
            .iter()
            .filter(|(_, window)| window.is_stale(cutoff))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &stale {
            clients.pop(key);
        }
        stale.len()
    }

    /// Jumlah client yang sedang di-track
    pub async fn tracked_clients(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Hits yang masih dihitung untuk client pada waktu `now`
    #[cfg(test)]
    pub async fn hits_in_window(&self, client_id: &str, now: DateTime<Utc>) -> usize {
        let cutoff = self.cutoff(now);
        self.clients
            .read()
            .await
            .peek(client_id)
            .map(|window| window.hits.iter().filter(|hit| **hit >= cutoff).count())
            .unwrap_or(0)
    }
}
