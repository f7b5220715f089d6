use dashmap::{DashMap, mapref::entry::Entry};
use std::sync::Arc;
use tokio::time::{Duration, Instant, interval_at};
use tracing::{debug, info, warn};

use crate::metrics::TRACKED_CLIENTS;

// Per-client counter for the current window
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RateCounter {
    pub count: u32,
    pub idle_windows: u32, // consecutive resets with no traffic
}

/// Fixed-window limiter keyed by client IP.
///
/// All counters go back to zero together when [`RateLimiter::reset`] runs, so a
/// burst straddling a window boundary can reach twice the threshold.
pub struct RateLimiter {
    counters: DashMap<String, RateCounter>,
    threshold: u32,         // max requests per window
    max_idle_windows: u32,  // evict after this many empty windows
}

impl RateLimiter {
    pub fn new(threshold: u32, max_idle_windows: u32) -> Self {
        Self {
            counters: DashMap::new(),
            threshold,
            max_idle_windows: max_idle_windows.max(1),
        }
    }

    // Count this request, then decide. The shard lock held by `entry` makes
    // increment-and-compare atomic per client.
    pub fn check_and_record(&self, client_id: &str) -> bool {
        let mut entry = match self.counters.entry(client_id.to_string()) {
            Entry::Occupied(entry) => entry.into_ref(),
            Entry::Vacant(entry) => {
                TRACKED_CLIENTS.inc();
                entry.insert(RateCounter::default())
            }
        };

        entry.count = entry.count.saturating_add(1);
        let allowed = entry.count <= self.threshold;

        if !allowed {
            warn!(client = client_id, count = entry.count, "rate limit exceeded");
        }
        allowed
    }

    pub fn count(&self, client_id: &str) -> Option<u32> {
        self.counters.get(client_id).map(|entry| entry.count)
    }

    pub fn tracked_clients(&self) -> usize {
        self.counters.len()
    }

    // Window boundary: zero every counter and drop clients idle for too long.
    // Reset and eviction share one pass under each shard lock.
    pub fn reset(&self) {
        let max_idle = self.max_idle_windows;
        let mut evicted = 0usize;

        self.counters.retain(|_, counter| {
            counter.idle_windows = if counter.count == 0 {
                counter.idle_windows + 1
            } else {
                0
            };
            counter.count = 0;

            let keep = counter.idle_windows < max_idle;
            if !keep {
                evicted += 1;
            }
            keep
        });

        TRACKED_CLIENTS.sub(evicted as f64);
        debug!(
            tracked = self.counters.len(),
            evicted, "rate limit window reset"
        );
    }
}

// Background reset loop. First reset happens one full window after start.
pub async fn reset_task(limiter: Arc<RateLimiter>, window: Duration) {
    let mut interval = interval_at(Instant::now() + window, window);

    info!("Rate limit reset task started (window: {:?})", window);

    loop {
        interval.tick().await;
        limiter.reset();
    }
}
