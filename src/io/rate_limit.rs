//! Spacing between requests to the origin server.
//!
//! The limiter hands out start slots `interval` apart. Callers sleep until
//! their slot, so any number of concurrent fetches still reach the server no
//! faster than one per `interval`.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};

/// Enforces a minimum delay between consecutive requests.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_slot: Mutex::new(None),
        }
    }

    /// A limiter that never waits.
    pub fn unlimited() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait until the caller may issue its next request.
    pub async fn acquire(&self) {
        if self.interval.is_zero() {
            return;
        }

        let slot = {
            let mut next = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = match *next {
                Some(t) if t > now => t,
                _ => now,
            };
            *next = Some(slot + self.interval);
            slot
        };

        sleep_until(slot).await;
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::unlimited()
    }
}
