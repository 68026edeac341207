//! Token-bucket rate limiter for outbound Shopify calls.
//!
//! Shopify's REST Admin API enforces a leaky-bucket quota per store. This
//! limiter keeps us under it proactively: tokens accumulate at a fixed rate
//! up to a capacity, and every outbound call consumes one, sleeping until a
//! token is available if the bucket is empty.
//!
//! The limiter must be a single shared instance per store - it lives inside
//! the one `ShopifyClient` that the gateway, queue processor, and healer all
//! clone. Constructing a second limiter defeats the quota.

use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

/// Token-bucket rate limiter.
pub struct RateLimiter {
    capacity: f64,
    refill_per_sec: f64,
    state: Mutex<BucketState>,
}

struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

impl RateLimiter {
    /// Create a limiter with the given capacity and refill rate.
    ///
    /// The bucket starts full, so a burst of up to `capacity` calls passes
    /// without waiting.
    #[must_use]
    pub fn new(capacity: u32, refill_per_sec: f64) -> Self {
        Self {
            capacity: f64::from(capacity),
            refill_per_sec: refill_per_sec.max(f64::MIN_POSITIVE),
            state: Mutex::new(BucketState {
                tokens: f64::from(capacity),
                last_refill: Instant::now(),
            }),
        }
    }

    /// Consume one token, sleeping until one is available.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut state = self.state.lock().await;
                let now = Instant::now();
                let elapsed = now.duration_since(state.last_refill).as_secs_f64();
                state.tokens = (state.tokens + elapsed * self.refill_per_sec).min(self.capacity);
                state.last_refill = now;

                if state.tokens >= 1.0 {
                    state.tokens -= 1.0;
                    return;
                }

                // Time until the next whole token accumulates.
                Duration::from_secs_f64((1.0 - state.tokens) / self.refill_per_sec)
            };

            tokio::time::sleep(wait).await;
        }
    }
}
