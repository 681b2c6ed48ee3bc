//! Continuous-time-refill token bucket (spec 4.4.3). All timing uses [`MonotonicUs`] so wall
//! clock jumps cannot create bursts.

use control_core::clock::MonotonicUs;

#[derive(Debug)]
pub struct TokenBucket {
    rate_per_sec: f64,
    capacity: f64,
    tokens: f64,
    last_update_us: MonotonicUs,
}

impl TokenBucket {
    pub fn new(rate_per_sec: f64, capacity: f64, now: MonotonicUs) -> Self {
        Self {
            rate_per_sec,
            capacity,
            tokens: capacity,
            last_update_us: now,
        }
    }

    /// Refills based on elapsed monotonic time, then attempts to deduct `k` tokens.
    /// Returns `true` and deducts on success; `false` and leaves the bucket untouched
    /// (beyond the refill) on an empty bucket.
    pub fn consume(&mut self, k: f64, now: MonotonicUs) -> bool {
        let delta_s = now.elapsed_since(self.last_update_us) as f64 / 1_000_000.0;
        self.tokens = (self.tokens + delta_s.max(0.0) * self.rate_per_sec).min(self.capacity);
        self.last_update_us = now;

        if self.tokens >= k {
            self.tokens -= k;
            true
        } else {
            false
        }
    }

    pub fn tokens(&self) -> f64 {
        self.tokens
    }
}
