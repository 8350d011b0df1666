//! Global request-rate ceiling shared by all probe workers.

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;

/// Token-bucket limiter enforcing one ceiling across every worker.
///
/// Workers wait for a permit; requests are never dropped to honor the limit.
pub struct ProbeRateLimiter {
    limiter: DefaultDirectRateLimiter,
    per_second: u32,
}

impl ProbeRateLimiter {
    /// Create a limiter admitting `requests_per_second` across all holders.
    pub fn new(requests_per_second: u32) -> Self {
        let quota = Quota::per_second(
            NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::new(1).unwrap()),
        );

        Self {
            limiter: RateLimiter::direct(quota),
            per_second: requests_per_second,
        }
    }

    /// Wait until the ceiling admits one more request.
    pub async fn acquire(&self) {
        self.limiter.until_ready().await;
    }

    /// Take a permit only if one is available right now.
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }

    /// Configured ceiling.
    pub fn per_second(&self) -> u32 {
        self.per_second
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[test]
    fn limiter_reports_configured_ceiling() {
        let limiter = ProbeRateLimiter::new(25);
        assert_eq!(limiter.per_second(), 25);
    }

    #[test]
    fn zero_rate_falls_back_to_one() {
        let limiter = ProbeRateLimiter::new(0);
        assert_eq!(limiter.per_second(), 0);
        assert!(limiter.try_acquire());
    }

    #[test]
    fn burst_is_bounded_by_quota() {
        let limiter = ProbeRateLimiter::new(2);

        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
    }

    #[tokio::test]
    async fn acquire_waits_out_the_ceiling() {
        let limiter = ProbeRateLimiter::new(10);

        // Drain the burst allowance, then one more permit must take ~100ms
        while limiter.try_acquire() {}
        let start = Instant::now();
        limiter.acquire().await;

        assert!(start.elapsed() >= Duration::from_millis(50));
    }
}
