use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::error::BootstrapError;

/// Caps the number of distinct IPs tracked at once, evicted opportunistically
/// on `check`, the same shape as the corpus's fixed-window limiter.
const MAX_TRACKED_IPS: usize = 10_000;

/// Sliding-window rate limiter keyed by client IP: at most `max_requests`
/// successful creations per `window` per IP. In-memory, per-process — see
/// the spec's open question on multi-process deployment.
pub struct BootstrapRateLimiter {
    max_requests: u32,
    window: Duration,
    buckets: Mutex<HashMap<IpAddr, VecDeque<Instant>>>,
}

impl BootstrapRateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Records and checks one attempt for `ip`. Rejects without recording
    /// if the rolling window is already at capacity.
    pub fn check(&self, ip: IpAddr) -> Result<(), BootstrapError> {
        let now = Instant::now();
        let mut buckets = self.buckets.lock().expect("rate limiter state poisoned");

        if buckets.len() > MAX_TRACKED_IPS {
            buckets.retain(|_, bucket| {
                bucket.back().map(|&last| now.duration_since(last) <= self.window).unwrap_or(false)
            });
        }

        let bucket = buckets.entry(ip).or_default();
        while let Some(&oldest) = bucket.front() {
            if now.duration_since(oldest) > self.window {
                bucket.pop_front();
            } else {
                break;
            }
        }

        if bucket.len() as u32 >= self.max_requests {
            return Err(BootstrapError::RateLimited);
        }

        bucket.push_back(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip() -> IpAddr {
        "127.0.0.1".parse().unwrap()
    }

    #[test]
    fn allows_up_to_the_limit_then_rejects() {
        let limiter = BootstrapRateLimiter::new(5, Duration::from_secs(60));
        for _ in 0..5 {
            assert!(limiter.check(ip()).is_ok());
        }
        assert!(matches!(limiter.check(ip()), Err(BootstrapError::RateLimited)));
    }

    #[test]
    fn distinct_ips_have_independent_buckets() {
        let limiter = BootstrapRateLimiter::new(1, Duration::from_secs(60));
        assert!(limiter.check("10.0.0.1".parse().unwrap()).is_ok());
        assert!(limiter.check("10.0.0.2".parse().unwrap()).is_ok());
    }

    #[test]
    fn window_expiry_frees_capacity() {
        let limiter = BootstrapRateLimiter::new(1, Duration::from_millis(20));
        assert!(limiter.check(ip()).is_ok());
        assert!(limiter.check(ip()).is_err());
        std::thread::sleep(Duration::from_millis(30));
        assert!(limiter.check(ip()).is_ok());
    }
}
