//! Global concurrency cap plus per-host pacing.
//!
//! Acquisition order is global semaphore first, then the per-host bucket.
//! Both are released when the permit drops. Acquisition is bounded by a
//! scan-wide deadline; hitting it surfaces as `timeout`.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::{TransportError, TransportResult};

type HostLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Controller configuration.
#[derive(Debug, Clone)]
pub struct LimiterConfig {
    /// Global outbound concurrency cap, clamped to 1..=64
    pub global_limit: usize,
    /// Per-host sustained rate, requests per second
    pub per_host_rps: u32,
    /// Per-host burst
    pub per_host_burst: u32,
    /// Deadline for a single acquisition
    pub acquire_deadline: Duration,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            global_limit: 6,
            per_host_rps: 2,
            per_host_burst: 4,
            acquire_deadline: Duration::from_secs(90),
        }
    }
}

impl LimiterConfig {
    pub fn with_global_limit(mut self, limit: usize) -> Self {
        self.global_limit = limit;
        self
    }

    pub fn with_per_host_rate(mut self, rps: u32, burst: u32) -> Self {
        self.per_host_rps = rps;
        self.per_host_burst = burst;
        self
    }
}

/// Held for the duration of one outbound request. Dropping it releases
/// the global slot; the host bucket replenishes on its own clock.
pub struct Permit {
    _global: OwnedSemaphorePermit,
}

/// Two-layer rate/concurrency controller shared by every outbound request
/// in the core.
pub struct RateController {
    global: Arc<Semaphore>,
    hosts: HostLimiter,
    deadline: Duration,
}

impl RateController {
    pub fn new(config: &LimiterConfig) -> Self {
        let global_limit = config.global_limit.clamp(1, 64);
        let rps = NonZeroU32::new(config.per_host_rps).unwrap_or(nonzero!(1u32));
        let burst = NonZeroU32::new(config.per_host_burst).unwrap_or(rps);
        let quota = Quota::per_second(rps).allow_burst(burst);

        Self {
            global: Arc::new(Semaphore::new(global_limit)),
            hosts: RateLimiter::keyed(quota),
            deadline: config.acquire_deadline,
        }
    }

    /// Acquire the global slot and then the host bucket, suspending until
    /// both are available or the deadline fires.
    pub async fn acquire(&self, host: &str) -> TransportResult<Permit> {
        let host = host.to_ascii_lowercase();
        let global = Arc::clone(&self.global);

        tokio::time::timeout(self.deadline, async move {
            let permit = global
                .acquire_owned()
                .await
                .map_err(|_| TransportError::Cancelled)?;
            self.hosts.until_key_ready(&host).await;
            Ok(Permit { _global: permit })
        })
        .await
        .map_err(|_| TransportError::AcquireDeadline)?
    }

    /// Slots currently available under the global cap.
    pub fn available(&self) -> usize {
        self.global.available_permits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn test_global_cap_limits_concurrency() {
        let controller = RateController::new(&LimiterConfig::default().with_global_limit(2));

        let _a = controller.acquire("a.example").await.unwrap();
        let _b = controller.acquire("b.example").await.unwrap();
        assert_eq!(controller.available(), 0);

        drop(_a);
        assert_eq!(controller.available(), 1);
    }

    #[tokio::test]
    async fn test_per_host_pacing_beyond_burst() {
        // burst 2 at 2 rps: the third acquisition on one host must wait
        let config = LimiterConfig::default()
            .with_global_limit(8)
            .with_per_host_rate(2, 2);
        let controller = RateController::new(&config);

        let start = Instant::now();
        for _ in 0..3 {
            let permit = controller.acquire("one.example").await.unwrap();
            drop(permit);
        }
        assert!(
            start.elapsed() >= Duration::from_millis(400),
            "third request should have been paced: {:?}",
            start.elapsed()
        );
    }

    #[tokio::test]
    async fn test_distinct_hosts_do_not_share_buckets() {
        let config = LimiterConfig::default()
            .with_global_limit(8)
            .with_per_host_rate(1, 1);
        let controller = RateController::new(&config);

        let start = Instant::now();
        drop(controller.acquire("a.example").await.unwrap());
        drop(controller.acquire("b.example").await.unwrap());
        drop(controller.acquire("c.example").await.unwrap());
        assert!(start.elapsed() < Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_deadline_surfaces_timeout() {
        let mut config = LimiterConfig::default().with_global_limit(1);
        config.acquire_deadline = Duration::from_secs(1);
        let controller = Arc::new(RateController::new(&config));

        let held = controller.acquire("a.example").await.unwrap();
        let pending = {
            let controller = Arc::clone(&controller);
            tokio::spawn(async move { controller.acquire("a.example").await.map(|_| ()) })
        };

        tokio::time::sleep(Duration::from_secs(2)).await;
        let outcome = pending.await.unwrap();
        assert!(matches!(outcome, Err(TransportError::AcquireDeadline)));
        drop(held);
    }

    #[test]
    fn test_global_limit_is_clamped() {
        let controller = RateController::new(&LimiterConfig::default().with_global_limit(500));
        assert_eq!(controller.available(), 64);
    }
}
