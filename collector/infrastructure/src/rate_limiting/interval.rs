use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use collector_application::RateLimiter;
use shaku::Component;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Spaces terminal requests by a minimum interval, the way the external
/// terminal's request quota expects.
#[derive(Component)]
#[shaku(interface = RateLimiter)]
pub struct IntervalRateLimiter {
    min_interval: Duration,
    last_pass: Arc<Mutex<Option<Instant>>>,
}

impl IntervalRateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_pass: Arc::new(Mutex::new(None)),
        }
    }
}

#[async_trait]
impl RateLimiter for IntervalRateLimiter {
    async fn acquire(&self) {
        // Holding the lock across the sleep keeps concurrent acquirers
        // spaced out as well.
        let mut last = self.last_pass.lock().await;
        if let Some(prev) = *last {
            let since = prev.elapsed();
            if since < self.min_interval {
                tokio::time::sleep(self.min_interval - since).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_consecutive_acquires_are_spaced() {
        let limiter = IntervalRateLimiter::new(Duration::from_millis(30));

        let started = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        limiter.acquire().await;

        assert!(started.elapsed() >= Duration::from_millis(60));
    }

    #[tokio::test]
    async fn test_first_acquire_does_not_wait() {
        let limiter = IntervalRateLimiter::new(Duration::from_secs(60));

        let started = Instant::now();
        limiter.acquire().await;

        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
