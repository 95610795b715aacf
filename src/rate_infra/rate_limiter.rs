use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Spaces outbound requests to one upstream provider evenly in time.
///
/// Unlike a windowed counter this never bursts: each `acquire` waits until
/// `interval` has passed since the previous permit was handed out.
pub struct RateLimiter {
    name: String,
    interval: Duration,
    last_permit: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(name: impl Into<String>, interval: Duration) -> Self {
        RateLimiter {
            name: name.into(),
            interval,
            last_permit: Mutex::new(None),
        }
    }

    /// Non-positive rates disable limiting.
    pub fn per_second(name: impl Into<String>, operations_per_second: f64) -> Self {
        let interval = if operations_per_second > 0.0 && operations_per_second.is_finite() {
            Duration::from_secs_f64(1.0 / operations_per_second)
        } else {
            Duration::ZERO
        };
        RateLimiter::new(name, interval)
    }

    pub async fn acquire(&self) {
        let mut last = self.last_permit.lock().await;

        if let Some(previous) = *last {
            let next_allowed = previous + self.interval;
            let now = Instant::now();
            if next_allowed > now {
                let wait = next_allowed - now;
                tracing::debug!(
                    limiter = %self.name,
                    wait_ms = wait.as_millis() as u64,
                    "Waiting before next upstream request"
                );
                tokio::time::sleep(wait).await;
            }
        }

        *last = Some(Instant::now());
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_permit_is_immediate() {
        let limiter = RateLimiter::new("test", Duration::from_secs(60));
        let started = Instant::now();
        limiter.acquire().await;
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_permits_are_spaced() {
        let limiter = RateLimiter::new("test", Duration::from_millis(50));
        let started = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        limiter.acquire().await;
        assert!(started.elapsed() >= Duration::from_millis(100));
    }

    #[test]
    fn test_zero_rate_disables_limiting() {
        assert_eq!(RateLimiter::per_second("off", 0.0).interval(), Duration::ZERO);
        assert_eq!(
            RateLimiter::per_second("two", 2.0).interval(),
            Duration::from_millis(500)
        );
    }
}
