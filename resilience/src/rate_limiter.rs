//! Sliding-window rate limiter for outbound requests.
//!
//! Keeps a FIFO of admission timestamps. `wait()` purges entries older than
//! the window and, when the FIFO is full, sleeps until the oldest falls out
//! before recording the new admission.

use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Sliding-window admission controller. Default: 8 requests per second.
#[derive(Debug)]
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    // The mutex is held across the sleep so concurrent callers are admitted
    // one at a time, in arrival order.
    admissions: Mutex<VecDeque<Instant>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(8, Duration::from_secs(1))
    }
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests: max_requests.max(1),
            window,
            admissions: Mutex::new(VecDeque::new()),
        }
    }

    /// Block until the current request fits inside the window, then record it.
    pub async fn wait(&self) {
        let mut admissions = self.admissions.lock().await;

        let now = Instant::now();
        Self::purge(&mut admissions, now, self.window);

        if admissions.len() >= self.max_requests {
            if let Some(oldest) = admissions.front().copied() {
                let wake_at = oldest + self.window;
                let sleep_for = wake_at.saturating_duration_since(now);
                if !sleep_for.is_zero() {
                    debug!(sleep_ms = sleep_for.as_millis() as u64, "rate limit window full, waiting");
                    tokio::time::sleep(sleep_for).await;
                }
            }
            Self::purge(&mut admissions, Instant::now(), self.window);
        }

        admissions.push_back(Instant::now());
    }

    /// Number of admissions currently inside the window.
    pub async fn in_flight(&self) -> usize {
        let mut admissions = self.admissions.lock().await;
        Self::purge(&mut admissions, Instant::now(), self.window);
        admissions.len()
    }

    fn purge(admissions: &mut VecDeque<Instant>, now: Instant, window: Duration) {
        while let Some(front) = admissions.front() {
            if now.duration_since(*front) > window {
                admissions.pop_front();
            } else {
                break;
            }
        }
    }
}
