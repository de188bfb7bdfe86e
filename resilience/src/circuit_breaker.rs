//! Circuit breaker for repeated rate-limit failures.
//!
//! States:
//! - CLOSED: normal operation, requests allowed
//! - OPEN: too many consecutive 429s, all requests refused
//! - HALF_OPEN: timeout elapsed, a bounded number of probes allowed
//!
//! Callers consult [`CircuitBreaker::can_make_request`] before every LLM call
//! and report the outcome with `record_request` / `record_success` /
//! `record_failure`. No task is parked waiting for the OPEN timeout; the next
//! caller tests the clock.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Circuit breaker states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CircuitState {
    /// Normal operation.
    Closed,
    /// Refusing all requests until the timeout elapses.
    Open,
    /// Testing recovery with a bounded number of probes.
    HalfOpen,
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Consecutive 429 failures before opening.
    pub failure_threshold: u32,
    /// Time to wait in OPEN before allowing probes.
    pub timeout: Duration,
    /// Probes allowed (and successes required) in HALF_OPEN.
    pub half_open_max: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            timeout: Duration::from_secs(120),
            half_open_max: 3,
        }
    }
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    failure_count: u32,
    last_failure_at: Option<Instant>,
    half_open_requests: u32,
    half_open_successes: u32,
}

/// Shared gate in front of the LLM provider.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                failure_count: 0,
                last_failure_at: None,
                half_open_requests: 0,
                half_open_successes: 0,
            }),
        }
    }

    /// Whether a request may be issued right now. An OPEN breaker whose
    /// timeout has elapsed transitions to HALF_OPEN and admits the probe.
    pub fn can_make_request(&self) -> bool {
        let mut inner = self.inner.lock();

        match inner.state {
            CircuitState::Open => {
                let elapsed = inner
                    .last_failure_at
                    .map(|at| at.elapsed() >= self.config.timeout)
                    .unwrap_or(false);
                if elapsed {
                    inner.state = CircuitState::HalfOpen;
                    inner.half_open_requests = 0;
                    inner.half_open_successes = 0;
                    info!("circuit breaker transitioning OPEN -> HALF_OPEN");
                    true
                } else {
                    false
                }
            }
            CircuitState::HalfOpen => inner.half_open_requests < self.config.half_open_max,
            CircuitState::Closed => true,
        }
    }

    /// Record that a request was actually issued (counts HALF_OPEN probes).
    pub fn record_request(&self) {
        let mut inner = self.inner.lock();
        if inner.state == CircuitState::HalfOpen {
            inner.half_open_requests += 1;
        }
    }

    /// Record a successful request.
    pub fn record_success(&self) {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::HalfOpen => {
                inner.half_open_successes += 1;
                if inner.half_open_successes >= self.config.half_open_max {
                    inner.state = CircuitState::Closed;
                    inner.failure_count = 0;
                    inner.half_open_requests = 0;
                    inner.half_open_successes = 0;
                    info!("circuit breaker closed after successful probes");
                }
            }
            CircuitState::Closed => {
                // Only contiguous runs of failures count.
                inner.failure_count = 0;
            }
            CircuitState::Open => {}
        }
    }

    /// Record a failed request. Only 429-class failures count toward the
    /// threshold; any failure during HALF_OPEN re-opens the circuit.
    pub fn record_failure(&self, is_429: bool) {
        let mut inner = self.inner.lock();

        if is_429 {
            inner.failure_count += 1;
            inner.last_failure_at = Some(Instant::now());

            if inner.failure_count >= self.config.failure_threshold
                && inner.state == CircuitState::Closed
            {
                inner.state = CircuitState::Open;
                warn!(
                    failures = inner.failure_count,
                    "circuit breaker OPEN after consecutive 429 failures"
                );
            }
        }

        if inner.state == CircuitState::HalfOpen {
            inner.state = CircuitState::Open;
            inner.last_failure_at = Some(Instant::now());
            warn!("circuit breaker re-opened by failure during HALF_OPEN");
        }
    }

    /// Current state.
    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    /// Reset to the initial CLOSED state.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.state = CircuitState::Closed;
        inner.failure_count = 0;
        inner.last_failure_at = None;
        inner.half_open_requests = 0;
        inner.half_open_successes = 0;
    }
}
