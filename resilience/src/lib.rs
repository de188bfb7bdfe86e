//! Resilience primitives guarding outbound LLM calls.
//!
//! The rate limiter and circuit breaker are process-wide singletons shared by
//! every pipeline stage that talks to the LLM provider; both are safe under
//! concurrent invocation.

pub mod backoff;
pub mod circuit_breaker;
pub mod rate_limiter;

pub use backoff::{parse_retry_hint, retry_delay, BackoffConfig};
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use rate_limiter::RateLimiter;
