//! Resilience layer: circuit breakers, retry/backoff/jitter, bounded
//! queues, and the degradation registry.

pub mod breaker;
pub mod degradation;
pub mod queue;
pub mod retry;

pub use breaker::{BreakerState, CircuitBreaker};
pub use degradation::{Availability, DegradationRegistry};
pub use queue::BoundedQueue;
pub use retry::{with_retry, BackoffCalculator};
