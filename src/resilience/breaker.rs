//! Circuit breaker.
//! Closed/Open/HalfOpen state machine with a failure threshold, a recovery
//! duration, and a bounded half-open trial budget before fully reclosing.

use std::time::{Duration, Instant};

use parking_lot::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

struct Inner {
    state: BreakerState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    half_open_trials: u32,
}

/// Trips to `Open` after `failure_threshold` consecutive failures, stays
/// there for `recovery` before allowing `half_open_trial_count` probe calls
/// through in `HalfOpen`. A single success while half-open closes the
/// breaker; a single failure reopens it.
pub struct CircuitBreaker {
    failure_threshold: u32,
    recovery: Duration,
    half_open_trial_count: u32,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, recovery: Duration, half_open_trial_count: u32) -> Self {
        Self {
            failure_threshold,
            recovery,
            half_open_trial_count: half_open_trial_count.max(1),
            inner: Mutex::new(Inner {
                state: BreakerState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                half_open_trials: 0,
            }),
        }
    }

    pub fn state(&self) -> BreakerState {
        let mut inner = self.inner.lock();
        self.maybe_transition_to_half_open(&mut inner);
        inner.state
    }

    fn maybe_transition_to_half_open(&self, inner: &mut Inner) {
        if inner.state == BreakerState::Open {
            if let Some(opened_at) = inner.opened_at {
                if opened_at.elapsed() >= self.recovery {
                    inner.state = BreakerState::HalfOpen;
                    inner.half_open_trials = 0;
                }
            }
        }
    }

    /// Returns true if a call is currently permitted to attempt the
    /// collaborator (Closed, or HalfOpen with trial budget remaining).
    pub fn allow_request(&self) -> bool {
        let mut inner = self.inner.lock();
        self.maybe_transition_to_half_open(&mut inner);
        match inner.state {
            BreakerState::Closed => true,
            BreakerState::Open => false,
            BreakerState::HalfOpen => {
                if inner.half_open_trials < self.half_open_trial_count {
                    inner.half_open_trials += 1;
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.inner.lock();
        inner.consecutive_failures = 0;
        inner.state = BreakerState::Closed;
        inner.opened_at = None;
        inner.half_open_trials = 0;
    }

    pub fn record_failure(&self) {
        let mut inner = self.inner.lock();
        match inner.state {
            BreakerState::HalfOpen => {
                inner.state = BreakerState::Open;
                inner.opened_at = Some(Instant::now());
            }
            _ => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.failure_threshold {
                    inner.state = BreakerState::Open;
                    inner.opened_at = Some(Instant::now());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_after_threshold_failures() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(60), 1);
        assert_eq!(breaker.state(), BreakerState::Closed);
        breaker.record_failure();
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Closed);
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Open);
        assert!(!breaker.allow_request());
    }

    #[test]
    fn success_resets_failure_count() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(60), 1);
        breaker.record_failure();
        breaker.record_failure();
        breaker.record_success();
        breaker.record_failure();
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Closed);
    }

    #[test]
    fn half_open_after_recovery_then_closes_on_success() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(10), 1);
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Open);
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(breaker.state(), BreakerState::HalfOpen);
        assert!(breaker.allow_request());
        breaker.record_success();
        assert_eq!(breaker.state(), BreakerState::Closed);
    }

    #[test]
    fn half_open_failure_reopens_immediately() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(10), 1);
        breaker.record_failure();
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(breaker.state(), BreakerState::HalfOpen);
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Open);
    }

    #[test]
    fn half_open_trial_budget_limits_concurrent_probes() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(10), 1);
        breaker.record_failure();
        std::thread::sleep(Duration::from_millis(20));
        assert!(breaker.allow_request());
        assert!(!breaker.allow_request(), "second probe should be denied until the first resolves");
    }
}
