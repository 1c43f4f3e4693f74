//! Retry with exponential backoff and jitter.
//! `base * multiplier^attempt`, capped, then jittered with a dependency-free
//! xorshift64 PRNG; wrapped in a generic async retry helper that only
//! retries transient errors.

use std::time::Duration;

use crate::error::{AppError, ErrorKind};

/// xorshift64 PRNG, a dependency-free jitter source.
pub struct Xorshift64 {
    state: u64,
}

impl Xorshift64 {
    pub fn new(seed: u64) -> Self {
        Self { state: if seed == 0 { 0x9E3779B97F4A7C15 } else { seed } }
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    /// Uniform float in [0, 1).
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }
}

pub struct BackoffCalculator {
    base_ms: u64,
    max_ms: u64,
    multiplier: f64,
    jitter_factor: f64,
    attempt: u32,
    rng: Xorshift64,
}

impl BackoffCalculator {
    pub fn new(base_ms: u64, max_ms: u64, jitter_factor: f64) -> Self {
        Self {
            base_ms,
            max_ms,
            multiplier: 2.0,
            jitter_factor,
            attempt: 0,
            rng: Xorshift64::new(0xD1B54A32D192ED03),
        }
    }

    /// Next backoff duration for the current attempt, then advances the
    /// attempt counter. Jitter is applied as +/- `jitter_factor` of the
    /// capped exponential value.
    pub fn next_backoff(&mut self) -> Duration {
        let raw = self.base_ms as f64 * self.multiplier.powi(self.attempt as i32);
        let capped = raw.min(self.max_ms as f64);
        let jitter_span = capped * self.jitter_factor;
        let jitter = (self.rng.next_f64() * 2.0 - 1.0) * jitter_span;
        self.attempt += 1;
        Duration::from_millis((capped + jitter).max(0.0) as u64)
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}

/// Retries `f` up to `max_attempts` times, sleeping the calculator's backoff
/// between tries. Only `ErrorKind::TransientIo` failures are retried; any
/// other kind returns immediately.
pub async fn with_retry<T, F, Fut>(
    max_attempts: u32,
    base_ms: u64,
    max_ms: u64,
    jitter_factor: f64,
    mut f: F,
) -> Result<T, AppError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, AppError>>,
{
    let mut backoff = BackoffCalculator::new(base_ms, max_ms, jitter_factor);
    let mut last_err = None;
    for _ in 0..max_attempts.max(1) {
        match f().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                let retryable = err.kind.is_retryable();
                last_err = Some(err);
                if !retryable {
                    break;
                }
                tokio::time::sleep(backoff.next_backoff()).await;
            }
        }
    }
    Err(last_err.unwrap_or_else(|| AppError::new("retry", ErrorKind::LogicInvariant, "no attempts made")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn backoff_grows_exponentially_before_cap() {
        let mut calc = BackoffCalculator::new(100, 30_000, 0.0);
        let first = calc.next_backoff().as_millis();
        let second = calc.next_backoff().as_millis();
        assert!(second > first);
    }

    #[test]
    fn backoff_respects_cap() {
        let mut calc = BackoffCalculator::new(1000, 2000, 0.0);
        for _ in 0..10 {
            let d = calc.next_backoff().as_millis();
            assert!(d <= 2000, "backoff {} exceeded cap", d);
        }
    }

    #[test]
    fn reset_restarts_attempt_counter() {
        let mut calc = BackoffCalculator::new(100, 30_000, 0.0);
        calc.next_backoff();
        calc.next_backoff();
        assert_eq!(calc.attempt(), 2);
        calc.reset();
        assert_eq!(calc.attempt(), 0);
    }

    #[tokio::test]
    async fn retries_transient_failures_until_success() {
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = attempts.clone();
        let result: Result<u32, AppError> = with_retry(5, 1, 5, 0.0, move || {
            let attempts = attempts_clone.clone();
            async move {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(AppError::transient_io("test", "not yet"))
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_non_transient_errors() {
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = attempts.clone();
        let result: Result<u32, AppError> = with_retry(5, 1, 5, 0.0, move || {
            let attempts = attempts_clone.clone();
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(AppError::validation("test", "bad input"))
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
