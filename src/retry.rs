//! Bounded polling with exponential backoff.
//!
//! Used where the provider settles asynchronously (namespace registration).
//! The policy caps both the number of probes and the total time spent
//! waiting, and reports exhaustion as a value rather than an error so callers
//! decide whether a timeout is fatal.
use std::time::{Duration, Instant};

/// Milliseconds for log fields, clamped to `u64::MAX`.
pub fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Attempt and wall-clock limits for a polling loop.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
    pub max_elapsed: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_delay: Duration::from_secs(5),
            multiplier: 2.0,
            max_delay: Duration::from_secs(30),
            max_elapsed: Duration::from_secs(300),
        }
    }
}

/// How a polling loop ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryOutcome<T> {
    Ready { value: T, attempts: u32 },
    TimedOut { attempts: u32, elapsed: Duration },
}

impl RetryPolicy {
    /// Delay after the given 1-based attempt, capped at `max_delay`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let factor = self.multiplier.max(1.0).powi(exponent);
        let secs = self.initial_delay.as_secs_f64() * factor;
        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(secs)
    }

    /// Probe until it yields a value or the policy is exhausted.
    ///
    /// `sleep` is injected so tests can run the loop without blocking; the
    /// budget is charged with whichever is larger of real elapsed time and
    /// requested sleep time.
    pub fn poll<T, P, S>(&self, mut probe: P, mut sleep: S) -> RetryOutcome<T>
    where
        P: FnMut(u32) -> Option<T>,
        S: FnMut(Duration),
    {
        let start = Instant::now();
        let mut slept = Duration::ZERO;
        let mut attempts = 0;
        while attempts < self.max_attempts {
            attempts += 1;
            if let Some(value) = probe(attempts) {
                return RetryOutcome::Ready { value, attempts };
            }
            if attempts == self.max_attempts {
                break;
            }
            let delay = self.delay_after(attempts);
            let elapsed = start.elapsed().max(slept);
            if elapsed + delay > self.max_elapsed {
                tracing::debug!(
                    attempts,
                    elapsed_ms = saturating_millis(elapsed),
                    "retry budget exhausted"
                );
                break;
            }
            sleep(delay);
            slept += delay;
        }
        RetryOutcome::TimedOut {
            attempts,
            elapsed: start.elapsed().max(slept),
        }
    }
}
