//! Retry policy with exponential backoff and jitter

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

use untyped_core::error::UntypedError;

use crate::RegistryResult;

/// Configuration for exponential backoff retry logic
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first; 0 retries forever
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub initial_delay: Duration,
    /// Maximum delay between attempts
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub multiplier: f64,
    /// Randomize each delay uniformly in `[0, backoff]`
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Retry forever with no delay between attempts
    pub fn unbounded() -> Self {
        Self {
            max_attempts: 0,
            ..Self::immediate(0)
        }
    }

    /// Retry up to `max_attempts` times with no delay between attempts
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            multiplier: 1.0,
            jitter: false,
        }
    }

    /// Whether another attempt may follow `attempts_made` failed ones
    pub fn allows_another(&self, attempts_made: u32) -> bool {
        self.max_attempts == 0 || attempts_made < self.max_attempts
    }

    /// Backoff before the attempt following failed attempt number `attempt` (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(64) as i32;
        let millis = self.initial_delay.as_millis() as f64 * self.multiplier.powi(exponent);
        let capped = millis.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }

    /// Backoff with jitter applied, if enabled
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let backoff = self.backoff(attempt);
        if !self.jitter || backoff.is_zero() {
            return backoff;
        }
        let millis = rand::thread_rng().gen_range(0..=backoff.as_millis() as u64);
        Duration::from_millis(millis)
    }

    /// Run `operation` until it succeeds, fails permanently, or the policy is exhausted.
    ///
    /// The closure receives the 1-based attempt number. Errors that are not
    /// [`UntypedError::is_recoverable`] are returned immediately.
    pub async fn run<F, Fut, T>(&self, description: &str, mut operation: F) -> RegistryResult<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = RegistryResult<T>>,
    {
        let mut attempt = 1u32;

        loop {
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(error) if !error.is_recoverable() => return Err(error),
                Err(error) => {
                    if !self.allows_another(attempt) {
                        return Err(UntypedError::RetriesExhausted {
                            operation: description.to_string(),
                            attempts: attempt,
                            last_error: Box::new(error),
                        });
                    }

                    let delay = self.delay_for(attempt);
                    warn!(attempt, ?delay, %error, "{} failed, retrying", description);
                    tokio::time::sleep(delay).await;
                    attempt = attempt.saturating_add(1);
                },
            }
        }
    }
}
