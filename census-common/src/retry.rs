//! Retry policy implementation with exponential backoff.
//!
//! A [`RetryPolicy`] runs an async operation up to `max_attempts` times,
//! sleeping between attempts. Whether a failure is worth another attempt is
//! decided by a caller-supplied classifier returning a [`ContentionSignal`],
//! so the policy never inspects error types itself.

use crate::cloud::ContentionSignal;
use crate::{CommonError, CommonResult};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Retry policy configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Multiplier applied to the delay after each failed attempt
    pub multiplier: f64,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    /// Total number of attempts, including the initial one
    pub max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(100),
            multiplier: 1.2,
            max_delay: Duration::from_secs(16),
            max_attempts: 10,
        }
    }
}

impl RetryConfig {
    /// Create a new retry config with custom initial delay.
    #[must_use]
    pub const fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Create a new retry config with custom backoff multiplier.
    #[must_use]
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Create a new retry config with custom max delay.
    #[must_use]
    pub const fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Create a new retry config with custom max attempts.
    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Check the configuration invariants.
    ///
    /// # Errors
    ///
    /// Returns [`CommonError::Config`] if `max_attempts` is zero, the
    /// multiplier is not a finite value above 1.0, or `max_delay` is shorter
    /// than `initial_delay`.
    pub fn validate(&self) -> CommonResult<()> {
        if self.max_attempts < 1 {
            return Err(CommonError::config("retry max attempts must be at least 1"));
        }
        if !self.multiplier.is_finite() || self.multiplier <= 1.0 {
            return Err(CommonError::config(format!(
                "retry multiplier must be greater than 1.0, got {}",
                self.multiplier
            )));
        }
        if self.max_delay < self.initial_delay {
            return Err(CommonError::config(format!(
                "retry max delay {:?} is shorter than initial delay {:?}",
                self.max_delay, self.initial_delay
            )));
        }
        Ok(())
    }
}

/// Error returned by [`RetryPolicy::execute`].
#[derive(Error, Debug)]
pub enum RetryError<E: std::error::Error + 'static> {
    /// The operation failed with an error classified as permanent.
    #[error("Permanent failure (attempts: {attempts})")]
    Permanent {
        /// Attempt on which the permanent failure happened
        attempts: u32,
        /// The original error, unchanged
        #[source]
        source: E,
    },

    /// Every attempt failed with a retryable error.
    #[error("Retries exhausted after {attempts} attempts")]
    Exhausted {
        /// Number of attempts made
        attempts: u32,
        /// Error from the last attempt
        #[source]
        source: E,
    },
}

impl<E: std::error::Error + 'static> RetryError<E> {
    /// Number of attempts made before giving up.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        match self {
            Self::Permanent { attempts, .. } | Self::Exhausted { attempts, .. } => *attempts,
        }
    }

    /// Whether the policy gave up because attempts ran out.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }

    /// Borrow the underlying operation error.
    #[must_use]
    pub const fn inner(&self) -> &E {
        match self {
            Self::Permanent { source, .. } | Self::Exhausted { source, .. } => source,
        }
    }

    /// Take the underlying operation error.
    pub fn into_inner(self) -> E {
        match self {
            Self::Permanent { source, .. } | Self::Exhausted { source, .. } => source,
        }
    }
}

/// Retry policy for executing operations with bounded exponential backoff.
///
/// The policy is immutable once built and cheap to clone, so one instance
/// configured at startup can be shared by every caller.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    /// Create a new retry policy with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CommonError::Config`] if the configuration is invalid.
    pub fn new(config: RetryConfig) -> CommonResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Create a retry policy with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            config: RetryConfig::default(),
        }
    }

    /// Delay to wait after the given failed attempt (attempts start at 1).
    ///
    /// `min(initial_delay * multiplier^(attempt - 1), max_delay)`
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let secs = self.config.initial_delay.as_secs_f64() * self.config.multiplier.powi(exponent);

        if secs.is_finite() && secs < self.config.max_delay.as_secs_f64() {
            Duration::from_secs_f64(secs)
        } else {
            self.config.max_delay
        }
    }

    /// Longest total time spent sleeping if every attempt fails, saturating
    /// at [`Duration::MAX`].
    #[must_use]
    pub fn worst_case_delay(&self) -> Duration {
        (1..self.config.max_attempts)
            .map(|attempt| self.delay_for_attempt(attempt))
            .fold(Duration::ZERO, Duration::saturating_add)
    }

    /// Execute an async operation with retries.
    ///
    /// `classify` decides, for each failure, whether another attempt is
    /// made. Permanent failures are returned straight away; retryable ones
    /// are retried until `max_attempts` calls have been made.
    ///
    /// # Errors
    ///
    /// Returns [`RetryError::Permanent`] with the original error on the
    /// first permanent failure, or [`RetryError::Exhausted`] with the last
    /// error once all attempts failed as retryable.
    pub async fn execute<T, E, F, Fut, C>(
        &self,
        operation_name: &str,
        mut operation: F,
        classify: C,
    ) -> Result<T, RetryError<E>>
    where
        E: std::error::Error + 'static,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        C: Fn(&E) -> ContentionSignal,
    {
        let mut attempt = 1;
        loop {
            let error = match operation().await {
                Ok(result) => {
                    if attempt > 1 {
                        info!(
                            operation = operation_name,
                            attempts = attempt,
                            "Transaction successful after {attempt} attempts"
                        );
                    }
                    return Ok(result);
                }
                Err(error) => error,
            };

            match classify(&error) {
                ContentionSignal::Permanent => {
                    if attempt > 1 {
                        warn!(
                            operation = operation_name,
                            attempts = attempt,
                            error = %error,
                            "Transaction failed after {attempt} attempts"
                        );
                    }
                    return Err(RetryError::Permanent {
                        attempts: attempt,
                        source: error,
                    });
                }
                ContentionSignal::Retryable => {
                    debug!(operation = operation_name, attempt, error = %error, "Retry failed");

                    if attempt >= self.config.max_attempts {
                        warn!(
                            operation = operation_name,
                            attempts = attempt,
                            error = %error,
                            "Transaction failed after {attempt} attempts"
                        );
                        return Err(RetryError::Exhausted {
                            attempts: attempt,
                            source: error,
                        });
                    }

                    let delay = self.delay_for_attempt(attempt);
                    debug!(
                        operation = operation_name,
                        attempt,
                        delay_ms = delay.as_millis(),
                        "Backing off before next attempt"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Get the maximum number of attempts.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.config.max_attempts
    }

    /// Get the configuration this policy was built from.
    #[must_use]
    pub const fn config(&self) -> &RetryConfig {
        &self.config
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::with_defaults()
    }
}
