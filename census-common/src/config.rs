//! Environment driven configuration.
//!
//! Settings are read once at startup. Every loader has a `from_lookup`
//! variant taking the variable source as a closure, which `from_env` calls
//! with the process environment.

use crate::retry::RetryConfig;
use crate::tracing_config::TracingConfig;
use crate::{CommonError, CommonResult};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Initial backoff delay in milliseconds.
pub const BACKOFF_INITIAL: &str = "CLOUD_STORAGE_BACKOFF_INITIAL";
/// Backoff multiplier.
pub const BACKOFF_MULTIPLIER: &str = "CLOUD_STORAGE_BACKOFF_MULTIPLIER";
/// Maximum backoff delay in milliseconds.
pub const BACKOFF_MAX: &str = "CLOUD_STORAGE_BACKOFF_MAX";
/// Maximum number of store attempts.
pub const BACKOFF_MAX_ATTEMPTS: &str = "CLOUD_STORAGE_BACKOFF_MAX_ATTEMPTS";

/// Parse variable `name` from `lookup`, falling back to `default` when unset.
///
/// # Errors
///
/// Returns [`CommonError::Config`] if the variable is set but malformed.
pub fn parse_var<T, F>(lookup: &F, name: &str, default: T) -> CommonResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(val) => val
            .trim()
            .parse()
            .map_err(|e| CommonError::config(format!("Invalid {name}: {e}"))),
        None => Ok(default),
    }
}

fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

impl RetryConfig {
    /// Load the backoff settings from environment variables.
    ///
    /// A `.env` file is honoured if present.
    ///
    /// # Errors
    ///
    /// Returns [`CommonError::Config`] if a variable is malformed or the
    /// resulting configuration is invalid.
    pub fn from_env() -> CommonResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(env_lookup)
    }

    /// Load the backoff settings from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns [`CommonError::Config`] if a variable is malformed or the
    /// resulting configuration is invalid.
    pub fn from_lookup<F>(lookup: F) -> CommonResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let initial_ms = parse_var(&lookup, BACKOFF_INITIAL, millis(defaults.initial_delay))?;
        let multiplier = parse_var(&lookup, BACKOFF_MULTIPLIER, defaults.multiplier)?;
        let max_ms = parse_var(&lookup, BACKOFF_MAX, millis(defaults.max_delay))?;
        let max_attempts = parse_var(&lookup, BACKOFF_MAX_ATTEMPTS, defaults.max_attempts)?;

        let config = Self::default()
            .with_initial_delay(Duration::from_millis(initial_ms))
            .with_multiplier(multiplier)
            .with_max_delay(Duration::from_millis(max_ms))
            .with_max_attempts(max_attempts);
        config.validate()?;
        Ok(config)
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Configuration for services using the cloud document store.
#[derive(Debug, Clone, PartialEq)]
pub struct CloudStorageConfig {
    /// Backoff applied to contended writes
    pub retry: RetryConfig,
    /// Logging setup
    pub tracing: TracingConfig,
}

impl CloudStorageConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any variable is malformed.
    pub fn from_env() -> CommonResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(env_lookup)
    }

    /// Load configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns an error if any variable is malformed.
    pub fn from_lookup<F>(lookup: F) -> CommonResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self {
            retry: RetryConfig::from_lookup(&lookup)?,
            tracing: TracingConfig::from_lookup(&lookup),
        };
        info!(retry = ?config.retry, service = %config.tracing.service_name, "Loaded cloud storage configuration");
        Ok(config)
    }
}
