//! Harness shared by the integration tests.
//!
//! Wires a [`ScriptedDataStore`] behind a [`RetryableCloudDataStore`] and
//! keeps a handle on the scripted store so tests can count calls.

use census_common::{RetryConfig, RetryPolicy, RetryableCloudDataStore, TracingConfig, init_tracing};
use std::sync::{Arc, Once};
use std::time::Duration;
use test_utils::ScriptedDataStore;

/// Retrying store over a shared scripted store.
pub type ScriptedRetryingStore = RetryableCloudDataStore<Arc<ScriptedDataStore>>;

/// Backoff with short delays and `max_attempts` attempts.
///
/// # Panics
///
/// Panics if `max_attempts` is zero.
#[must_use]
#[allow(clippy::expect_used)]
pub fn fast_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::new(
        RetryConfig::default()
            .with_initial_delay(Duration::from_millis(10))
            .with_multiplier(2.0)
            .with_max_delay(Duration::from_millis(100))
            .with_max_attempts(max_attempts),
    )
    .expect("test policy is valid")
}

/// Wrap `store` in a retrying store allowing `max_attempts` writes.
///
/// Returns the retrying store and a handle on the scripted one.
#[must_use]
pub fn retrying(
    store: ScriptedDataStore,
    max_attempts: u32,
) -> (ScriptedRetryingStore, Arc<ScriptedDataStore>) {
    init_test_tracing();
    let scripted = Arc::new(store);
    let retrying = RetryableCloudDataStore::new(Arc::clone(&scripted), fast_policy(max_attempts));
    (retrying, scripted)
}

/// Install a debug subscriber once per test binary.
pub fn init_test_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = init_tracing(&TracingConfig::default().with_log_level("debug"));
    });
}
