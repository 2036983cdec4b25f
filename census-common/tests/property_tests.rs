//! Property-based tests for census-common crate.
//!
//! These tests verify universal properties across all inputs using proptest.

use census_common::cloud::{ContentionSignal, StoreError, classify};
use census_common::{RetryConfig, RetryError, RetryPolicy};
use proptest::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use thiserror::Error;
use tonic::{Code, Status};

#[derive(Debug, Error)]
#[error("layer {depth}")]
struct Layer {
    depth: usize,
    #[source]
    source: BoxError,
}

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Bury `root` under `depth` wrapping errors.
fn bury(root: impl std::error::Error + Send + Sync + 'static, depth: usize) -> BoxError {
    let root: BoxError = Box::new(root);
    (0..depth).fold(root, |source, depth| -> BoxError {
        Box::new(Layer { depth, source })
    })
}

fn retryable_code() -> impl Strategy<Value = Code> {
    prop_oneof![
        Just(Code::ResourceExhausted),
        Just(Code::Aborted),
        Just(Code::DeadlineExceeded),
        Just(Code::Unavailable),
    ]
}

fn permanent_code() -> impl Strategy<Value = Code> {
    prop_oneof![
        Just(Code::AlreadyExists),
        Just(Code::NotFound),
        Just(Code::PermissionDenied),
        Just(Code::InvalidArgument),
        Just(Code::Internal),
        Just(Code::FailedPrecondition),
    ]
}

fn paused_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .unwrap()
}

// Retryable status anywhere in a chain without other statuses is retryable.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_retryable_status_found_at_any_depth(
        code in retryable_code(),
        depth in 0usize..8,
    ) {
        let err = bury(Status::new(code, "contention"), depth);
        prop_assert_eq!(classify(err.as_ref()), ContentionSignal::Retryable);
    }

    #[test]
    fn prop_first_status_decides(
        outer in permanent_code(),
        inner in retryable_code(),
        outer_depth in 0usize..4,
        gap in 1usize..4,
    ) {
        // A permanent status whose own causes hold a retryable one
        let mut status = Status::new(outer, "rejected");
        status.set_source(Arc::from(bury(Status::new(inner, "contention"), gap)));
        let err = bury(status, outer_depth);

        prop_assert_eq!(classify(err.as_ref()), ContentionSignal::Permanent);
    }

    #[test]
    fn prop_chain_without_status_is_permanent(depth in 0usize..8) {
        let err = bury(std::io::Error::other("connection reset"), depth);
        prop_assert_eq!(classify(err.as_ref()), ContentionSignal::Permanent);
    }
}

// Delays grow geometrically and never exceed the cap.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_delays_grow_and_are_capped(
        initial_ms in 1u64..1000,
        multiplier in 1.01f64..4.0,
        cap_factor in 1u64..200,
        attempt in 1u32..64,
    ) {
        let max_ms = initial_ms * cap_factor;
        let policy = RetryPolicy::new(
            RetryConfig::default()
                .with_initial_delay(Duration::from_millis(initial_ms))
                .with_multiplier(multiplier)
                .with_max_delay(Duration::from_millis(max_ms)),
        )
        .unwrap();

        let delay = policy.delay_for_attempt(attempt);
        let next = policy.delay_for_attempt(attempt + 1);
        prop_assert!(delay <= Duration::from_millis(max_ms));
        prop_assert!(next >= delay);

        let expected_ms = (initial_ms as f64 * multiplier.powi(attempt as i32 - 1)).min(max_ms as f64);
        let actual_ms = delay.as_secs_f64() * 1000.0;
        prop_assert!((actual_ms - expected_ms).abs() < 1e-3 * expected_ms.max(1.0));
    }
}

// An operation that always fails as retryable is attempted exactly
// max_attempts times; a permanent failure is attempted once.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn prop_attempts_bounded_by_max_attempts(max_attempts in 1u32..12) {
        let policy = RetryPolicy::new(RetryConfig::default().with_max_attempts(max_attempts)).unwrap();
        let calls = AtomicU32::new(0);

        let result: Result<(), RetryError<StoreError>> = paused_runtime().block_on(policy.execute(
            "store",
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(StoreError::contention("case", Status::aborted("busy"))) }
            },
            StoreError::contention_signal,
        ));

        let err = result.unwrap_err();
        prop_assert!(err.is_exhausted());
        prop_assert_eq!(err.attempts(), max_attempts);
        prop_assert_eq!(calls.load(Ordering::SeqCst), max_attempts);
    }

    #[test]
    fn prop_permanent_failure_attempted_once(
        max_attempts in 1u32..12,
        code in permanent_code(),
    ) {
        let policy = RetryPolicy::new(RetryConfig::default().with_max_attempts(max_attempts)).unwrap();
        let calls = AtomicU32::new(0);

        // No backoff happens, so a plain runtime is enough
        let result: Result<(), RetryError<StoreError>> = tokio_test::block_on(policy.execute(
            "store",
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { Err(StoreError::failed_with("write failed", Status::new(code, "no"))) }
            },
            StoreError::contention_signal,
        ));

        let err = result.unwrap_err();
        prop_assert!(!err.is_exhausted());
        prop_assert_eq!(err.into_inner().to_string(), "write failed");
        prop_assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
