//! Shared library for cross-cutting concerns in census response services.
//!
//! This crate provides centralized implementations for:
//! - A cloud document store port with an in-memory adapter
//! - Classification of store failures as contention or permanent
//! - Retry policies with exponential backoff
//! - A retrying store decorator that services use for writes
//! - Error types and fault codes
//! - Environment driven configuration and tracing setup

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cloud;
pub mod config;
pub mod error;
pub mod retry;
pub mod tracing_config;

pub use cloud::{
    CloudDataStore, ContentionSignal, DocumentRef, FinalStoreError, InMemoryDataStore,
    OperationIdentity, RetryableCloudDataStore, StoreError, StoreResult,
};
pub use config::CloudStorageConfig;
pub use error::{CommonError, CommonResult, Fault};
pub use retry::{RetryConfig, RetryError, RetryPolicy};
pub use tracing_config::{TracingConfig, init_tracing};
