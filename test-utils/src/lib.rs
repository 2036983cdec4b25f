//! Shared test utilities for census-common and the services using it.
//!
//! This crate provides:
//! - A scripted document store for driving retry scenarios
//! - A log capture layer for asserting on emitted events
//! - Proptest generators for status codes, cause chains and retry configs
//! - Test fixtures with sample case documents

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod logs;
pub mod mocks;

pub use fixtures::*;
pub use generators::*;
pub use logs::{CapturedEvent, LogCapture};
pub use mocks::{ScriptedDataStore, WriteOutcome};
