//! Shared test utilities for forecast-platform Rust crates.
//!
//! This crate provides:
//! - Proptest generators for matchers, patterns and interactions
//! - A fake weather provider and recording state hooks
//! - Test fixtures with sample forecasts and interactions

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod mocks;

pub use generators::*;
