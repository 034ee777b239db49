//! # Battle Test Utilities
//!
//! Shared testing utilities for all crates:
//! - Determinism test harness
//! - Fixture and placement helpers
//! - Balance runs over many simulated battles
//! - Property-based testing strategies

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod balance;
pub mod determinism;
pub mod fixtures;

/// Re-export proptest for convenience.
pub use proptest;
