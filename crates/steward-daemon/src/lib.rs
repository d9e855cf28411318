//! Reconciliation daemon for the Conthesis entity platform.
//!
//! The daemon forever re-asserts that the built-in system resources exist in
//! the platform store, re-triggers the automatic actions that depend on
//! them, and verifies the storage pipeline end to end with a write/read
//! self-test. Failures are logged; the loop retries on its next cycle.

pub mod actions;
pub mod catalog;
pub mod config;
pub mod daemon;
pub mod reconciler;
pub mod selftest;
pub mod shutdown;
