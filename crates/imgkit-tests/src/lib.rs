//! imgkit End-to-End Test Infrastructure
//!
//! This crate provides integration tests for backend discovery and dispatch:
//!
//! - Discovery: package tree on disk -> known backends and modules
//! - Registration: eligible functions -> scanned backend listings
//! - **Dispatch**: active backend, per-call override and fallback
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p imgkit-tests
//! ```
//!
//! ## Fixtures
//!
//! [`fixtures::PackageFixture`] lays out a throwaway package tree in a temp
//! directory; [`kernels`] holds stand-in image kernels and a loader that
//! counts how often backends are materialized.

pub mod fixtures;
pub mod kernels;

pub use fixtures::PackageFixture;
pub use kernels::{CountingLoader, Image};
