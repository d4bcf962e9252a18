//! # PixSync Testkit
//!
//! Test utilities for PixSync.
//!
//! This crate provides:
//! - Sample controller state and fast client configurations
//! - An in-process simulated controller for the loopback transport
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pixsync_testkit::prelude::*;
//!
//! #[test]
//! fn test_against_simulator() {
//!     let controller = SimulatedController::new();
//!     let client = start_simulated(&controller, fast_config());
//!     assert!(client.wait_until_settled(SETTLE_TIMEOUT).is_settled());
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod simulator;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::simulator::*;
}

pub use fixtures::*;
pub use generators::*;
pub use simulator::*;
