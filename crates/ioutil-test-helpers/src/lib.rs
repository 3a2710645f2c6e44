//! Shared test utilities for ioutil.
//!
//! # Modules
//!
//! - [`mod@must`] - Unwrap helpers with good error messages and `#[track_caller]`
//! - [`assertions`] - Custom assertion macros
//! - [`wait`] - Polling helpers for asserting on work done by other threads
//! - [`recorder`] - Thread-safe call recorders for closures under test
//! - [`logging`] - `tracing` subscriber setup for test output
//! - [`prelude`] - Convenience re-exports
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! ioutil-test-helpers = { workspace = true }
//! ```
//!
//! ```rust,ignore
//! use ioutil_test_helpers::prelude::*;
//! ```

#![deny(unsafe_op_in_unsafe_fn)]
#![allow(clippy::panic)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod assertions;
pub mod must;
pub mod prelude;
pub mod recorder;
pub mod wait;

#[cfg(feature = "logging")]
#[cfg_attr(docsrs, doc(cfg(feature = "logging")))]
pub mod logging;

pub use must::*;
pub use recorder::{CallRecorder, HitCounter};
pub use wait::{settle, wait_until};

#[cfg(feature = "logging")]
pub use logging::init_test_tracing;
