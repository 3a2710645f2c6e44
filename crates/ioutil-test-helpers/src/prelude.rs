//! Convenience re-exports for common test utilities.
//!
//! ```rust,ignore
//! use ioutil_test_helpers::prelude::*;
//! ```

pub use crate::must::{must, must_some, must_with};
pub use crate::recorder::{CallRecorder, HitCounter};
pub use crate::wait::{DEFAULT_POLL_INTERVAL, DEFAULT_TIMEOUT, settle, wait_until};

#[cfg(feature = "logging")]
pub use crate::logging::init_test_tracing;

pub type TestResult = Result<(), Box<dyn std::error::Error>>;
