//! Injectable clock.
//!
//! The key cache decides staleness and the verifier decides freshness from
//! "now". Both read it through [`TimeSource`] so tests can move time
//! without sleeping.

use chrono::{DateTime, Utc};

/// Source of the current wall-clock time.
pub trait TimeSource: Send + Sync {
    /// Current time in UTC.
    fn now(&self) -> DateTime<Utc>;
}

/// [`TimeSource`] backed by the system clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
