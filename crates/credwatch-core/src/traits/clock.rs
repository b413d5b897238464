//! Clock trait for time-dependent decisions.

use chrono::{DateTime, Utc};

/// Source of the current time.
///
/// Session expiry and the template window are decided against this, so tests
/// can move time explicitly.
pub trait Clock: Send + Sync {
    /// Returns the current UTC timestamp.
    fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
