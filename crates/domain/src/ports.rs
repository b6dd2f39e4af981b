//! Testability ports owned by the domain.

use chrono::{DateTime, Utc};

/// Source of event timestamps.
#[cfg_attr(test, mockall::automock)]
pub trait ClockPort: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
