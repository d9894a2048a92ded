//! Wall-clock access.
//!
//! Response liveness and SOA serials both depend on the current time, so the time source is
//! injected rather than read ad hoc.

use std::sync::Arc;
use time::error::ComponentRange;
use time::OffsetDateTime;

pub type SharedClock = Arc<dyn Clock + Send + Sync>;

pub trait Clock {
    fn now(&self) -> OffsetDateTime;
}

/// The real UTC clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// A clock stuck at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub OffsetDateTime);

impl FixedClock {
    /// # Errors
    ///
    /// Fails if `timestamp` is outside the range `OffsetDateTime` can represent.
    pub fn at_unix(timestamp: i64) -> Result<Self, ComponentRange> {
        OffsetDateTime::from_unix_timestamp(timestamp).map(Self)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        self.0
    }
}
