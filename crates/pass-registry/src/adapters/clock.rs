//! # Clock Adapters
//!
//! Wall-clock time for production, a settable clock for tests.

use crate::domain::value_objects::Timestamp;
use crate::ports::outbound::Clock;
use parking_lot::RwLock;
use std::time::{SystemTime, UNIX_EPOCH};

/// Reads the system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }
}

/// Manually driven clock.
#[derive(Debug)]
pub struct ManualClock {
    current_time: RwLock<Timestamp>,
}

impl ManualClock {
    /// Create a clock reading `start`.
    #[must_use]
    pub fn new(start: Timestamp) -> Self {
        Self {
            current_time: RwLock::new(start),
        }
    }

    /// Set current time.
    pub fn set_time(&self, time: Timestamp) {
        *self.current_time.write() = time;
    }

    /// Advance time by `secs`.
    pub fn advance(&self, secs: u64) {
        let mut now = self.current_time.write();
        *now = now.saturating_add(secs);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(1_700_000_000)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.current_time.read()
    }
}
