//! Wall-clock sources for the scheduler loop.

use chrono::{DateTime, Utc};

use super::julian::JulianDate;

/// Source of the current UTC time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn now_jd(&self) -> JulianDate {
        JulianDate::from_datetime(self.now())
    }
}

/// The system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that starts at a fixed instant and advances with the Tokio timer.
///
/// Under a paused Tokio runtime (`#[tokio::test(start_paused = true)]`) time
/// only moves when every task is waiting on a timer, so a whole night of
/// backoffs and exposures runs instantly and deterministically. The binary
/// uses it for dry runs that start at a chosen time.
#[derive(Debug, Clone)]
pub struct SimulatedClock {
    anchor: DateTime<Utc>,
    started: tokio::time::Instant,
}

impl SimulatedClock {
    pub fn starting_at(anchor: DateTime<Utc>) -> Self {
        Self {
            anchor,
            started: tokio::time::Instant::now(),
        }
    }

    pub fn starting_at_jd(anchor: JulianDate) -> Self {
        Self::starting_at(anchor.to_datetime())
    }
}

impl Clock for SimulatedClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = self.started.elapsed();
        chrono::Duration::from_std(elapsed)
            .ok()
            .and_then(|d| self.anchor.checked_add_signed(d))
            .unwrap_or(self.anchor)
    }
}
