use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unix epoch (1970-01-01T00:00:00Z) as a Julian Date.
pub const UNIX_EPOCH_JD: f64 = 2_440_587.5;

/// J2000.0 (2000-01-01T12:00:00 TT) as a Julian Date.
pub const J2000_JD: f64 = 2_451_545.0;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Julian Date representation.
/// JD 0 = -4712-01-01 12:00:00 (proleptic Julian calendar)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct JulianDate(qtty::Days);

impl JulianDate {
    /// Create a new JD value.
    pub fn new<V: Into<qtty::Days>>(v: V) -> Self {
        Self(v.into())
    }

    /// Raw JD value as f64.
    pub fn value(&self) -> f64 {
        self.0.value()
    }

    /// Days elapsed since J2000.0.
    pub fn days_since_j2000(&self) -> f64 {
        self.value() - J2000_JD
    }

    /// Julian centuries elapsed since J2000.0.
    pub fn centuries_since_j2000(&self) -> f64 {
        self.days_since_j2000() / 36_525.0
    }

    /// Shift by a (possibly negative) number of days.
    pub fn plus_days(&self, days: f64) -> Self {
        Self::new(self.value() + days)
    }

    /// Shift by a duration expressed in minutes.
    pub fn plus_minutes(&self, minutes: qtty::Minutes) -> Self {
        self.plus_days(minutes.to::<qtty::Day>().value())
    }

    /// Signed difference `self - other` in days.
    pub fn days_after(&self, other: JulianDate) -> f64 {
        self.value() - other.value()
    }

    /// Convert to Unix timestamp (seconds since 1970-01-01 00:00:00 UTC).
    pub fn to_unix_timestamp(&self) -> f64 {
        (self.value() - UNIX_EPOCH_JD) * SECONDS_PER_DAY
    }

    /// Create from Unix timestamp (seconds since 1970-01-01 00:00:00 UTC).
    pub fn from_unix_timestamp(timestamp: f64) -> Self {
        Self::new(timestamp / SECONDS_PER_DAY + UNIX_EPOCH_JD)
    }

    /// Convert to chrono DateTime<Utc>.
    pub fn to_datetime(&self) -> DateTime<Utc> {
        let secs = self.to_unix_timestamp();
        let whole = secs.floor();
        let nanos = ((secs - whole) * 1e9).round().min(999_999_999.0) as u32;
        DateTime::from_timestamp(whole as i64, nanos).unwrap_or(DateTime::UNIX_EPOCH)
    }

    /// Create from chrono DateTime<Utc>.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self::from_unix_timestamp(
            dt.timestamp() as f64 + dt.timestamp_subsec_nanos() as f64 / 1e9,
        )
    }
}

impl From<f64> for JulianDate {
    fn from(v: f64) -> Self {
        JulianDate::new(v)
    }
}

impl std::fmt::Display for JulianDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "JD {:.5}", self.value())
    }
}
