#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Mutex;

use chrono::DateTime;
use qtty::{Degrees, Minutes, Seconds};

use colibri_scheduler::models::{
    Binning, FrameFilter, MoonPosition, Night, NightContext, ObservingLimits, SiteLocation,
};
use colibri_scheduler::time::{format_timestamp, JulianDate, TimestampLayout};
use colibri_scheduler::{CsvIndex, ObservationRequest, Target};

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Runs `f` with environment variables temporarily modified.
///
/// Restores the variables on unwind and serializes access to the process
/// environment across parallel tests.
///
/// `changes` is a list of `(key, value)` pairs:
/// - `Some(v)` sets the variable to `v`
/// - `None` removes the variable
pub fn with_scoped_env<F, R>(changes: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let _guard = ScopedEnv::new(changes);
    f()
}

struct ScopedEnv {
    snapshot: Vec<(String, Option<String>)>,
}

impl ScopedEnv {
    fn new(changes: &[(&str, Option<&str>)]) -> Self {
        let keys: HashSet<&str> = changes.iter().map(|(k, _)| *k).collect();
        let snapshot = keys
            .into_iter()
            .map(|k| (k.to_string(), std::env::var(k).ok()))
            .collect::<Vec<_>>();

        for (k, v) in changes {
            match v {
                Some(val) => std::env::set_var(k, val),
                None => std::env::remove_var(k),
            }
        }

        Self { snapshot }
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        for (k, v) in self.snapshot.drain(..) {
            match v {
                Some(val) => std::env::set_var(&k, val),
                None => std::env::remove_var(&k),
            }
        }
    }
}

pub fn elginfield() -> SiteLocation {
    SiteLocation::new(Degrees::new(43.1925), Degrees::new(-81.3158))
}

/// A Moon far below every northern target.
pub fn southern_moon() -> MoonPosition {
    MoonPosition::new(Degrees::new(0.0), Degrees::new(-89.0))
}

/// A synthetic ten-hour night starting at JD 2460371.5 (2024-03-02 00:00 UTC).
pub fn synthetic_night() -> Night {
    let sunset = JulianDate::new(2_460_371.5);
    Night::new(sunset, sunset.plus_days(10.0 / 24.0))
}

pub fn minutes_after(jd: JulianDate, minutes: f64) -> JulianDate {
    jd.plus_minutes(Minutes::new(minutes))
}

pub fn context_at(night: Night, now: JulianDate) -> NightContext {
    NightContext::snapshot(
        night,
        elginfield(),
        ObservingLimits::default(),
        now,
        southern_moon(),
        true,
    )
}

/// RFC 3339 rendering rounded to whole seconds.
pub fn stamp(jd: JulianDate) -> String {
    let secs = jd.to_unix_timestamp().round() as i64;
    let dt = DateTime::from_timestamp(secs, 0).unwrap_or(DateTime::UNIX_EPOCH);
    format_timestamp(dt, TimestampLayout::Rfc3339)
}

/// Request pointing at a fixed horizontal position.
pub fn horizontal_request(
    index: usize,
    name: &str,
    priority: u32,
    alt: f64,
    start: JulianDate,
    end: JulianDate,
    duration_min: f64,
) -> ObservationRequest {
    ObservationRequest {
        csv_index: CsvIndex::new(index),
        directory_name: name.to_string(),
        priority,
        target: Target::Horizontal {
            alt: Degrees::new(alt),
            az: Degrees::new(180.0),
        },
        start_utc: stamp(start),
        end_utc: stamp(end),
        start_jd: start,
        end_jd: end,
        obs_duration: Minutes::new(duration_min),
        exposure_time: Seconds::new(60.0),
        filter: FrameFilter::Normal,
        binning: Binning::One,
    }
}

/// One request-table row for a horizontal target with 60 s normal frames.
pub fn table_row(name: &str, priority: u32, alt: f64, start: &str, end: &str, duration_min: f64) -> String {
    format!(
        "{},{},,,{},180,{},{},{},60,1,1,0",
        name, priority, alt, start, end, duration_min
    )
}
