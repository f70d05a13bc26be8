//! UTC timestamp parsing, rendering and calendar rollover.
//!
//! The request table carries window bounds as text. Two layouts are accepted:
//!
//! - RFC 3339 / ISO 8601, e.g. `2024-02-28T15:30:00Z` (a missing zone is read as UTC)
//! - the legacy colon layout `YYYY:MM:DD:HH:MM`, always UTC
//!
//! [`update_day`] re-renders a timestamp in the layout it was read in, so a
//! rescheduled row keeps the shape its author wrote.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

use super::julian::JulianDate;
use crate::error::{DateRolloverError, ParseError};

/// Textual layout a timestamp was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampLayout {
    /// `2024-02-28T15:30:00Z` or with an explicit offset.
    Rfc3339,
    /// `2024-02-28T15:30:00` without a zone designator.
    IsoNaive,
    /// `2024:02:28:15:30`.
    Colon,
}

/// Parse a UTC timestamp in any accepted layout.
pub fn parse_timestamp(input: &str) -> Result<(DateTime<Utc>, TimestampLayout), ParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ParseError::timestamp(input, "empty timestamp"));
    }

    if trimmed.contains('-') || trimmed.contains('T') {
        if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
            return Ok((dt.with_timezone(&Utc), TimestampLayout::Rfc3339));
        }
        return NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S")
            .map(|naive| (naive.and_utc(), TimestampLayout::IsoNaive))
            .map_err(|e| ParseError::timestamp(input, e));
    }

    parse_colon_layout(trimmed)
        .map(|dt| (dt, TimestampLayout::Colon))
        .map_err(|reason| ParseError::timestamp(input, reason))
}

fn parse_colon_layout(input: &str) -> Result<DateTime<Utc>, String> {
    let parts: Vec<&str> = input.split(':').collect();
    if parts.len() != 5 {
        return Err(format!("expected YYYY:MM:DD:HH:MM, got {} fields", parts.len()));
    }

    let mut fields = [0u32; 5];
    for (slot, part) in fields.iter_mut().zip(&parts) {
        *slot = part
            .trim()
            .parse()
            .map_err(|_| format!("non-numeric field '{}'", part))?;
    }
    let [year, month, day, hour, minute] = fields;

    let year = i32::try_from(year).map_err(|_| format!("year {} out of range", year))?;
    let date = NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| format!("no such date {:04}-{:02}-{:02}", year, month, day))?;
    let datetime = date
        .and_hms_opt(hour, minute, 0)
        .ok_or_else(|| format!("no such time {:02}:{:02}", hour, minute))?;
    Ok(datetime.and_utc())
}

/// Render a timestamp in the given layout.
pub fn format_timestamp(dt: DateTime<Utc>, layout: TimestampLayout) -> String {
    match layout {
        TimestampLayout::Rfc3339 => dt.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        TimestampLayout::IsoNaive => dt.format("%Y-%m-%dT%H:%M:%S").to_string(),
        TimestampLayout::Colon => dt.format("%Y:%m:%d:%H:%M").to_string(),
    }
}

/// Convert a UTC timestamp to a Julian Date.
///
/// # Example
/// ```
/// use colibri_scheduler::time::utc_to_julian_date;
/// let jd = utc_to_julian_date("2000-01-01T12:00:00Z").unwrap();
/// assert!((jd.value() - 2451545.0).abs() < 1e-9);
/// ```
pub fn utc_to_julian_date(input: &str) -> Result<JulianDate, ParseError> {
    parse_timestamp(input).map(|(dt, _)| JulianDate::from_datetime(dt))
}

/// Convert a Julian Date back to a UTC date-time.
pub fn julian_date_to_utc(jd: JulianDate) -> DateTime<Utc> {
    jd.to_datetime()
}

/// `yyyymmdd` label of the UTC calendar day containing `jd`.
///
/// Nightly data directories are named after the day the night started on.
pub fn night_label(jd: JulianDate) -> String {
    jd.to_datetime().format("%Y%m%d").to_string()
}

/// Advance a timestamp by exactly one calendar day.
///
/// Hours, minutes and seconds are preserved, month and year boundaries are
/// crossed, and the result is rendered in the input's layout.
///
/// ```
/// use colibri_scheduler::time::update_day;
/// assert_eq!(update_day("2024-02-28T15:30:00Z").unwrap(), "2024-02-29T15:30:00Z");
/// assert!(update_day("invalid-date").is_err());
/// ```
pub fn update_day(input: &str) -> Result<String, DateRolloverError> {
    let rollover_error = |source| DateRolloverError {
        input: input.to_string(),
        source,
    };

    let (dt, layout) = parse_timestamp(input).map_err(rollover_error)?;
    let next = dt
        .checked_add_days(chrono::Days::new(1))
        .ok_or_else(|| rollover_error(ParseError::timestamp(input, "date overflow")))?;
    Ok(format_timestamp(next, layout))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rfc3339_to_julian_date() {
        let jd = utc_to_julian_date("2024-02-28T15:30:00Z").unwrap();
        // 2024-02-28 00:00 UTC is JD 2460368.5
        assert!((jd.value() - (2_460_368.5 + 15.5 / 24.0)).abs() < 1e-9);
    }

    #[test]
    fn test_offset_is_normalised_to_utc() {
        let a = utc_to_julian_date("2024-02-28T17:30:00+02:00").unwrap();
        let b = utc_to_julian_date("2024-02-28T15:30:00Z").unwrap();
        assert!((a.value() - b.value()).abs() < 1e-9);
    }

    #[test]
    fn test_colon_layout() {
        let a = utc_to_julian_date("2024:02:28:15:30").unwrap();
        let b = utc_to_julian_date("2024-02-28T15:30:00Z").unwrap();
        assert!((a.value() - b.value()).abs() < 1e-9);
    }

    #[test]
    fn test_malformed_timestamps() {
        for input in [
            "",
            "invalid-date",
            "2024-13-01T00:00:00Z",
            "2023-02-29T10:00:00Z",
            "2024:02:30:10:00",
            "2024:xx:01:10:00",
            "2024:02:01",
        ] {
            assert!(
                utc_to_julian_date(input).is_err(),
                "'{}' should not parse",
                input
            );
        }
    }

    #[test]
    fn test_update_day_calendar_boundaries() {
        let cases = [
            ("2024-11-20T15:30:00Z", "2024-11-21T15:30:00Z"),
            ("2024-11-30T15:30:00Z", "2024-12-01T15:30:00Z"),
            ("2024-12-31T15:30:00Z", "2025-01-01T15:30:00Z"),
            ("2024-02-28T15:30:00Z", "2024-02-29T15:30:00Z"),
            ("2023-02-28T15:30:00Z", "2023-03-01T15:30:00Z"),
            ("2023-12-31T23:59:59Z", "2024-01-01T23:59:59Z"),
            ("2024-01-15T10:00:00Z", "2024-01-16T10:00:00Z"),
        ];
        for (input, expected) in cases {
            assert_eq!(update_day(input).unwrap(), expected, "input {}", input);
        }
    }

    #[test]
    fn test_update_day_keeps_layout() {
        assert_eq!(update_day("2024:02:29:23:15").unwrap(), "2024:03:01:23:15");
        assert_eq!(update_day("2024-06-30T01:02:03").unwrap(), "2024-07-01T01:02:03");
    }

    #[test]
    fn test_update_day_rejects_garbage() {
        let err = update_day("invalid-date").unwrap_err();
        assert_eq!(err.input, "invalid-date");
    }

    #[test]
    fn test_night_label() {
        let jd = utc_to_julian_date("2024-02-28T23:59:00Z").unwrap();
        assert_eq!(night_label(jd), "20240228");
    }
}
