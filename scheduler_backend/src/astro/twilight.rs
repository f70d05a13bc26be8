//! Twilight times from the sunrise equation.
//!
//! Darkness starts and ends when the Sun's centre crosses
//! [`TWILIGHT_ALTITUDE_DEG`] (nautical twilight). The equation is accurate to a
//! minute or two, which is well inside the slack of a night-long schedule.

use qtty::{Degree, Degrees, Radians};

use super::SiteLocation;
use crate::error::{GeometryError, GeometryResult};
use crate::time::{JulianDate, J2000_JD};

/// Solar altitude that bounds the observing night.
pub const TWILIGHT_ALTITUDE_DEG: f64 = -12.0;

const OBLIQUITY_DEG: f64 = 23.44;

/// Morning and evening twilight of the solar day containing `jd`.
///
/// Returns `(morning, evening)`: morning twilight ends before the solar transit
/// of that day, evening twilight starts after it.
pub fn twilight_times(jd: JulianDate, site: &SiteLocation) -> GeometryResult<(JulianDate, JulianDate)> {
    let n = (jd.value() - J2000_JD + 0.0008).floor();
    let mean_solar_noon = n - site.longitude.value() / 360.0;

    let anomaly = Degrees::new(357.5291 + 0.985_600_28 * mean_solar_noon).wrap_pos();
    let centre = 1.9148 * anomaly.sin()
        + 0.0200 * (anomaly * 2.0).sin()
        + 0.0003 * (anomaly * 3.0).sin();
    let ecliptic_longitude = Degrees::new(anomaly.value() + centre + 180.0 + 102.9372).wrap_pos();

    let transit = J2000_JD + mean_solar_noon + 0.0053 * anomaly.sin()
        - 0.0069 * (ecliptic_longitude * 2.0).sin();

    let sin_dec = ecliptic_longitude.sin() * Degrees::new(OBLIQUITY_DEG).sin();
    let cos_dec = (1.0 - sin_dec * sin_dec).sqrt();
    let horizon = Degrees::new(TWILIGHT_ALTITUDE_DEG);

    let cos_ha = (horizon.sin() - site.latitude.sin() * sin_dec) / (site.latitude.cos() * cos_dec);
    if !cos_ha.is_finite() || !(-1.0..=1.0).contains(&cos_ha) {
        return Err(GeometryError::NoTwilight {
            jd: jd.value(),
            latitude: site.latitude.value(),
            altitude: TWILIGHT_ALTITUDE_DEG,
        });
    }

    let half_arc = Radians::new(cos_ha.acos()).to::<Degree>().value() / 360.0;
    Ok((
        JulianDate::new(transit - half_arc),
        JulianDate::new(transit + half_arc),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::utc_to_julian_date;

    fn elginfield() -> SiteLocation {
        SiteLocation::new(Degrees::new(43.1925), Degrees::new(-81.3158))
    }

    #[test]
    fn test_evening_follows_morning() {
        let jd = utc_to_julian_date("2024-03-01T20:00:00Z").unwrap();
        let (morning, evening) = twilight_times(jd, &elginfield()).unwrap();
        assert!(morning < evening);
        // The dark part of the solar day is well under a full day.
        assert!(evening.days_after(morning) < 1.0);
    }

    #[test]
    fn test_winter_evening_twilight_for_western_site() {
        // Early March in Ontario: nautical twilight ends around 00:20 UTC.
        let jd = utc_to_julian_date("2024-03-01T20:00:00Z").unwrap();
        let (_, evening) = twilight_times(jd, &elginfield()).unwrap();
        let hours_after = evening.days_after(utc_to_julian_date("2024-03-02T00:00:00Z").unwrap()) * 24.0;
        assert!(
            (-1.0..1.5).contains(&hours_after),
            "evening twilight {} h from midnight UTC",
            hours_after
        );
    }

    #[test]
    fn test_no_twilight_in_polar_summer() {
        let site = SiteLocation::new(Degrees::new(78.0), Degrees::new(15.0));
        let jd = utc_to_julian_date("2024-06-21T12:00:00Z").unwrap();
        assert!(matches!(
            twilight_times(jd, &site),
            Err(GeometryError::NoTwilight { .. })
        ));
    }
}
