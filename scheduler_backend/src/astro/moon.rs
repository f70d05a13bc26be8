//! Moon position.
//!
//! [`MoonProvider`] is the seam the scheduler asks for the Moon's equatorial
//! position. [`LunarEphemeris`] is a low-order analytic series good to a few
//! tenths of a degree; a fixed [`MoonPosition`] is itself a provider, which is
//! what tests and replays use.

use qtty::{Degree, Degrees, Radians};
use serde::{Deserialize, Serialize};

use crate::time::JulianDate;

/// Equatorial position of the Moon, both angles in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoonPosition {
    pub ra: Degrees,
    pub dec: Degrees,
}

impl MoonPosition {
    pub fn new(ra: Degrees, dec: Degrees) -> Self {
        Self { ra, dec }
    }
}

/// Source of the Moon's position at a given instant.
pub trait MoonProvider: Send + Sync {
    fn position(&self, at: JulianDate) -> MoonPosition;
}

impl MoonProvider for MoonPosition {
    fn position(&self, _at: JulianDate) -> MoonPosition {
        *self
    }
}

/// Analytic lunar ephemeris.
#[derive(Debug, Clone, Copy, Default)]
pub struct LunarEphemeris;

impl MoonProvider for LunarEphemeris {
    fn position(&self, at: JulianDate) -> MoonPosition {
        approximate_moon_position(at)
    }
}

/// Approximate geocentric equatorial position of the Moon.
pub fn approximate_moon_position(jd: JulianDate) -> MoonPosition {
    let days = jd.days_since_j2000();

    let mean_longitude = Degrees::new(218.316 + 13.176_396 * days).wrap_pos();
    let mean_anomaly = Degrees::new(134.963 + 13.064_993 * days).wrap_pos();
    let argument_of_latitude = Degrees::new(93.272 + 13.229_350 * days).wrap_pos();

    let ecliptic_longitude =
        Degrees::new(mean_longitude.value() + 6.289 * mean_anomaly.sin()).wrap_pos();
    let ecliptic_latitude = Degrees::new(5.128 * argument_of_latitude.sin());

    let obliquity = Degrees::new(23.439 - 0.000_000_4 * days);

    let ra = Radians::new(
        (ecliptic_longitude.sin() * obliquity.cos() - ecliptic_latitude.tan() * obliquity.sin())
            .atan2(ecliptic_longitude.cos()),
    )
    .to::<Degree>()
    .wrap_pos();
    let sin_dec = ecliptic_latitude.sin() * obliquity.cos()
        + ecliptic_latitude.cos() * obliquity.sin() * ecliptic_longitude.sin();
    let dec = Radians::new(sin_dec.clamp(-1.0, 1.0).asin()).to::<Degree>();

    MoonPosition { ra, dec }
}
