//! Equatorial ↔ horizontal transforms and angular separation.
//!
//! Azimuth is measured from north through east. Right ascension is carried in
//! degrees throughout; local sidereal time in hour-angle hours.

use qtty::{Degree, Degrees, HourAngles, Radians};

use crate::error::{GeometryError, GeometryResult};

/// Clamp a trigonometric argument that rounding may have pushed past ±1.
#[inline]
fn clamp_unit(x: f64) -> f64 {
    x.clamp(-1.0, 1.0)
}

#[inline]
fn asin_deg(x: f64) -> Degrees {
    Radians::new(clamp_unit(x).asin()).to::<Degree>()
}

#[inline]
fn acos_deg(x: f64) -> Degrees {
    Radians::new(clamp_unit(x).acos()).to::<Degree>()
}

/// Hour angle of a target: `LST - RA`, wrapped to (-180, 180].
pub fn hour_angle(ra: Degrees, lst: HourAngles) -> Degrees {
    (lst.to::<Degree>() - ra).wrap_signed()
}

/// Altitude of a target above the horizon.
///
/// `sin(alt) = sin(lat) sin(dec) + cos(lat) cos(dec) cos(LST - RA)`
pub fn altitude_of(ra: Degrees, dec: Degrees, lst: HourAngles, latitude: Degrees) -> Degrees {
    let ha = hour_angle(ra, lst);
    let sin_alt = latitude.sin() * dec.sin() + latitude.cos() * dec.cos() * ha.cos();
    asin_deg(sin_alt)
}

/// Great-circle separation between a target and the Moon, in [0, 180].
///
/// The spherical law of cosines loses precision for tiny separations, which
/// does not matter against an avoidance radius of several degrees; the cosine
/// argument is clamped so rounding never produces NaN.
pub fn moon_separation(
    ra: Degrees,
    dec: Degrees,
    moon_ra: Degrees,
    moon_dec: Degrees,
) -> Degrees {
    let delta_ra = ra - moon_ra;
    let cos_sep = dec.sin() * moon_dec.sin() + dec.cos() * moon_dec.cos() * delta_ra.cos();
    acos_deg(cos_sep)
}

/// Resolve horizontal coordinates to right ascension and declination.
///
/// Returns `(ra, dec)` with RA wrapped to [0, 360).
pub fn horizontal_to_equatorial(
    alt: Degrees,
    az: Degrees,
    lst: HourAngles,
    latitude: Degrees,
) -> GeometryResult<(Degrees, Degrees)> {
    ensure_finite(alt.value(), "altitude")?;
    ensure_finite(az.value(), "azimuth")?;
    ensure_finite(lst.value(), "sidereal time")?;

    let dec = asin_deg(alt.sin() * latitude.sin() + alt.cos() * latitude.cos() * az.cos());

    let y = -az.sin() * alt.cos();
    let x = alt.sin() * latitude.cos() - alt.cos() * latitude.sin() * az.cos();
    let ha = Radians::new(y.atan2(x)).to::<Degree>();

    let ra = (lst.to::<Degree>() - ha).wrap_pos();
    Ok((ra, dec))
}

/// Reject non-finite values and declinations off the sphere.
pub fn validate_equatorial(ra: Degrees, dec: Degrees) -> GeometryResult<()> {
    ensure_finite(ra.value(), "right ascension")?;
    ensure_finite(dec.value(), "declination")?;
    if !(-90.0..=90.0).contains(&dec.value()) {
        return Err(GeometryError::DeclinationOutOfRange(dec.value()));
    }
    Ok(())
}

fn ensure_finite(value: f64, what: &'static str) -> GeometryResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(GeometryError::NonFinite(what))
    }
}
