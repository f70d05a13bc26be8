use qtty::{Degree, Degrees, HourAngle, HourAngles};

use crate::time::JulianDate;

/// Greenwich mean sidereal time (IAU 1982 polynomial), wrapped to [0, 24) h.
pub fn greenwich_mean_sidereal_time(jd: JulianDate) -> HourAngles {
    let d = jd.days_since_j2000();
    let t = jd.centuries_since_j2000();
    let gmst = 280.460_618_37 + 360.985_647_366_29 * d + 0.000_387_933 * t * t
        - t * t * t / 38_710_000.0;
    Degrees::new(gmst).wrap_pos().to::<HourAngle>()
}

/// Local mean sidereal time for an east-positive longitude, wrapped to [0, 24) h.
pub fn local_sidereal_time(jd: JulianDate, longitude: Degrees) -> HourAngles {
    let gmst = greenwich_mean_sidereal_time(jd).to::<Degree>();
    (gmst + longitude).wrap_pos().to::<HourAngle>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::J2000_JD;

    #[test]
    fn test_gmst_at_j2000() {
        let gmst = greenwich_mean_sidereal_time(JulianDate::new(J2000_JD));
        assert!((gmst.value() - 18.697_374_558).abs() < 1e-6);
    }

    #[test]
    fn test_gmst_reference_date() {
        // Meeus, example 12.b: 1987-04-10 19:21:00 UT -> 8h 34m 57.0896s
        let gmst = greenwich_mean_sidereal_time(JulianDate::new(2_446_896.306_25));
        let expected = 8.0 + 34.0 / 60.0 + 57.0896 / 3600.0;
        assert!((gmst.value() - expected).abs() < 1e-4);
    }

    #[test]
    fn test_local_sidereal_time_offsets_by_longitude() {
        let jd = JulianDate::new(2_460_368.5);
        let gmst = greenwich_mean_sidereal_time(jd);
        let lst = local_sidereal_time(jd, Degrees::new(-81.3158));
        let diff = (gmst.value() - lst.value()).rem_euclid(24.0);
        assert!((diff - 81.3158 / 15.0).abs() < 1e-9);
        assert!((0.0..24.0).contains(&lst.value()));
    }
}
