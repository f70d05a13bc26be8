use log::{debug, info, warn};
use qtty::Degrees;

use crate::astro::{altitude_of, horizontal_to_equatorial, moon_separation, validate_equatorial};
use crate::error::GeometryResult;
use crate::models::{AnnotatedRequest, NightContext, ObservationRequest, Target};
use crate::time::JulianDate;

/// Whether a request may start at `now` and still finish before sunrise.
///
/// True iff the window is open (`start <= now <= end`), a run of
/// `obs_duration` started now ends by sunrise, and both window bounds lie
/// inside the night.
pub fn within_time_window(
    request: &ObservationRequest,
    sunset: JulianDate,
    sunrise: JulianDate,
    now: JulianDate,
) -> bool {
    let start = request.start_jd;
    let end = request.end_jd;

    start <= now
        && now <= end
        && request.finishes_at(now) <= sunrise
        && sunset <= start
        && start <= sunrise
        && sunset <= end
        && end <= sunrise
}

/// Keep the requests that can be run right now. Order is preserved.
pub fn filter_by_time<'a, I>(
    requests: I,
    sunset: JulianDate,
    sunrise: JulianDate,
    now: JulianDate,
) -> Vec<&'a ObservationRequest>
where
    I: IntoIterator<Item = &'a ObservationRequest>,
{
    requests
        .into_iter()
        .filter(|r| {
            let keep = within_time_window(r, sunset, sunrise, now);
            if !keep {
                debug!(
                    "{}: outside time window ({} .. {})",
                    r.directory_name, r.start_utc, r.end_utc
                );
            }
            keep
        })
        .collect()
}

/// Equatorial coordinates of a request's target for this pass.
pub fn resolve_coordinates(
    request: &ObservationRequest,
    ctx: &NightContext,
) -> GeometryResult<(Degrees, Degrees)> {
    let (ra, dec) = match request.target {
        Target::Equatorial { ra, dec } => (ra, dec),
        Target::Horizontal { alt, az } => {
            horizontal_to_equatorial(alt, az, ctx.local_sidereal_time, ctx.site.latitude)?
        }
    };
    validate_equatorial(ra, dec)?;
    Ok((ra, dec))
}

/// Compute the per-pass geometry of one request.
pub fn annotate(request: &ObservationRequest, ctx: &NightContext) -> GeometryResult<AnnotatedRequest> {
    let (ra, dec) = resolve_coordinates(request, ctx)?;
    let altitude = altitude_of(ra, dec, ctx.local_sidereal_time, ctx.site.latitude);
    let moon_angle = moon_separation(ra, dec, ctx.moon.ra, ctx.moon.dec);
    Ok(AnnotatedRequest {
        request: request.clone(),
        ra,
        dec,
        altitude,
        moon_angle,
    })
}

/// Whether a request clears the elevation limit and keeps away from the Moon.
pub fn meets_astronomy_conditions(annotated: &AnnotatedRequest, ctx: &NightContext) -> bool {
    annotated.altitude > ctx.limits.elevation_limit
        && annotated.moon_angle > ctx.limits.min_moon_offset
}

/// Keep the requests that are high enough and far enough from the Moon.
///
/// Horizontal targets are resolved with the context's sidereal time. A request
/// whose geometry cannot be evaluated is dropped for this pass only. The input
/// is never modified; running the filter twice on the same context gives the
/// same result.
pub fn filter_by_astronomy<'a, I>(requests: I, ctx: &NightContext) -> Vec<AnnotatedRequest>
where
    I: IntoIterator<Item = &'a ObservationRequest>,
{
    let mut kept = Vec::new();
    for request in requests {
        let annotated = match annotate(request, ctx) {
            Ok(a) => a,
            Err(e) => {
                warn!("{}: excluded this pass: {}", request.directory_name, e);
                continue;
            }
        };

        if meets_astronomy_conditions(&annotated, ctx) {
            kept.push(annotated);
        } else {
            debug!(
                "{}: altitude {:.2} deg, moon angle {:.2} deg below limits",
                request.directory_name,
                annotated.altitude.value(),
                annotated.moon_angle.value()
            );
        }
    }
    info!("{} requests pass the visibility filter", kept.len());
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Binning, CsvIndex, FrameFilter, MoonPosition, Night, ObservingLimits, SiteLocation,
    };
    use qtty::{Minutes, Seconds};

    const SUNSET: f64 = 2_460_370.5;
    const SUNRISE: f64 = 2_460_370.95;

    fn request(start: f64, end: f64, duration_min: f64) -> ObservationRequest {
        ObservationRequest {
            csv_index: CsvIndex::new(0),
            directory_name: "T".into(),
            priority: 1,
            target: Target::Equatorial {
                ra: Degrees::new(0.0),
                dec: Degrees::new(0.0),
            },
            start_utc: String::new(),
            end_utc: String::new(),
            start_jd: JulianDate::new(start),
            end_jd: JulianDate::new(end),
            obs_duration: Minutes::new(duration_min),
            exposure_time: Seconds::new(30.0),
            filter: FrameFilter::Normal,
            binning: Binning::One,
        }
    }

    fn window(r: &ObservationRequest, now: f64) -> bool {
        within_time_window(r, JulianDate::new(SUNSET), JulianDate::new(SUNRISE), JulianDate::new(now))
    }

    #[test]
    fn test_open_window() {
        assert!(window(&request(2_460_370.6, 2_460_370.8, 30.0), 2_460_370.7));
    }

    #[test]
    fn test_window_not_yet_open_or_closed() {
        let r = request(2_460_370.6, 2_460_370.8, 30.0);
        assert!(!window(&r, 2_460_370.55));
        assert!(!window(&r, 2_460_370.85));
    }

    #[test]
    fn test_run_would_overrun_sunrise() {
        // 2 hours left before sunrise, 3 hour run.
        let r = request(2_460_370.6, 2_460_370.9, 180.0);
        assert!(!window(&r, 2_460_370.87));
        assert!(window(&request(2_460_370.6, 2_460_370.9, 60.0), 2_460_370.87));
    }

    #[test]
    fn test_window_must_lie_inside_the_night() {
        assert!(!window(&request(2_460_370.4, 2_460_370.8, 10.0), 2_460_370.7));
        assert!(!window(&request(2_460_370.6, 2_460_371.2, 10.0), 2_460_370.7));
    }

    #[test]
    fn test_filter_by_time_keeps_order() {
        let a = request(2_460_370.6, 2_460_370.8, 10.0);
        let b = request(2_460_370.9, 2_460_370.94, 10.0);
        let c = request(2_460_370.55, 2_460_370.75, 10.0);
        let kept = filter_by_time(
            [&a, &b, &c],
            JulianDate::new(SUNSET),
            JulianDate::new(SUNRISE),
            JulianDate::new(2_460_370.7),
        );
        assert_eq!(kept.len(), 2);
        assert!(std::ptr::eq(kept[0], &a));
        assert!(std::ptr::eq(kept[1], &c));
    }

    fn context(moon: MoonPosition) -> NightContext {
        NightContext::snapshot(
            Night::new(JulianDate::new(SUNSET), JulianDate::new(SUNRISE)),
            SiteLocation::new(Degrees::new(43.1925), Degrees::new(-81.3158)),
            ObservingLimits::default(),
            JulianDate::new(2_460_370.7),
            moon,
            true,
        )
    }

    fn overhead(ctx: &NightContext) -> ObservationRequest {
        let mut r = request(SUNSET, SUNRISE, 10.0);
        r.target = Target::Equatorial {
            ra: ctx.local_sidereal_time.to::<qtty::Degree>(),
            dec: ctx.site.latitude,
        };
        r
    }

    #[test]
    fn test_astronomy_keeps_high_targets_away_from_moon() {
        let ctx = context(MoonPosition::new(Degrees::new(0.0), Degrees::new(-60.0)));
        let r = overhead(&ctx);
        let kept = filter_by_astronomy([&r], &ctx);
        assert_eq!(kept.len(), 1);
        assert!(kept[0].altitude.value() > 89.0);
    }

    #[test]
    fn test_astronomy_rejects_target_near_moon() {
        let probe = context(MoonPosition::new(Degrees::new(0.0), Degrees::new(0.0)));
        let r = overhead(&probe);
        let (ra, dec) = match r.target {
            Target::Equatorial { ra, dec } => (ra, dec),
            _ => unreachable!(),
        };
        let ctx = context(MoonPosition::new(ra + Degrees::new(5.0), dec));
        assert!(filter_by_astronomy([&r], &ctx).is_empty());
    }

    #[test]
    fn test_astronomy_rejects_low_target() {
        let ctx = context(MoonPosition::new(Degrees::new(0.0), Degrees::new(-60.0)));
        let mut r = request(SUNSET, SUNRISE, 10.0);
        r.target = Target::Horizontal {
            alt: Degrees::new(5.0),
            az: Degrees::new(200.0),
        };
        assert!(filter_by_astronomy([&r], &ctx).is_empty());
    }

    #[test]
    fn test_horizontal_target_resolves_to_same_altitude() {
        let ctx = context(MoonPosition::new(Degrees::new(0.0), Degrees::new(-60.0)));
        let mut r = request(SUNSET, SUNRISE, 10.0);
        r.target = Target::Horizontal {
            alt: Degrees::new(55.0),
            az: Degrees::new(120.0),
        };
        let kept = filter_by_astronomy([&r], &ctx);
        assert_eq!(kept.len(), 1);
        assert!((kept[0].altitude.value() - 55.0).abs() < 1e-6);
        // The request itself still carries the horizontal pair.
        assert!(matches!(r.target, Target::Horizontal { .. }));
    }

    #[test]
    fn test_unusable_geometry_excludes_only_that_request() {
        let ctx = context(MoonPosition::new(Degrees::new(0.0), Degrees::new(-60.0)));
        let good = overhead(&ctx);
        let mut bad = overhead(&ctx);
        bad.target = Target::Equatorial {
            ra: Degrees::new(f64::NAN),
            dec: Degrees::new(10.0),
        };
        let kept = filter_by_astronomy([&bad, &good], &ctx);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn test_filter_is_idempotent() {
        let ctx = context(MoonPosition::new(Degrees::new(30.0), Degrees::new(10.0)));
        let mut h = request(SUNSET, SUNRISE, 10.0);
        h.target = Target::Horizontal {
            alt: Degrees::new(40.0),
            az: Degrees::new(45.0),
        };
        let requests = vec![overhead(&ctx), h];
        let first = filter_by_astronomy(&requests, &ctx);
        let second = filter_by_astronomy(&requests, &ctx);
        assert_eq!(first, second);
    }
}
