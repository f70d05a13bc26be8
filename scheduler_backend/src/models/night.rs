use qtty::{Degrees, HourAngles};
use serde::{Deserialize, Serialize};

use crate::astro::{local_sidereal_time, twilight_times, MoonPosition, SiteLocation};
use crate::error::GeometryResult;
use crate::time::{night_label, JulianDate};

/// Elevation limit used when none is configured.
pub const DEFAULT_ELEVATION_LIMIT_DEG: f64 = 10.0;
/// Minimum Moon separation used when none is configured.
pub const DEFAULT_MIN_MOON_OFFSET_DEG: f64 = 15.0;

/// Visibility thresholds a target has to clear.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObservingLimits {
    pub elevation_limit: Degrees,
    pub min_moon_offset: Degrees,
}

impl Default for ObservingLimits {
    fn default() -> Self {
        Self {
            elevation_limit: Degrees::new(DEFAULT_ELEVATION_LIMIT_DEG),
            min_moon_offset: Degrees::new(DEFAULT_MIN_MOON_OFFSET_DEG),
        }
    }
}

/// Dark interval being observed: evening to morning twilight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Night {
    pub sunset: JulianDate,
    pub sunrise: JulianDate,
}

impl Night {
    pub fn new(sunset: JulianDate, sunrise: JulianDate) -> Self {
        Self { sunset, sunrise }
    }

    /// The night in progress at `now`, or the next one if the Sun is up.
    ///
    /// Evening twilight comes from the solar day containing `now` and morning
    /// twilight from the following one. Once that morning has passed the
    /// computation moves one day ahead.
    pub fn tonight(site: &SiteLocation, now: JulianDate) -> GeometryResult<Self> {
        let night = Self::starting_on(site, now)?;
        if now > night.sunrise {
            return Self::starting_on(site, now.plus_days(1.0));
        }
        Ok(night)
    }

    fn starting_on(site: &SiteLocation, day: JulianDate) -> GeometryResult<Self> {
        let (_, sunset) = twilight_times(day, site)?;
        let (sunrise, _) = twilight_times(day.plus_days(1.0), site)?;
        Ok(Self { sunset, sunrise })
    }

    pub fn is_dark(&self, now: JulianDate) -> bool {
        self.sunset <= now && now <= self.sunrise
    }

    pub fn has_ended(&self, now: JulianDate) -> bool {
        now > self.sunrise
    }

    pub fn hours(&self) -> f64 {
        self.sunrise.days_after(self.sunset) * 24.0
    }

    /// `yyyymmdd` of the evening the night starts on.
    pub fn label(&self) -> String {
        night_label(self.sunset)
    }
}

/// Immutable snapshot of everything a selection pass depends on.
///
/// Built once per pass so filtering and ranking never read ambient state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NightContext {
    pub night: Night,
    pub now: JulianDate,
    pub local_sidereal_time: HourAngles,
    pub site: SiteLocation,
    pub moon: MoonPosition,
    pub limits: ObservingLimits,
    pub weather_safe: bool,
}

impl NightContext {
    pub fn snapshot(
        night: Night,
        site: SiteLocation,
        limits: ObservingLimits,
        now: JulianDate,
        moon: MoonPosition,
        weather_safe: bool,
    ) -> Self {
        Self {
            night,
            now,
            local_sidereal_time: local_sidereal_time(now, site.longitude),
            site,
            moon,
            limits,
            weather_safe,
        }
    }

    pub fn sunset(&self) -> JulianDate {
        self.night.sunset
    }

    pub fn sunrise(&self) -> JulianDate {
        self.night.sunrise
    }
}
