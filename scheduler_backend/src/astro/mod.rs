//! Positional astronomy for the scheduler.
//!
//! Everything here is a pure function of its inputs: sidereal time from a
//! Julian Date and longitude, horizontal ↔ equatorial transforms, twilight
//! times, and an approximate lunar ephemeris.

pub mod coordinates;
pub mod moon;
pub mod sidereal;
pub mod twilight;

use qtty::Degrees;
use serde::{Deserialize, Serialize};

pub use coordinates::{
    altitude_of, horizontal_to_equatorial, hour_angle, moon_separation, validate_equatorial,
};
pub use moon::{approximate_moon_position, LunarEphemeris, MoonPosition, MoonProvider};
pub use sidereal::{greenwich_mean_sidereal_time, local_sidereal_time};
pub use twilight::{twilight_times, TWILIGHT_ALTITUDE_DEG};

/// Geographic position of the observatory. Longitude is east-positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SiteLocation {
    pub latitude: Degrees,
    pub longitude: Degrees,
}

impl SiteLocation {
    pub fn new(latitude: Degrees, longitude: Degrees) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}
