pub mod clock;
pub mod julian;
pub mod timestamp;

pub use clock::{Clock, SimulatedClock, SystemClock};
pub use julian::{JulianDate, J2000_JD, UNIX_EPOCH_JD};
pub use timestamp::{
    format_timestamp, julian_date_to_utc, night_label, parse_timestamp, update_day,
    utc_to_julian_date, TimestampLayout,
};
