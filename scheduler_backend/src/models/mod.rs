//! Domain types of the scheduler.
//!
//! - [`ObservationRequest`]: one row of pending telescope work
//! - [`Night`] and [`NightContext`]: the dark interval and the per-pass snapshot
//! - [`AnnotatedRequest`] / [`ScoredRequest`]: values derived during a pass

pub mod macros;
pub mod night;
pub mod plan;
pub mod request;

pub use crate::astro::{MoonPosition, SiteLocation};
pub use night::{
    Night, NightContext, ObservingLimits, DEFAULT_ELEVATION_LIMIT_DEG, DEFAULT_MIN_MOON_OFFSET_DEG,
};
pub use plan::{AnnotatedRequest, ScoredRequest};
pub use request::{Binning, CsvIndex, FrameFilter, ObservationRequest, Target};
