//! Observatory collaborators.
//!
//! The scheduler drives hardware only through the [`Observatory`] trait and
//! reads the sky condition through [`WeatherGate`]. Device drivers live outside
//! this crate; [`SimulatedObservatory`] stands in for them in dry runs and tests.
//!
//! # Modules
//!
//! - [`error`]: hardware error taxonomy
//! - [`slew`]: safety-checked slewing with bounded retry
//! - [`weather`]: weather gate implementations
//! - [`simulated`]: simulated observatory

pub mod error;
pub mod simulated;
pub mod slew;
pub mod weather;

use async_trait::async_trait;
use qtty::{Degrees, Seconds};
use std::path::PathBuf;

pub use error::{HardwareError, HardwareResult};
pub use simulated::{ObservatoryCommand, SimulatedObservatory};
pub use slew::{safe_slew, slew_with_retry, RetryPolicy};
pub use weather::{WeatherFlag, WeatherGate};

use crate::models::{Binning, FrameFilter};

/// One exposure to take.
#[derive(Debug, Clone, PartialEq)]
pub struct ExposureRequest {
    pub duration: Seconds,
    pub filter: FrameFilter,
    pub binning: Binning,
    /// Directory the image lands in.
    pub output_dir: PathBuf,
}

/// Re-point on the current target and refresh dark frames.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationRequest {
    pub ra: Degrees,
    pub dec: Degrees,
    pub exposure: Seconds,
    pub binning: Binning,
    pub dark_frames: u32,
    pub output_dir: PathBuf,
}

/// Telescope, dome and camera as one unit.
///
/// Every method may suspend until the hardware reports completion.
#[async_trait]
pub trait Observatory: Send + Sync {
    /// Connect, open the dome and start tracking.
    async fn prepare(&self) -> HardwareResult<()>;

    /// Altitude the mount reports for a position. Checked before every slew.
    async fn current_altitude(&self, ra: Degrees, dec: Degrees) -> HardwareResult<Degrees>;

    /// Point at a position. Returns once the slew has settled.
    async fn slew_to(&self, ra: Degrees, dec: Degrees) -> HardwareResult<()>;

    /// Take one exposure and return where the image was written.
    async fn expose(&self, exposure: &ExposureRequest) -> HardwareResult<PathBuf>;

    /// Correct the pointing on the current target and take dark frames.
    async fn recalibrate(&self, calibration: &CalibrationRequest) -> HardwareResult<()>;

    /// Stop tracking, park the telescope and close the dome.
    async fn shutdown(&self) -> HardwareResult<()>;
}
