//! Simulated observatory.
//!
//! Every command is recorded and takes simulated time on the Tokio timer, so a
//! night under a paused runtime replays the exact command sequence the real
//! hardware would have seen. Failures can be injected per command kind.

use async_trait::async_trait;
use log::{debug, info};
use qtty::{Degrees, Seconds};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{CalibrationRequest, ExposureRequest, HardwareError, HardwareResult, Observatory};
use crate::astro::{altitude_of, local_sidereal_time, SiteLocation};
use crate::models::FrameFilter;
use crate::time::Clock;

const SLEW_SETTLE: Duration = Duration::from_secs(10);
const READOUT: Duration = Duration::from_secs(2);

/// One command received by a [`SimulatedObservatory`].
#[derive(Debug, Clone, PartialEq)]
pub enum ObservatoryCommand {
    Prepare,
    Slew { ra: Degrees, dec: Degrees },
    Expose { duration: Seconds, filter: FrameFilter },
    Recalibrate { ra: Degrees, dec: Degrees, dark_frames: u32 },
    Shutdown,
}

#[derive(Debug, Default)]
struct SimulatedState {
    commands: Vec<ObservatoryCommand>,
    frames_written: usize,
    slew_failures_remaining: u32,
    failing_exposures: u32,
    hanging_exposures: u32,
    camera_offline: bool,
    altitude_override: Option<Degrees>,
}

/// In-process observatory that answers pointing queries from the real sky.
#[derive(Clone)]
pub struct SimulatedObservatory {
    site: SiteLocation,
    clock: Arc<dyn Clock>,
    state: Arc<Mutex<SimulatedState>>,
}

impl SimulatedObservatory {
    pub fn new(site: SiteLocation, clock: Arc<dyn Clock>) -> Self {
        Self {
            site,
            clock,
            state: Arc::new(Mutex::new(SimulatedState::default())),
        }
    }

    /// Make the next `n` slews fail.
    pub fn with_slew_failures(self, n: u32) -> Self {
        self.lock().slew_failures_remaining = n;
        self
    }

    /// Make the next `n` exposures report a device error.
    pub fn with_failing_exposures(self, n: u32) -> Self {
        self.lock().failing_exposures = n;
        self
    }

    /// Make the next `n` exposures never finish.
    pub fn with_hanging_exposures(self, n: u32) -> Self {
        self.lock().hanging_exposures = n;
        self
    }

    /// Make every exposure fail at once, without spending any time.
    pub fn with_camera_offline(self) -> Self {
        self.lock().camera_offline = true;
        self
    }

    /// Report this altitude for every target instead of computing it.
    pub fn with_altitude_override(self, altitude: Degrees) -> Self {
        self.lock().altitude_override = Some(altitude);
        self
    }

    /// Every command received so far, oldest first.
    pub fn commands(&self) -> Vec<ObservatoryCommand> {
        self.lock().commands.clone()
    }

    /// Number of exposures that produced an image.
    pub fn frames_written(&self) -> usize {
        self.lock().frames_written
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SimulatedState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, command: ObservatoryCommand) {
        debug!("Simulated observatory: {:?}", command);
        self.lock().commands.push(command);
    }
}

fn as_duration(seconds: Seconds) -> Duration {
    Duration::try_from_secs_f64(seconds.value()).unwrap_or_default()
}

#[async_trait]
impl Observatory for SimulatedObservatory {
    async fn prepare(&self) -> HardwareResult<()> {
        self.record(ObservatoryCommand::Prepare);
        Ok(())
    }

    async fn current_altitude(&self, ra: Degrees, dec: Degrees) -> HardwareResult<Degrees> {
        if let Some(altitude) = self.lock().altitude_override {
            return Ok(altitude);
        }
        let lst = local_sidereal_time(self.clock.now_jd(), self.site.longitude);
        Ok(altitude_of(ra, dec, lst, self.site.latitude))
    }

    async fn slew_to(&self, ra: Degrees, dec: Degrees) -> HardwareResult<()> {
        self.record(ObservatoryCommand::Slew { ra, dec });
        let fail = {
            let mut state = self.lock();
            if state.slew_failures_remaining > 0 {
                state.slew_failures_remaining -= 1;
                true
            } else {
                false
            }
        };
        tokio::time::sleep(SLEW_SETTLE).await;
        if fail {
            return Err(HardwareError::device("Mount did not reach the target"));
        }
        Ok(())
    }

    async fn expose(&self, exposure: &ExposureRequest) -> HardwareResult<PathBuf> {
        self.record(ObservatoryCommand::Expose {
            duration: exposure.duration,
            filter: exposure.filter,
        });

        let (hang, fail) = {
            let mut state = self.lock();
            if state.camera_offline {
                return Err(HardwareError::device("Camera not connected"));
            }
            if state.hanging_exposures > 0 {
                state.hanging_exposures -= 1;
                (true, false)
            } else if state.failing_exposures > 0 {
                state.failing_exposures -= 1;
                (false, true)
            } else {
                (false, false)
            }
        };
        if hang {
            std::future::pending::<()>().await;
        }

        tokio::time::sleep(as_duration(exposure.duration) + READOUT).await;
        if fail {
            return Err(HardwareError::device("Camera readout failed"));
        }

        let frame = {
            let mut state = self.lock();
            state.frames_written += 1;
            state.frames_written
        };
        Ok(exposure
            .output_dir
            .join(format!("{}_{:05}.fits", exposure.filter.as_str(), frame)))
    }

    async fn recalibrate(&self, calibration: &CalibrationRequest) -> HardwareResult<()> {
        self.record(ObservatoryCommand::Recalibrate {
            ra: calibration.ra,
            dec: calibration.dec,
            dark_frames: calibration.dark_frames,
        });
        // One pointing frame, then the darks.
        let frames = 1 + calibration.dark_frames;
        tokio::time::sleep(as_duration(calibration.exposure) * frames).await;
        Ok(())
    }

    async fn shutdown(&self) -> HardwareResult<()> {
        info!("Simulated observatory parked and closed");
        self.record(ObservatoryCommand::Shutdown);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Binning;
    use crate::time::SimulatedClock;
    use chrono::TimeZone;

    fn observatory() -> SimulatedObservatory {
        let clock = SimulatedClock::starting_at(chrono::Utc.with_ymd_and_hms(2024, 3, 2, 4, 0, 0).unwrap());
        SimulatedObservatory::new(
            SiteLocation::new(Degrees::new(43.1925), Degrees::new(-81.3158)),
            Arc::new(clock),
        )
    }

    fn exposure() -> ExposureRequest {
        ExposureRequest {
            duration: Seconds::new(30.0),
            filter: FrameFilter::Normal,
            binning: Binning::One,
            output_dir: PathBuf::from("/data/20240301/M42"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_exposure_takes_its_duration_plus_readout() {
        let obs = observatory();
        let started = tokio::time::Instant::now();
        let path = obs.expose(&exposure()).await.unwrap();

        assert_eq!(started.elapsed(), Duration::from_secs(32));
        assert_eq!(path, PathBuf::from("/data/20240301/M42/normal_00001.fits"));
        assert_eq!(obs.frames_written(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_offline_camera_fails_immediately() {
        let obs = observatory().with_camera_offline();
        let started = tokio::time::Instant::now();
        assert!(matches!(obs.expose(&exposure()).await, Err(HardwareError::Device(_))));
        assert_eq!(started.elapsed(), Duration::ZERO);
        assert_eq!(obs.frames_written(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_exposure_never_returns() {
        let obs = observatory().with_hanging_exposures(1);
        let result = tokio::time::timeout(Duration::from_secs(600), obs.expose(&exposure())).await;
        assert!(result.is_err());

        // Only the first exposure hangs.
        assert!(obs.expose(&exposure()).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_exposure_is_a_device_error() {
        let obs = observatory().with_failing_exposures(1);
        let err = obs.expose(&exposure()).await.unwrap_err();
        assert!(matches!(err, HardwareError::Device(_)));
        assert_eq!(obs.frames_written(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_altitude_follows_the_sky() {
        let obs = observatory();
        // The celestial pole sits at the site latitude.
        let alt = obs
            .current_altitude(Degrees::new(0.0), Degrees::new(90.0))
            .await
            .unwrap();
        assert!((alt.value() - 43.1925).abs() < 1e-6);
    }
}
