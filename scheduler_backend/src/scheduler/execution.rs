//! Running one selected request on the observatory.

use log::{info, warn};
use qtty::Seconds;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::SchedulerConfig;
use crate::hardware::{
    safe_slew, CalibrationRequest, ExposureRequest, HardwareError, HardwareResult, Observatory,
};
use crate::models::{ObservationRequest, ScoredRequest};
use crate::time::Clock;

/// Shortest time an exposure attempt occupies, failed or not.
const MIN_FRAME_SLOT: Duration = Duration::from_secs(1);

/// What happened during one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    pub slew_attempts: u32,
    pub exposures: u32,
    pub failed_exposures: u32,
    pub recalibrations: u32,
    pub images: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    /// The full observation duration was spent on the target.
    Completed(RunReport),
    /// Cancellation was requested before the run finished.
    Cancelled(RunReport),
}

/// Number of exposures between two recalibrations: enough exposures to fill
/// `interval_min` minutes, at least one.
pub fn exposures_per_recalibration(exposure: Seconds, interval_min: f64) -> u32 {
    let exposure_secs = exposure.value().max(1.0);
    let n = (interval_min * 60.0 / exposure_secs).ceil();
    if n.is_finite() && n >= 1.0 {
        n.min(u32::MAX as f64) as u32
    } else {
        1
    }
}

/// Drives the observatory through prepare, slew and the exposure loop.
pub struct ObservationRunner<'a> {
    observatory: &'a dyn Observatory,
    clock: &'a dyn Clock,
    cancel: &'a CancellationToken,
    config: &'a SchedulerConfig,
}

impl<'a> ObservationRunner<'a> {
    pub fn new(
        observatory: &'a dyn Observatory,
        clock: &'a dyn Clock,
        cancel: &'a CancellationToken,
        config: &'a SchedulerConfig,
    ) -> Self {
        Self {
            observatory,
            clock,
            cancel,
            config,
        }
    }

    /// Await `operation`, or give up as soon as cancellation is requested.
    async fn or_cancelled<F: Future>(&self, operation: F) -> Option<F::Output> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            output = operation => Some(output),
        }
    }

    /// Observe `selected` until its observation duration has elapsed.
    ///
    /// Exposures are taken back to back. A recalibration precedes the first
    /// exposure and then every [`exposures_per_recalibration`] exposures. Each
    /// exposure is bounded by its duration plus the configured margin. A driver
    /// error on a single exposure is counted and the loop carries on once that
    /// frame's exposure time has passed.
    ///
    /// Every hardware wait, slew retries included, ends early on cancellation.
    ///
    /// # Errors
    /// * [`HardwareError::SlewSafetyViolation`] - target below the safety floor;
    ///   the observatory has already been asked to shut down
    /// * [`HardwareError::SlewFailed`] - every slew attempt failed
    /// * [`HardwareError::Timeout`] - an exposure did not complete in time
    /// * [`HardwareError::Device`] - prepare or recalibration failed, or no
    ///   exposure produced an image
    pub async fn run(
        &self,
        selected: &ScoredRequest,
        output_dir: PathBuf,
    ) -> HardwareResult<ExecutionOutcome> {
        let request = selected.request();
        let ra = selected.annotated.ra;
        let dec = selected.annotated.dec;
        let mut report = RunReport::default();

        info!(
            "Observing {} for {:.1} min ({} s exposures, {} filter, binning {})",
            request.directory_name,
            request.obs_duration.value(),
            request.exposure_time.value(),
            request.filter,
            request.binning.factor()
        );

        let Some(prepared) = self.or_cancelled(self.observatory.prepare()).await else {
            return Ok(self.cancelled(request, report));
        };
        prepared?;

        let slew = safe_slew(
            self.observatory,
            ra,
            dec,
            self.config.safety_floor(),
            self.config.retry_policy(),
        );
        let Some(attempts) = self.or_cancelled(slew).await else {
            return Ok(self.cancelled(request, report));
        };
        report.slew_attempts = attempts?;

        let exposure = ExposureRequest {
            duration: request.exposure_time,
            filter: request.filter,
            binning: request.binning,
            output_dir: output_dir.clone(),
        };
        let calibration = CalibrationRequest {
            ra,
            dec,
            exposure: request.exposure_time,
            binning: request.binning,
            dark_frames: self.config.execution.dark_frames,
            output_dir,
        };
        let recalibrate_every = exposures_per_recalibration(
            request.exposure_time,
            self.config.execution.recalibration_interval_min,
        );
        let frame_slot = Duration::try_from_secs_f64(request.exposure_time.value())
            .unwrap_or_default()
            .max(MIN_FRAME_SLOT);
        let timeout = frame_slot + self.config.exposure_timeout_margin();

        let finish = request.finishes_at(self.clock.now_jd());
        let mut taken: u32 = 0;

        while self.clock.now_jd() < finish {
            if self.cancel.is_cancelled() {
                return Ok(self.cancelled(request, report));
            }

            if taken % recalibrate_every == 0 {
                let Some(recalibrated) = self
                    .or_cancelled(self.observatory.recalibrate(&calibration))
                    .await
                else {
                    return Ok(self.cancelled(request, report));
                };
                recalibrated?;
                report.recalibrations += 1;
            }

            let started = Instant::now();
            let attempt = tokio::time::timeout(timeout, self.observatory.expose(&exposure));
            let Some(result) = self.or_cancelled(attempt).await else {
                return Ok(self.cancelled(request, report));
            };
            taken += 1;
            report.exposures = taken;

            match result {
                Err(_) => {
                    warn!(
                        "{}: exposure {} did not finish within {:?}",
                        request.directory_name, taken, timeout
                    );
                    return Err(HardwareError::timeout("expose", timeout));
                }
                Ok(Ok(path)) => report.images.push(path),
                Ok(Err(e)) => {
                    warn!("{}: exposure {} failed: {}", request.directory_name, taken, e);
                    report.failed_exposures += 1;
                    // A failed frame still uses up its slot.
                    let slot = tokio::time::sleep_until(started + frame_slot);
                    if self.or_cancelled(slot).await.is_none() {
                        return Ok(self.cancelled(request, report));
                    }
                }
            }
        }

        info!(
            "{}: {} exposures ({} failed), {} recalibrations",
            request.directory_name, report.exposures, report.failed_exposures, report.recalibrations
        );
        if report.images.is_empty() {
            return Err(HardwareError::device(format!(
                "none of the {} exposures of {} produced an image",
                report.exposures, request.directory_name
            )));
        }
        Ok(ExecutionOutcome::Completed(report))
    }

    fn cancelled(&self, request: &ObservationRequest, report: RunReport) -> ExecutionOutcome {
        info!(
            "{}: cancelled after {} exposures",
            request.directory_name, report.exposures
        );
        ExecutionOutcome::Cancelled(report)
    }
}
