//! The nightly state machine.
//!
//! ```text
//!            ┌──────────── WAITING ◄───────────┐
//!            ▼                                 │
//!   INIT ─► SELECTING ─► EXECUTING ─► RECORDING ┘
//!            │                │
//!            └──────► DONE ◄──┘
//! ```
//!
//! The loop is strictly sequential: one state runs at a time and every state
//! returns the next one. Cancellation is checked between states and inside
//! waits, and always leads through DONE.

use log::{debug, error, info, warn};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::error::SchedulerError;
use super::execution::{ExecutionOutcome, ObservationRunner, RunReport};
use crate::algorithms::select_best;
use crate::astro::{LunarEphemeris, MoonProvider};
use crate::config::SchedulerConfig;
use crate::db::{PendingRequests, RepositoryError, RequestRepository};
use crate::hardware::{Observatory, WeatherFlag, WeatherGate};
use crate::models::{CsvIndex, Night, NightContext, ScoredRequest};
use crate::time::{Clock, JulianDate, SystemClock};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Why the loop is idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitReason {
    UntilSunset,
    NothingObservable,
    UnsafeWeather,
    StoreUnavailable,
}

/// Why the night ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DoneReason {
    Sunrise,
    PoolExhausted,
    SafetyShutdown,
    Cancelled,
}

#[derive(Debug)]
enum LoopState {
    Init,
    Selecting,
    Waiting(WaitReason),
    Executing(Box<ScoredRequest>),
    Recording { index: CsvIndex, report: RunReport },
    Done(DoneReason),
}

impl LoopState {
    fn name(&self) -> &'static str {
        match self {
            LoopState::Init => "INIT",
            LoopState::Selecting => "SELECTING",
            LoopState::Waiting(_) => "WAITING",
            LoopState::Executing(_) => "EXECUTING",
            LoopState::Recording { .. } => "RECORDING",
            LoopState::Done(_) => "DONE",
        }
    }
}

/// Outcome of one night.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NightSummary {
    pub night: Option<Night>,
    pub reason: DoneReason,
    /// Requests marked completed, in the order they were observed.
    pub completed: Vec<CsvIndex>,
    /// Requests whose run failed and were left incomplete.
    pub failed: Vec<CsvIndex>,
    /// Rows moved to the next night at the end.
    pub rescheduled: Vec<CsvIndex>,
    pub passes: u32,
    pub exposures: u32,
}

/// Mutable bookkeeping of one `run`.
struct NightRun {
    night: Option<Night>,
    pending: Option<PendingRequests>,
    completed: Vec<CsvIndex>,
    failed: Vec<CsvIndex>,
    passes: u32,
    exposures: u32,
}

/// Runs one night of observations.
///
/// # Example
/// ```ignore
/// let scheduler = NightScheduler::new(store, observatory, config)
///     .with_clock(Arc::new(SystemClock));
/// let summary = scheduler.run().await?;
/// ```
pub struct NightScheduler {
    store: Arc<dyn RequestRepository>,
    observatory: Arc<dyn Observatory>,
    weather: Arc<dyn WeatherGate>,
    moon: Arc<dyn MoonProvider>,
    clock: Arc<dyn Clock>,
    config: SchedulerConfig,
    cancel: CancellationToken,
}

impl NightScheduler {
    /// Scheduler with clear weather, the built-in lunar ephemeris and the
    /// system clock.
    pub fn new(
        store: Arc<dyn RequestRepository>,
        observatory: Arc<dyn Observatory>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            store,
            observatory,
            weather: Arc::new(WeatherFlag::default()),
            moon: Arc::new(LunarEphemeris),
            clock: Arc::new(SystemClock),
            config,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_weather(mut self, weather: Arc<dyn WeatherGate>) -> Self {
        self.weather = weather;
        self
    }

    pub fn with_moon(mut self, moon: Arc<dyn MoonProvider>) -> Self {
        self.moon = moon;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that ends the night when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Snapshot of the sky and limits at `now` for `night`.
    pub fn context(&self, night: Night, now: JulianDate) -> NightContext {
        NightContext::snapshot(
            night,
            self.config.site(),
            self.config.limits(),
            now,
            self.moon.position(now),
            self.weather.is_safe(),
        )
    }

    /// Ranked plan for the current instant, without touching the hardware.
    pub async fn plan_now(&self) -> Result<Vec<ScoredRequest>, SchedulerError> {
        let now = self.clock.now_jd();
        let night = Night::tonight(&self.config.site(), now)?;
        let pending = self.store.load_pending().await.map_err(SchedulerError::Store)?;
        let ctx = self.context(night, now);
        Ok(crate::algorithms::plan(&pending.requests, &ctx))
    }

    /// Run the loop until sunrise, an empty pool, a safety shutdown or
    /// cancellation.
    ///
    /// The observatory is always shut down before this returns, and incomplete
    /// requests whose window has closed are moved to the next night.
    pub async fn run(&self) -> Result<NightSummary, SchedulerError> {
        let mut run = NightRun {
            night: None,
            pending: None,
            completed: Vec::new(),
            failed: Vec::new(),
            passes: 0,
            exposures: 0,
        };
        let mut state = LoopState::Init;

        loop {
            // A finished run is always recorded before honouring cancellation.
            if self.cancel.is_cancelled()
                && !matches!(state, LoopState::Done(_) | LoopState::Recording { .. })
            {
                info!("Cancellation requested in {}", state.name());
                state = LoopState::Done(DoneReason::Cancelled);
            }
            debug!("Scheduler state: {}", state.name());

            state = match state {
                LoopState::Init => self.initialize(&mut run).await?,
                LoopState::Selecting => self.select(&mut run),
                LoopState::Waiting(reason) => self.wait(&run, reason).await,
                LoopState::Executing(selected) => self.execute(&mut run, *selected).await,
                LoopState::Recording { index, report } => {
                    self.record(&mut run, index, report).await?
                }
                LoopState::Done(reason) => return self.finish(run, reason).await,
            };
        }
    }

    async fn initialize(&self, run: &mut NightRun) -> Result<LoopState, SchedulerError> {
        if run.night.is_none() {
            let now = self.clock.now_jd();
            let night = match Night::tonight(&self.config.site(), now) {
                Ok(night) => night,
                Err(e) => return Err(self.abort(e.into()).await),
            };
            info!(
                "Night {}: twilight {} to {} ({:.2} h)",
                night.label(),
                night.sunset.to_datetime().format("%Y-%m-%d %H:%M:%S UTC"),
                night.sunrise.to_datetime().format("%Y-%m-%d %H:%M:%S UTC"),
                night.hours()
            );
            run.night = Some(night);
        }

        match self.store.load_pending().await {
            Ok(pending) => {
                run.pending = Some(pending);
                Ok(LoopState::Selecting)
            }
            Err(e) if e.is_retryable() => {
                warn!("Request table unavailable, retrying later: {}", e);
                Ok(LoopState::Waiting(WaitReason::StoreUnavailable))
            }
            Err(e) => {
                error!("Request table unusable: {}", e);
                Err(self.abort(SchedulerError::Store(e)).await)
            }
        }
    }

    fn select(&self, run: &mut NightRun) -> LoopState {
        let (Some(night), Some(pending)) = (run.night, run.pending.as_ref()) else {
            return LoopState::Init;
        };
        let now = self.clock.now_jd();

        if now < night.sunset {
            return LoopState::Waiting(WaitReason::UntilSunset);
        }
        if night.has_ended(now) {
            info!("Morning twilight reached");
            return LoopState::Done(DoneReason::Sunrise);
        }
        if pending.is_empty() {
            info!("No pending requests left");
            return LoopState::Done(DoneReason::PoolExhausted);
        }
        if !self.weather.is_safe() {
            warn!("Weather unsafe, not observing");
            return LoopState::Waiting(WaitReason::UnsafeWeather);
        }

        run.passes += 1;
        let ctx = self.context(night, now);
        match select_best(&pending.requests, &ctx) {
            Some(best) => LoopState::Executing(Box::new(best)),
            None => LoopState::Waiting(WaitReason::NothingObservable),
        }
    }

    async fn wait(&self, run: &NightRun, reason: WaitReason) -> LoopState {
        let now = self.clock.now_jd();
        let (duration, next) = match reason {
            WaitReason::UntilSunset => {
                let until = run
                    .night
                    .map(|n| seconds_between(now, n.sunset) + Duration::from_secs(1))
                    .unwrap_or(Duration::ZERO);
                (until, LoopState::Selecting)
            }
            WaitReason::NothingObservable => {
                (self.capped_at_sunrise(run, now, self.config.idle_backoff()), LoopState::Init)
            }
            WaitReason::UnsafeWeather => (
                self.capped_at_sunrise(run, now, self.config.weather_backoff()),
                LoopState::Selecting,
            ),
            WaitReason::StoreUnavailable => (self.config.store_retry(), LoopState::Init),
        };

        info!("Waiting {:?} ({:?})", duration, reason);
        tokio::select! {
            _ = self.cancel.cancelled() => LoopState::Done(DoneReason::Cancelled),
            _ = tokio::time::sleep(duration) => next,
        }
    }

    // Idle waits never overshoot the end of the night by more than a second.
    fn capped_at_sunrise(&self, run: &NightRun, now: JulianDate, backoff: Duration) -> Duration {
        match run.night {
            Some(night) => backoff.min(seconds_between(now, night.sunrise) + Duration::from_secs(1)),
            None => backoff,
        }
    }

    async fn execute(&self, run: &mut NightRun, selected: ScoredRequest) -> LoopState {
        let index = selected.request().csv_index;
        let label = run.night.map(|n| n.label()).unwrap_or_default();
        let output_dir: PathBuf = self
            .config
            .execution
            .data_root
            .join(label)
            .join(selected.name());

        let runner = ObservationRunner::new(
            self.observatory.as_ref(),
            self.clock.as_ref(),
            &self.cancel,
            &self.config,
        );
        match runner.run(&selected, output_dir).await {
            Ok(ExecutionOutcome::Completed(report)) => {
                run.exposures += report.exposures;
                LoopState::Recording { index, report }
            }
            Ok(ExecutionOutcome::Cancelled(report)) => {
                run.exposures += report.exposures;
                warn!("{} interrupted; left incomplete", selected.name());
                run.failed.push(index);
                LoopState::Done(DoneReason::Cancelled)
            }
            Err(e) if e.requires_shutdown() => {
                error!("{}: {}; ending the night", selected.name(), e);
                run.failed.push(index);
                LoopState::Done(DoneReason::SafetyShutdown)
            }
            Err(e) => {
                warn!("{} left incomplete: {}", selected.name(), e);
                run.failed.push(index);
                LoopState::Selecting
            }
        }
    }

    async fn record(
        &self,
        run: &mut NightRun,
        index: CsvIndex,
        report: RunReport,
    ) -> Result<LoopState, SchedulerError> {
        let Some(pending) = run.pending.as_ref() else {
            return Ok(LoopState::Init);
        };
        let mut rows = pending.rows.clone();
        if let Err(e) = rows.mark_completed(index) {
            let e = RepositoryError::from(e).with_operation("mark_completed");
            error!("Row {} observed but not recorded: {}", index, e);
            run.failed.push(index);
            return Ok(LoopState::Init);
        }
        if let Err(e) = self.store.commit(&rows).await {
            error!("Failed to record row {}: {}", index, e);
            return Err(self.abort(SchedulerError::StoreCommit(e)).await);
        }
        info!(
            "Row {} completed ({} images written)",
            index,
            report.images.len()
        );
        run.completed.push(index);
        Ok(LoopState::Init)
    }

    async fn finish(&self, run: NightRun, reason: DoneReason) -> Result<NightSummary, SchedulerError> {
        info!("Ending the night: {:?}", reason);
        self.shutdown_observatory().await;

        let now = self.clock.now_jd();
        let mut rescheduled = Vec::new();
        let rows = match run.pending {
            Some(pending) => Some(pending.rows),
            None => match self.store.load_pending().await {
                Ok(pending) => Some(pending.rows),
                Err(e) => {
                    warn!("Skipping end-of-night rescheduling: {}", e);
                    None
                }
            },
        };
        if let Some(mut rows) = rows {
            let report = rows.reschedule_expired(now);
            if !report.rescheduled.is_empty() {
                if let Err(e) = self.store.commit(&rows).await {
                    error!("Failed to save rescheduled rows: {}", e);
                    return Err(SchedulerError::StoreCommit(e));
                }
                info!("Moved {} expired requests to the next night", report.rescheduled.len());
            }
            rescheduled = report.rescheduled;
        }

        let summary = NightSummary {
            night: run.night,
            reason,
            completed: run.completed,
            failed: run.failed,
            rescheduled,
            passes: run.passes,
            exposures: run.exposures,
        };
        info!(
            "Night summary: {} completed, {} failed, {} rescheduled, {} passes",
            summary.completed.len(),
            summary.failed.len(),
            summary.rescheduled.len(),
            summary.passes
        );
        Ok(summary)
    }

    async fn shutdown_observatory(&self) {
        if let Err(e) = self.observatory.shutdown().await {
            error!("Observatory shutdown failed: {}", e);
        }
    }

    async fn abort(&self, err: SchedulerError) -> SchedulerError {
        error!("Fatal scheduler error: {}", err);
        self.shutdown_observatory().await;
        err
    }
}

fn seconds_between(from: JulianDate, to: JulianDate) -> Duration {
    let secs = to.days_after(from) * SECONDS_PER_DAY;
    Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or_default()
}
