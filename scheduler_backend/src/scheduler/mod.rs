//! Nightly scheduling loop.
//!
//! - [`driver`]: the INIT / SELECTING / EXECUTING / RECORDING / WAITING / DONE
//!   state machine
//! - [`execution`]: one observation run on the observatory
//! - [`error`]: loop-level failures

pub mod driver;
pub mod error;
pub mod execution;

pub use driver::{DoneReason, NightScheduler, NightSummary, WaitReason};
pub use error::SchedulerError;
pub use execution::{exposures_per_recalibration, ExecutionOutcome, ObservationRunner, RunReport};
