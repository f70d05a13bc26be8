//! Colibri nightly observation scheduler.
//!
//! The crate drives an unattended observatory through one night: it loads the
//! pending observation requests, keeps the ones that are legal to run right now,
//! ranks them, and hands the best one to the observatory hardware, recording the
//! outcome back into the request table after every run.
//!
//! # Layout
//!
//! - [`time`]: Julian Dates, timestamp rollover, clocks
//! - [`astro`]: sidereal time, horizontal coordinates, twilight and the Moon
//! - [`models`]: requests, night context and derived per-pass values
//! - [`parsing`]: request-table row parsing
//! - [`db`]: request storage (CSV file and in-memory)
//! - [`transformations`]: time-window and visibility filtering
//! - [`algorithms`]: ranking and best-request selection
//! - [`hardware`]: observatory, weather gate and the simulated observatory
//! - [`scheduler`]: the nightly state machine
//! - [`config`]: TOML configuration

pub mod algorithms;
pub mod astro;
pub mod config;
pub mod db;
pub mod error;
pub mod hardware;
pub mod models;
pub mod parsing;
pub mod scheduler;
pub mod time;
pub mod transformations;

pub use config::{ConfigError, SchedulerConfig};
pub use error::{DateRolloverError, GeometryError, ParseError, RowParseError};
pub use models::{
    AnnotatedRequest, CsvIndex, NightContext, ObservationRequest, ScoredRequest, Target,
};
pub use scheduler::{NightScheduler, NightSummary, SchedulerError};
pub use time::JulianDate;
