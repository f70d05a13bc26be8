//! Colibri Scheduler Binary
//!
//! Runs one night against the request table named in the configuration, driving
//! the simulated observatory.
//!
//! # Usage
//!
//! ```bash
//! # Observe tonight with colibri.toml (or defaults)
//! colibri-scheduler
//!
//! # Explicit configuration file
//! colibri-scheduler /etc/colibri/colibri.toml
//!
//! # Print the ranked plan for this instant as JSON and exit
//! COLIBRI_MODE=plan colibri-scheduler
//! ```
//!
//! # Environment Variables
//!
//! - `COLIBRI_CONFIG`: configuration file (when no path argument is given)
//! - `COLIBRI_MODE`: `run` (default) or `plan`
//! - `COLIBRI_START`: start the clock at this UTC timestamp instead of now
//! - `RUST_LOG`: Log level (default: info)

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use colibri_scheduler::astro::LunarEphemeris;
use colibri_scheduler::db::CsvRequestStore;
use colibri_scheduler::hardware::{SimulatedObservatory, WeatherFlag};
use colibri_scheduler::time::{parse_timestamp, Clock, SimulatedClock, SystemClock};
use colibri_scheduler::{NightScheduler, SchedulerConfig};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    FmtSubscriber::builder()
        .with_max_level(
            env::var("RUST_LOG")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(Level::INFO),
        )
        .with_target(true)
        .with_thread_ids(true)
        .init();

    info!("Starting Colibri scheduler");

    let explicit = env::args().nth(1).map(PathBuf::from);
    let config = SchedulerConfig::load(explicit.as_deref()).context("loading configuration")?;
    info!("Request table: {}", config.store.path.display());

    let clock: Arc<dyn Clock> = match env::var("COLIBRI_START") {
        Ok(start) => {
            let (anchor, _) = parse_timestamp(&start).context("parsing COLIBRI_START")?;
            info!("Simulated clock starting at {}", anchor);
            Arc::new(SimulatedClock::starting_at(anchor))
        }
        Err(_) => Arc::new(SystemClock),
    };

    let store = Arc::new(CsvRequestStore::new(config.store.path.clone()));
    let observatory = Arc::new(SimulatedObservatory::new(config.site(), clock.clone()));
    let scheduler = NightScheduler::new(store, observatory, config)
        .with_weather(Arc::new(WeatherFlag::default()))
        .with_moon(Arc::new(LunarEphemeris))
        .with_clock(clock);

    if env::var("COLIBRI_MODE").is_ok_and(|mode| mode.eq_ignore_ascii_case("plan")) {
        let plan = scheduler.plan_now().await?;
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    let token = scheduler.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, ending the night");
            token.cancel();
        }
    });

    let summary = scheduler.run().await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
