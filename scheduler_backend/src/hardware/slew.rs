//! Safety-checked slewing with bounded retry.

use log::{error, info, warn};
use qtty::Degrees;
use std::time::Duration;

use super::{HardwareError, HardwareResult, Observatory};

/// How often, and how patiently, a failed slew is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            backoff: Duration::from_secs(5),
        }
    }
}

/// Slew, retrying after `policy.backoff` until `policy.max_attempts` is used up.
///
/// Returns the number of attempts it took.
pub async fn slew_with_retry(
    observatory: &dyn Observatory,
    ra: Degrees,
    dec: Degrees,
    policy: RetryPolicy,
) -> HardwareResult<u32> {
    let max_attempts = policy.max_attempts.max(1);
    let mut last_error = String::new();

    for attempt in 1..=max_attempts {
        match observatory.slew_to(ra, dec).await {
            Ok(()) => {
                info!(
                    "Slewed to RA {:.4} Dec {:.4} (attempt {})",
                    ra.value(),
                    dec.value(),
                    attempt
                );
                return Ok(attempt);
            }
            Err(e) => {
                warn!("Slew attempt {}/{} failed: {}", attempt, max_attempts, e);
                last_error = e.to_string();
                if attempt < max_attempts {
                    tokio::time::sleep(policy.backoff).await;
                }
            }
        }
    }

    error!("Reached maximum number of slew attempts ({})", max_attempts);
    Err(HardwareError::SlewFailed {
        attempts: max_attempts,
        last: last_error,
    })
}

/// Check the target against the safety floor, then slew with retry.
///
/// A target below `floor` is never slewed to: the observatory is asked to shut
/// down instead and [`HardwareError::SlewSafetyViolation`] is returned.
pub async fn safe_slew(
    observatory: &dyn Observatory,
    ra: Degrees,
    dec: Degrees,
    floor: Degrees,
    policy: RetryPolicy,
) -> HardwareResult<u32> {
    let altitude = observatory.current_altitude(ra, dec).await?;
    if altitude < floor {
        let violation = HardwareError::SlewSafetyViolation {
            ra: ra.value(),
            dec: dec.value(),
            altitude: altitude.value(),
            floor: floor.value(),
        };
        error!("{}", violation);
        if let Err(e) = observatory.shutdown().await {
            error!("Shutdown after safety violation failed: {}", e);
        }
        return Err(violation);
    }
    slew_with_retry(observatory, ra, dec, policy).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::astro::SiteLocation;
    use crate::hardware::{ObservatoryCommand, SimulatedObservatory};
    use crate::time::SimulatedClock;
    use chrono::TimeZone;
    use std::sync::Arc;

    fn observatory() -> SimulatedObservatory {
        let clock = SimulatedClock::starting_at(chrono::Utc.with_ymd_and_hms(2024, 3, 2, 4, 0, 0).unwrap());
        SimulatedObservatory::new(
            SiteLocation::new(Degrees::new(43.1925), Degrees::new(-81.3158)),
            Arc::new(clock),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_until_success() {
        let obs = observatory().with_slew_failures(3);
        let attempts = slew_with_retry(&obs, Degrees::new(10.0), Degrees::new(20.0), RetryPolicy::default())
            .await
            .unwrap();
        assert_eq!(attempts, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_gives_up_after_max_attempts() {
        let obs = observatory().with_slew_failures(100);
        let started = tokio::time::Instant::now();
        let err = slew_with_retry(&obs, Degrees::new(10.0), Degrees::new(20.0), RetryPolicy::default())
            .await
            .unwrap_err();

        assert!(matches!(err, HardwareError::SlewFailed { attempts: 10, .. }));
        let slews = obs
            .commands()
            .iter()
            .filter(|c| matches!(c, ObservatoryCommand::Slew { .. }))
            .count();
        assert_eq!(slews, 10);
        // Ten 10 s settles and nine 5 s backoffs.
        assert_eq!(started.elapsed(), Duration::from_secs(145));
    }

    #[tokio::test(start_paused = true)]
    async fn test_safety_floor_refuses_slew_and_shuts_down() {
        let obs = observatory().with_altitude_override(Degrees::new(3.0));
        let err = safe_slew(
            &obs,
            Degrees::new(10.0),
            Degrees::new(20.0),
            Degrees::new(10.0),
            RetryPolicy::default(),
        )
        .await
        .unwrap_err();

        assert!(err.requires_shutdown());
        let commands = obs.commands();
        assert!(!commands.iter().any(|c| matches!(c, ObservatoryCommand::Slew { .. })));
        assert_eq!(commands.last(), Some(&ObservatoryCommand::Shutdown));
    }
}
