use std::time::Duration;

/// Result type for observatory operations
pub type HardwareResult<T> = Result<T, HardwareError>;

/// Failures reported by, or on behalf of, the observatory hardware.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HardwareError {
    /// An operation did not complete in time.
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// A commanded slew would point below the safety floor.
    #[error(
        "Refusing slew to RA {ra:.4} Dec {dec:.4}: altitude {altitude:.2} deg is below the {floor:.2} deg safety floor"
    )]
    SlewSafetyViolation {
        ra: f64,
        dec: f64,
        altitude: f64,
        floor: f64,
    },

    /// Every slew attempt failed.
    #[error("Slew failed after {attempts} attempts: {last}")]
    SlewFailed { attempts: u32, last: String },

    /// Any other driver-reported failure.
    #[error("Device error: {0}")]
    Device(String),
}

impl HardwareError {
    pub fn device(message: impl Into<String>) -> Self {
        Self::Device(message.into())
    }

    pub fn timeout(operation: &'static str, after: Duration) -> Self {
        Self::Timeout { operation, after }
    }

    /// A safety violation ends the night; every other failure only affects the
    /// current request.
    pub fn requires_shutdown(&self) -> bool {
        matches!(self, Self::SlewSafetyViolation { .. })
    }
}
