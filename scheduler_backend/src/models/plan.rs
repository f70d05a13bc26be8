use qtty::Degrees;
use serde::{Deserialize, Serialize};

use super::request::ObservationRequest;

/// A request that survived the visibility filter, with the geometry computed
/// for the current pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedRequest {
    pub request: ObservationRequest,
    /// Equatorial coordinates after resolving horizontal targets.
    pub ra: Degrees,
    pub dec: Degrees,
    pub altitude: Degrees,
    pub moon_angle: Degrees,
}

/// An annotated request with its desirability score for the current pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRequest {
    #[serde(flatten)]
    pub annotated: AnnotatedRequest,
    pub score: f64,
}

impl ScoredRequest {
    pub fn request(&self) -> &ObservationRequest {
        &self.annotated.request
    }

    pub fn name(&self) -> &str {
        &self.annotated.request.directory_name
    }
}
