//! Desirability score and ordering of feasible requests.

use log::debug;

use crate::models::{AnnotatedRequest, ObservingLimits, ScoredRequest};

/// Weight of one priority step, in score units.
pub const PRIORITY_WEIGHT: f64 = 50.0;

/// Score of one feasible request.
///
/// `priority * 50 + window minutes + altitude margin + Moon margin`, with each
/// of the last three floored at zero. Higher is better.
pub fn score(annotated: &AnnotatedRequest, limits: &ObservingLimits) -> f64 {
    let request = &annotated.request;
    let priority = f64::from(request.priority) * PRIORITY_WEIGHT;
    let window = request.window_minutes();
    let altitude_margin = (annotated.altitude - limits.elevation_limit).value().max(0.0);
    let moon_margin = (annotated.moon_angle - limits.min_moon_offset).value().max(0.0);
    priority + window + altitude_margin + moon_margin
}

/// Score every request and order them best first.
///
/// The sort is stable: requests with equal scores keep their input order.
pub fn rank(requests: Vec<AnnotatedRequest>, limits: &ObservingLimits) -> Vec<ScoredRequest> {
    let mut scored: Vec<ScoredRequest> = requests
        .into_iter()
        .map(|annotated| {
            let score = score(&annotated, limits);
            ScoredRequest { annotated, score }
        })
        .collect();

    scored.sort_by(|a, b| b.score.total_cmp(&a.score));

    for (position, entry) in scored.iter().enumerate() {
        debug!(
            "#{} {} score {:.2} (priority {}, alt {:.2}, moon {:.2})",
            position + 1,
            entry.name(),
            entry.score,
            entry.request().priority,
            entry.annotated.altitude.value(),
            entry.annotated.moon_angle.value()
        );
    }
    scored
}
