//! Best-request selection: time filter, visibility filter, rank, take the head.

use log::info;

use super::ranking::rank;
use crate::models::{NightContext, ObservationRequest, ScoredRequest};
use crate::transformations::{filter_by_astronomy, filter_by_time};

/// Full ranked plan for the current pass, best first.
pub fn plan<'a, I>(requests: I, ctx: &NightContext) -> Vec<ScoredRequest>
where
    I: IntoIterator<Item = &'a ObservationRequest>,
{
    let in_window = filter_by_time(requests, ctx.sunset(), ctx.sunrise(), ctx.now);
    info!("{} requests inside their time window", in_window.len());
    let visible = filter_by_astronomy(in_window, ctx);
    rank(visible, &ctx.limits)
}

/// The single best request to run now, or `None` if nothing is feasible.
pub fn select_best<'a, I>(requests: I, ctx: &NightContext) -> Option<ScoredRequest>
where
    I: IntoIterator<Item = &'a ObservationRequest>,
{
    let best = plan(requests, ctx).into_iter().next();
    match &best {
        Some(entry) => info!(
            "Selected {} (score {:.2}, alt {:.2} deg, moon {:.2} deg)",
            entry.name(),
            entry.score,
            entry.annotated.altitude.value(),
            entry.annotated.moon_angle.value()
        ),
        None => info!("No observable request at {}", ctx.now),
    }
    best
}
