//! Feasibility filters applied to the pending pool before ranking.
//!
//! # Modules
//!
//! - [`filtering`]: time-window and visibility filters
//!
//! Both filters are pure: they read the requests and the night context and
//! return what survives, in input order.

pub mod filtering;

pub use filtering::{
    annotate, filter_by_astronomy, filter_by_time, meets_astronomy_conditions,
    resolve_coordinates, within_time_window,
};
