//! Ranking and selection.
//!
//! # Components
//!
//! - [`ranking`]: desirability score and stable best-first ordering
//! - [`selection`]: filter + rank pipeline returning the plan or its head
//!
//! # Example
//!
//! ```ignore
//! use colibri_scheduler::algorithms::select_best;
//!
//! if let Some(best) = select_best(&pending.requests, &ctx) {
//!     println!("next: {} ({:.1})", best.name(), best.score);
//! }
//! ```

pub mod ranking;
pub mod selection;

pub use ranking::{rank, score, PRIORITY_WEIGHT};
pub use selection::{plan, select_best};
