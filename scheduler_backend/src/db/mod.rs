//! Request storage.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  Scheduler loop                              │
//! └───────────────┬──────────────────────────────┘
//!                 │ load_pending / commit
//! ┌───────────────▼──────────────────────────────┐
//! │  RequestRepository trait (repository)        │
//! └───────────────┬──────────────────────────────┘
//!        ┌────────┴─────────┐
//! ┌──────▼───────┐   ┌──────▼────────────┐
//! │ CSV file     │   │ In-memory (local) │
//! └──────────────┘   └───────────────────┘
//! ```
//!
//! Row edits (`mark_completed`, `reschedule_for_tomorrow`) are made on the
//! loaded [`RowTable`] and then committed as a whole.

pub mod repositories;
pub mod repository;
pub mod rows;

pub use repositories::{CsvRequestStore, LocalRequestStore};
pub use repository::{
    ErrorContext, PendingRequests, RepositoryError, RepositoryResult, RequestRepository,
};
pub use rows::{RescheduleReport, RowEditError, RowTable};
