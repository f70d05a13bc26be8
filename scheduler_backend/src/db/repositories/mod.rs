//! Request-store implementations.
//!
//! - [`csv`]: the request table as a CSV file on disk
//! - [`local`]: in-memory table for tests and dry runs

pub mod csv;
pub mod local;

use log::{info, warn};

pub use self::csv::CsvRequestStore;
pub use self::local::LocalRequestStore;

use super::repository::PendingRequests;
use super::rows::RowTable;

/// Parse a freshly read table into the pending pool, logging skipped rows.
pub(crate) fn pending_from_table(table: RowTable) -> PendingRequests {
    let parsed = table.parse_requests();
    for rejected in &parsed.rejected {
        warn!("{}", rejected);
    }
    info!(
        "Loaded {} pending requests ({} completed, {} rejected)",
        parsed.requests.len(),
        parsed.completed,
        parsed.rejected.len()
    );
    PendingRequests {
        requests: parsed.requests,
        rows: table,
        rejected: parsed.rejected,
    }
}
