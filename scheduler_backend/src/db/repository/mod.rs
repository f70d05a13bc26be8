//! Request-store trait.
//!
//! - [`error`]: Error types for store operations
//!
//! The scheduler only ever needs two things from storage: the pending pool
//! together with the raw rows it came from, and an atomic write-back of those
//! rows. Row edits themselves happen on the in-memory [`RowTable`].

pub mod error;

use async_trait::async_trait;

pub use error::{ErrorContext, RepositoryError, RepositoryResult};

use super::rows::RowTable;
use crate::error::RowParseError;
use crate::models::ObservationRequest;

/// Result of loading the request table.
#[derive(Debug, Clone)]
pub struct PendingRequests {
    /// Requests that are not completed and parsed cleanly, in table order.
    pub requests: Vec<ObservationRequest>,
    /// Every row as read, completed and malformed ones included.
    pub rows: RowTable,
    /// Rows skipped because they could not be parsed.
    pub rejected: Vec<RowParseError>,
}

impl PendingRequests {
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

/// Repository trait for the request table.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust. The
/// scheduler is the only writer; implementations do not need to merge
/// concurrent edits.
#[async_trait]
pub trait RequestRepository: Send + Sync {
    /// Load every row and parse the pending ones.
    ///
    /// Malformed rows are logged and reported in
    /// [`PendingRequests::rejected`]; they never fail the load.
    ///
    /// # Returns
    /// * `Ok(PendingRequests)` - The pool and the raw rows for write-back
    /// * `Err(RepositoryError::Unavailable)` - If the table cannot be read
    /// * `Err(RepositoryError::ValidationError)` - If the header is wrong
    async fn load_pending(&self) -> RepositoryResult<PendingRequests>;

    /// Replace the stored table with `rows`, header first, in order.
    ///
    /// Either the whole table is replaced or nothing changes.
    ///
    /// # Returns
    /// * `Ok(())` - The new content is durable
    /// * `Err(RepositoryError::CommitError)` - The previous content is intact
    async fn commit(&self, rows: &RowTable) -> RepositoryResult<()>;
}
