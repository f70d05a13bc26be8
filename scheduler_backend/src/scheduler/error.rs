use crate::db::RepositoryError;
use crate::error::GeometryError;

/// Failures that end the night loop early.
///
/// Every variant is returned only after the observatory has been shut down.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// Writing the request table back failed; the stored table no longer
    /// matches what was observed.
    #[error("Request table commit failed: {0}")]
    StoreCommit(#[source] RepositoryError),

    /// The store cannot be read and waiting will not fix it.
    #[error("Request table unusable: {0}")]
    Store(#[source] RepositoryError),

    /// Tonight's dark interval cannot be computed for this site.
    #[error("Cannot plan the night: {0}")]
    Geometry(#[from] GeometryError),
}
