//! In-memory request store.
//!
//! Holds the table text in memory so tests and dry runs get deterministic,
//! isolated storage. Read and commit failures can be injected to exercise the
//! scheduler's error paths.

use async_trait::async_trait;
use std::sync::{Arc, RwLock};

use super::pending_from_table;
use crate::db::repository::{
    ErrorContext, PendingRequests, RepositoryError, RepositoryResult, RequestRepository,
};
use crate::db::rows::RowTable;

/// In-memory request store.
///
/// # Example
/// ```
/// use colibri_scheduler::db::repositories::LocalRequestStore;
/// use colibri_scheduler::db::repository::RequestRepository;
/// use colibri_scheduler::parsing::columns;
///
/// # tokio_test_block(async {
/// let store = LocalRequestStore::from_text(&format!("{}\n", columns::HEADER)).unwrap();
/// let pending = store.load_pending().await.unwrap();
/// assert!(pending.is_empty());
/// # });
/// # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
/// # }
/// ```
#[derive(Clone)]
pub struct LocalRequestStore {
    data: Arc<RwLock<LocalData>>,
}

struct LocalData {
    table: RowTable,
    commits: usize,
    // Commits still allowed before every further commit fails; `None` = never fail.
    commits_before_failure: Option<usize>,
    is_available: bool,
}

impl LocalRequestStore {
    /// Create a store holding `table`.
    pub fn new(table: RowTable) -> Self {
        Self {
            data: Arc::new(RwLock::new(LocalData {
                table,
                commits: 0,
                commits_before_failure: None,
                is_available: true,
            })),
        }
    }

    /// Create a store from table text (header line first).
    pub fn from_text(text: &str) -> RepositoryResult<Self> {
        RowTable::parse(text).map(Self::new)
    }

    /// Let `n` more commits succeed, then fail every commit after them.
    pub fn fail_commits_after(&self, n: usize) {
        let mut data = self.data.write().unwrap_or_else(|e| e.into_inner());
        data.commits_before_failure = Some(n);
    }

    /// Toggle whether loads succeed.
    pub fn set_available(&self, available: bool) {
        let mut data = self.data.write().unwrap_or_else(|e| e.into_inner());
        data.is_available = available;
    }

    /// Current committed table.
    pub fn snapshot(&self) -> RowTable {
        self.data
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .table
            .clone()
    }

    /// Number of successful commits.
    pub fn commit_count(&self) -> usize {
        self.data.read().unwrap_or_else(|e| e.into_inner()).commits
    }
}

#[async_trait]
impl RequestRepository for LocalRequestStore {
    async fn load_pending(&self) -> RepositoryResult<PendingRequests> {
        let data = self.data.read().unwrap_or_else(|e| e.into_inner());
        if !data.is_available {
            return Err(RepositoryError::unavailable(
                "Local store marked unavailable",
                ErrorContext::new("load_pending").with_entity("request_table"),
            ));
        }
        Ok(pending_from_table(data.table.clone()))
    }

    async fn commit(&self, rows: &RowTable) -> RepositoryResult<()> {
        let mut data = self.data.write().unwrap_or_else(|e| e.into_inner());
        match data.commits_before_failure {
            Some(0) => {
                return Err(RepositoryError::commit(
                    "Injected commit failure",
                    ErrorContext::new("commit").with_entity("request_table"),
                ))
            }
            Some(ref mut remaining) => *remaining -= 1,
            None => {}
        }
        data.table = rows.clone();
        data.commits += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CsvIndex;
    use crate::parsing::columns;

    fn store() -> LocalRequestStore {
        LocalRequestStore::from_text(&format!(
            "{}\nA,1,10,10,,,2024-02-28T01:00:00Z,2024-02-28T02:00:00Z,30,60,1,1,0\n",
            columns::HEADER
        ))
        .unwrap()
    }

    #[tokio::test]
    async fn test_round_trip() {
        let store = store();
        let mut pending = store.load_pending().await.unwrap();
        assert_eq!(pending.requests.len(), 1);

        pending.rows.mark_completed(CsvIndex::new(0)).unwrap();
        store.commit(&pending.rows).await.unwrap();

        assert!(store.load_pending().await.unwrap().is_empty());
        assert_eq!(store.commit_count(), 1);
    }

    #[tokio::test]
    async fn test_injected_commit_failure_keeps_table() {
        let store = store();
        store.fail_commits_after(0);
        let mut pending = store.load_pending().await.unwrap();
        pending.rows.mark_completed(CsvIndex::new(0)).unwrap();

        let err = store.commit(&pending.rows).await.unwrap_err();
        assert!(matches!(err, RepositoryError::CommitError { .. }));
        assert_eq!(store.load_pending().await.unwrap().requests.len(), 1);
        assert_eq!(store.commit_count(), 0);
    }

    #[tokio::test]
    async fn test_unavailable() {
        let store = store();
        store.set_available(false);
        assert!(store.load_pending().await.unwrap_err().is_retryable());
        store.set_available(true);
        assert!(store.load_pending().await.is_ok());
    }
}
