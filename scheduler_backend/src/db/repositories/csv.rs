//! File-backed request store.

use async_trait::async_trait;
use log::{debug, info};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::pending_from_table;
use crate::db::repository::{
    ErrorContext, PendingRequests, RepositoryError, RepositoryResult, RequestRepository,
};
use crate::db::rows::RowTable;

/// Request table stored as a CSV file.
///
/// Commits write a temporary file next to the target and rename it over the
/// original, so readers only ever see the old or the new table.
#[derive(Debug, Clone)]
pub struct CsvRequestStore {
    path: PathBuf,
}

impl CsvRequestStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_table(&self) -> RepositoryResult<RowTable> {
        let text = std::fs::read_to_string(&self.path).map_err(|e| {
            RepositoryError::unavailable(
                format!("Failed to read request table: {}", e),
                ErrorContext::new("load_pending")
                    .with_entity("request_table")
                    .with_details(self.path.display().to_string()),
            )
        })?;
        RowTable::parse(&text).map_err(|e| e.with_operation("load_pending"))
    }

    fn write_atomically(&self, text: &str) -> std::io::Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(text.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

#[async_trait]
impl RequestRepository for CsvRequestStore {
    async fn load_pending(&self) -> RepositoryResult<PendingRequests> {
        let table = self.read_table()?;
        debug!("Read {} rows from {}", table.len(), self.path.display());
        Ok(pending_from_table(table))
    }

    async fn commit(&self, rows: &RowTable) -> RepositoryResult<()> {
        self.write_atomically(&rows.to_text()).map_err(|e| {
            RepositoryError::commit(
                format!("Failed to replace request table: {}", e),
                ErrorContext::new("commit")
                    .with_entity("request_table")
                    .with_details(self.path.display().to_string()),
            )
        })?;
        info!("Request table {} updated ({} rows)", self.path.display(), rows.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CsvIndex;
    use crate::parsing::columns;
    use tempfile::TempDir;

    fn write_table(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("colibri_user_observations.csv");
        std::fs::write(&path, format!("{}\n{}", columns::HEADER, body)).unwrap();
        path
    }

    #[tokio::test]
    async fn test_load_pending_skips_completed_and_malformed_rows() {
        let dir = TempDir::new().unwrap();
        let path = write_table(
            &dir,
            "A,1,10,10,,,2024-02-28T01:00:00Z,2024-02-28T02:00:00Z,30,60,1,1,0\n\
             B,1,10,10,,,2024-02-28T01:00:00Z,2024-02-28T02:00:00Z,30,60,1,1,1\n\
             C,oops,10,10,,,2024-02-28T01:00:00Z,2024-02-28T02:00:00Z,30,60,1,1,0\n",
        );
        let store = CsvRequestStore::new(&path);

        let pending = store.load_pending().await.unwrap();
        assert_eq!(pending.requests.len(), 1);
        assert_eq!(pending.requests[0].directory_name, "A");
        assert_eq!(pending.rejected.len(), 1);
        assert_eq!(pending.rows.len(), 3);
    }

    #[tokio::test]
    async fn test_commit_preserves_header_and_untouched_cells() {
        let dir = TempDir::new().unwrap();
        let body = "A,1,10.000,10,,,2024:02:28:01:00,2024:02:28:02:00,30,60,normal,1,0\n\
                    B,2,20,-5,,,2024-02-28T01:00:00Z,2024-02-28T03:00:00Z,15,30,1,2,0\n";
        let path = write_table(&dir, body);
        let store = CsvRequestStore::new(&path);

        let mut pending = store.load_pending().await.unwrap();
        pending.rows.mark_completed(CsvIndex::new(1)).unwrap();
        store.commit(&pending.rows).await.unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            format!(
                "{}\nA,1,10.000,10,,,2024:02:28:01:00,2024:02:28:02:00,30,60,normal,1,0\n\
                 B,2,20,-5,,,2024-02-28T01:00:00Z,2024-02-28T03:00:00Z,15,30,1,2,1\n",
                columns::HEADER
            )
        );

        let reloaded = store.load_pending().await.unwrap();
        assert_eq!(reloaded.requests.len(), 1);
        assert_eq!(reloaded.requests[0].directory_name, "A");
    }

    #[tokio::test]
    async fn test_commit_leaves_no_temporary_files() {
        let dir = TempDir::new().unwrap();
        let path = write_table(&dir, "");
        let store = CsvRequestStore::new(&path);
        let pending = store.load_pending().await.unwrap();
        store.commit(&pending.rows).await.unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_commit_failure_keeps_previous_content() {
        let dir = TempDir::new().unwrap();
        let path = write_table(&dir, "A,1,10,10,,,2024-02-28T01:00:00Z,2024-02-28T02:00:00Z,30,60,1,1,0\n");
        let before = std::fs::read_to_string(&path).unwrap();

        // Target inside a directory that does not exist: the temp file cannot be created.
        let broken = CsvRequestStore::new(dir.path().join("missing").join("table.csv"));
        let rows = RowTable::parse(&before).unwrap();
        let err = broken.commit(&rows).await.unwrap_err();

        assert!(matches!(err, RepositoryError::CommitError { .. }));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
    }

    #[tokio::test]
    async fn test_missing_file_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let store = CsvRequestStore::new(dir.path().join("nope.csv"));
        let err = store.load_pending().await.unwrap_err();
        assert!(err.is_retryable());
    }
}
