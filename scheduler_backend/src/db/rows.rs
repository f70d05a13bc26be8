//! Raw request-table rows.
//!
//! The table is kept as text so that write-back touches only the cells the
//! scheduler owns (completion, window bounds, priority) and leaves everything
//! else byte-for-byte as the author wrote it.

use log::warn;

use super::repository::{ErrorContext, RepositoryError, RepositoryResult};
use crate::error::{DateRolloverError, ParseError};
use crate::models::CsvIndex;
use crate::parsing::csv_parser::{
    columns, join_row, parse_completion, parse_request_row, parse_request_rows, split_row,
    ParsedRows,
};
use crate::time::{update_day, utc_to_julian_date, JulianDate};

/// Failure to edit one row in place. The row is left unmodified.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RowEditError {
    #[error("Row {index} out of range (table has {len} rows)")]
    OutOfRange { index: CsvIndex, len: usize },

    #[error("Row {index} has {found} columns, expected {expected}")]
    ShortRow {
        index: CsvIndex,
        found: usize,
        expected: usize,
    },

    #[error("Row {index} has an unreadable priority '{value}'")]
    Priority { index: CsvIndex, value: String },

    #[error("Row {index}: {source}")]
    Rollover {
        index: CsvIndex,
        #[source]
        source: DateRolloverError,
    },

    #[error("Row {index} is not valid CSV: {source}")]
    Malformed {
        index: CsvIndex,
        #[source]
        source: ParseError,
    },
}

impl RowEditError {
    pub fn index(&self) -> CsvIndex {
        match self {
            Self::OutOfRange { index, .. }
            | Self::ShortRow { index, .. }
            | Self::Priority { index, .. }
            | Self::Rollover { index, .. }
            | Self::Malformed { index, .. } => *index,
        }
    }
}

impl From<RowEditError> for RepositoryError {
    fn from(err: RowEditError) -> Self {
        let context = ErrorContext::new("edit_row")
            .with_entity("row")
            .with_entity_id(err.index());
        let message = err.to_string();
        match err {
            RowEditError::OutOfRange { .. } => RepositoryError::not_found(message, context),
            _ => RepositoryError::validation(message, context),
        }
    }
}

/// Outcome of the end-of-night reschedule sweep.
#[derive(Debug, Default)]
pub struct RescheduleReport {
    pub rescheduled: Vec<CsvIndex>,
    pub failed: Vec<RowEditError>,
}

/// Header plus data rows of the request table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowTable {
    header: String,
    rows: Vec<String>,
}

impl RowTable {
    pub fn new(header: impl Into<String>, rows: Vec<String>) -> Self {
        Self {
            header: header.into(),
            rows,
        }
    }

    /// Split table text into header and rows.
    ///
    /// Line endings may be `\n` or `\r\n`; trailing blank lines are dropped.
    /// The header must have one column per request field.
    pub fn parse(text: &str) -> RepositoryResult<Self> {
        let mut lines = text.lines().map(|l| l.trim_end_matches('\r'));
        let header = lines
            .next()
            .filter(|h| !h.trim().is_empty())
            .ok_or_else(|| {
                RepositoryError::validation(
                    "Request table is empty",
                    ErrorContext::new("parse_table").with_entity("request_table"),
                )
            })?;

        let found = split_row(header)
            .map_err(|e| {
                RepositoryError::validation(
                    e.to_string(),
                    ErrorContext::new("parse_table").with_entity("request_table"),
                )
            })?
            .len();
        if found != columns::COUNT {
            return Err(RepositoryError::validation(
                format!("Header has {} columns, expected {}", found, columns::COUNT),
                ErrorContext::new("parse_table")
                    .with_entity("request_table")
                    .with_details(header.to_string()),
            ));
        }

        let mut rows: Vec<String> = lines.map(str::to_string).collect();
        while rows.last().is_some_and(|r| r.trim().is_empty()) {
            rows.pop();
        }

        Ok(Self::new(header, rows))
    }

    /// Render header and rows, one per line, with a trailing newline.
    pub fn to_text(&self) -> String {
        let mut out = String::with_capacity(
            self.header.len() + self.rows.iter().map(|r| r.len() + 1).sum::<usize>() + 1,
        );
        out.push_str(&self.header);
        out.push('\n');
        for row in &self.rows {
            out.push_str(row);
            out.push('\n');
        }
        out
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    pub fn rows(&self) -> &[String] {
        &self.rows
    }

    pub fn row(&self, index: CsvIndex) -> Option<&str> {
        self.rows.get(index.value()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Parse every row into requests; see [`parse_request_rows`].
    pub fn parse_requests(&self) -> ParsedRows {
        parse_request_rows(self.rows.iter().map(String::as_str))
    }

    fn cells(&self, index: CsvIndex) -> Result<Vec<String>, RowEditError> {
        let row = self.row(index).ok_or(RowEditError::OutOfRange {
            index,
            len: self.rows.len(),
        })?;
        let record = split_row(row).map_err(|source| RowEditError::Malformed { index, source })?;
        let cells: Vec<String> = record.iter().map(str::to_string).collect();
        if cells.len() < columns::COUNT {
            return Err(RowEditError::ShortRow {
                index,
                found: cells.len(),
                expected: columns::COUNT,
            });
        }
        Ok(cells)
    }

    /// Set the completion cell of one row. No other cell changes.
    pub fn mark_completed(&mut self, index: CsvIndex) -> Result<(), RowEditError> {
        let mut cells = self.cells(index)?;
        cells[columns::COMPLETION] = "1".to_string();
        self.replace(index, &cells)
    }

    /// Move a row's window one calendar day forward and raise its priority.
    ///
    /// All new cell values are computed before anything is written, so a
    /// malformed timestamp leaves the row exactly as it was.
    pub fn reschedule_for_tomorrow(&mut self, index: CsvIndex) -> Result<(), RowEditError> {
        let mut cells = self.cells(index)?;
        let rollover = |source| RowEditError::Rollover { index, source };

        let start = update_day(cells[columns::START_TIME].trim()).map_err(rollover)?;
        let end = update_day(cells[columns::END_TIME].trim()).map_err(rollover)?;
        let priority_cell = cells[columns::PRIORITY].trim();
        let priority = priority_cell
            .parse::<u32>()
            .map_err(|_| RowEditError::Priority {
                index,
                value: priority_cell.to_string(),
            })?
            .saturating_add(1);

        cells[columns::START_TIME] = start;
        cells[columns::END_TIME] = end;
        cells[columns::PRIORITY] = priority.to_string();
        self.replace(index, &cells)
    }

    fn replace(&mut self, index: CsvIndex, cells: &[String]) -> Result<(), RowEditError> {
        let line = join_row(cells).map_err(|source| RowEditError::Malformed { index, source })?;
        self.rows[index.value()] = line;
        Ok(())
    }

    /// Reschedule every incomplete row whose window closed before `now`.
    ///
    /// Rows whose end time cannot be read are attempted too, so the failure
    /// shows up in the report instead of the row silently staying behind.
    pub fn reschedule_expired(&mut self, now: JulianDate) -> RescheduleReport {
        let mut report = RescheduleReport::default();

        for i in 0..self.rows.len() {
            let index = CsvIndex::new(i);
            let expired = match parse_request_row(&self.rows[i], index) {
                Ok(Some(request)) => request.has_expired(now),
                Ok(None) => false,
                Err(_) => self.unreadable_row_expired(index, now),
            };
            if !expired {
                continue;
            }

            match self.reschedule_for_tomorrow(index) {
                Ok(()) => report.rescheduled.push(index),
                Err(err) => {
                    warn!("Could not reschedule row {}: {}", index, err);
                    report.failed.push(err);
                }
            }
        }
        report
    }

    /// Expiry check for a row that does not parse as a request: incomplete
    /// rows with an unreadable end time count as expired.
    fn unreadable_row_expired(&self, index: CsvIndex, now: JulianDate) -> bool {
        let Ok(cells) = self.cells(index) else {
            return false;
        };
        if !matches!(parse_completion(&cells[columns::COMPLETION]), Ok(false)) {
            return false;
        }
        match utc_to_julian_date(cells[columns::END_TIME].trim()) {
            Ok(end) => end < now,
            Err(_) => true,
        }
    }
}
