//! Assembled query results and their text renderings.

use serde::Serialize;

use crate::error::{AthenaError, Result};
use crate::service::ExecutionStatistics;

/// A complete result set.
///
/// Every row holds exactly one cell per column; `None` is SQL NULL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueryResult {
    /// Column names, in result order.
    pub columns: Vec<String>,

    /// Rows, in the order the service returned them.
    pub rows: Vec<Vec<Option<String>>>,

    /// Execution statistics, when the service reported them.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistics: Option<ExecutionStatistics>,
}

impl QueryResult {
    /// Creates a result, padding or truncating rows to the column count.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, None);
                row
            })
            .collect();
        Self {
            columns,
            rows,
            statistics: None,
        }
    }

    /// Sets the execution statistics.
    pub fn with_statistics(mut self, statistics: Option<ExecutionStatistics>) -> Self {
        self.statistics = statistics;
        self
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Renders the result as CSV: a header line, then one line per row.
    ///
    /// Every non-null value is double-quoted with embedded quotes doubled;
    /// NULL is an empty field.
    pub fn to_csv(&self) -> String {
        let mut output = String::new();

        let header: Vec<String> = self.columns.iter().map(|c| quote_csv(c)).collect();
        output.push_str(&header.join(","));
        output.push('\n');

        for row in &self.rows {
            let line: Vec<String> = row
                .iter()
                .map(|cell| cell.as_deref().map(quote_csv).unwrap_or_default())
                .collect();
            output.push_str(&line.join(","));
            output.push('\n');
        }

        output
    }

    /// Renders the result as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| AthenaError::internal(format!("Failed to serialize result: {e}")))
    }

    /// Renders the result as an aligned text table.
    pub fn format_table(&self) -> String {
        if self.columns.is_empty() {
            return String::new();
        }

        let cells: Vec<Vec<&str>> = self
            .rows
            .iter()
            .map(|row| row.iter().map(|c| c.as_deref().unwrap_or("NULL")).collect())
            .collect();

        let mut widths: Vec<usize> = self.columns.iter().map(|h| h.chars().count()).collect();
        for row in &cells {
            for (i, cell) in row.iter().enumerate() {
                if let Some(width) = widths.get_mut(i) {
                    *width = (*width).max(cell.chars().count());
                }
            }
        }

        let mut output = String::new();

        let header: Vec<String> = self
            .columns
            .iter()
            .zip(&widths)
            .map(|(h, width)| format!("{:width$}", h, width = *width))
            .collect();
        output.push_str(&header.join(" │ "));
        output.push('\n');

        let separator: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
        output.push_str(&separator.join("─┼─"));
        output.push('\n');

        for row in &cells {
            let line: Vec<String> = row
                .iter()
                .zip(&widths)
                .map(|(cell, width)| format!("{:width$}", cell, width = *width))
                .collect();
            output.push_str(&line.join(" │ "));
            output.push('\n');
        }

        output.trim_end().to_string()
    }

    /// Summarises the row count and execution statistics.
    pub fn statistics_report(&self) -> String {
        let stats = self.statistics.clone().unwrap_or_default();
        format!(
            "Query ok with {} results.\n\
             Query Queue Time: {} ms\n\
             Total Execution Time: {} ms\n\
             Data Scanned In Bytes: {} bytes",
            self.row_count(),
            stats.query_queue_time_in_millis.unwrap_or(0),
            stats.total_execution_time_in_millis.unwrap_or(0),
            stats.data_scanned_in_bytes.unwrap_or(0),
        )
    }
}

/// How a query that did not fail ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    Completed(QueryResult),
    /// Stopped locally through a cancel handle or by the service.
    Cancelled,
}

impl QueryOutcome {
    pub fn into_result(self) -> Option<QueryResult> {
        match self {
            Self::Completed(result) => Some(result),
            Self::Cancelled => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<Option<QueryResult>> for QueryOutcome {
    fn from(result: Option<QueryResult>) -> Self {
        result.map_or(Self::Cancelled, Self::Completed)
    }
}

fn quote_csv(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}
