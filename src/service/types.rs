//! Domain types exchanged with the remote query service.
//!
//! These mirror what the service returns, with every field the service may
//! omit kept optional. Interpretation (status parsing, header stripping,
//! name filtering) happens in the layers above.

use serde::{Deserialize, Serialize};

/// One page of a paginated listing.
///
/// `items` is `None` when the service omitted the list field entirely, which
/// the paginator treats as an empty page.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// Items on this page.
    pub items: Option<Vec<T>>,
    /// Continuation cursor; present iff more pages remain.
    pub next_token: Option<String>,
}

impl<T> Page<T> {
    /// Creates a page with the given items and continuation cursor.
    pub fn new(items: Vec<T>, next_token: Option<&str>) -> Self {
        Self {
            items: Some(items),
            next_token: next_token.map(String::from),
        }
    }

    /// Creates the final page of a listing.
    pub fn last(items: Vec<T>) -> Self {
        Self::new(items, None)
    }

    /// Creates a page whose item field is absent.
    pub fn absent(next_token: Option<&str>) -> Self {
        Self {
            items: None,
            next_token: next_token.map(String::from),
        }
    }
}

/// A response that may continue on another page.
pub trait Paged {
    /// Continuation cursor for the next page, if any.
    fn next_token(&self) -> Option<&str>;
}

impl<T> Paged for Page<T> {
    fn next_token(&self) -> Option<&str> {
        self.next_token.as_deref()
    }
}

impl Paged for ResultPage {
    fn next_token(&self) -> Option<&str> {
        self.next_token.as_deref()
    }
}

/// Parameters of one query submission.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryRequest {
    /// SQL text.
    pub sql: String,
    /// Workgroup the query runs under.
    pub workgroup: String,
    /// Positional bind values, in placeholder order.
    pub parameters: Vec<String>,
}

impl QueryRequest {
    /// Creates a request without bind parameters.
    pub fn new(sql: impl Into<String>, workgroup: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            workgroup: workgroup.into(),
            parameters: Vec::new(),
        }
    }

    /// Sets the positional bind parameters.
    pub fn with_parameters<I, S>(mut self, parameters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parameters = parameters.into_iter().map(Into::into).collect();
        self
    }
}

/// Point-in-time view of a query execution, as reported by the service.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryExecution {
    /// Execution id.
    pub execution_id: String,
    /// Raw state string (`QUEUED`, `RUNNING`, ...). `None` when the service
    /// returned no status.
    pub state: Option<String>,
    /// Reason for the last state change; set for failures.
    pub state_change_reason: Option<String>,
    /// Execution statistics, when available.
    pub statistics: Option<ExecutionStatistics>,
}

/// Execution statistics reported for a query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all(deserialize = "PascalCase"))]
pub struct ExecutionStatistics {
    /// Bytes scanned by the query.
    pub data_scanned_in_bytes: Option<i64>,
    /// Time spent waiting in the queue.
    pub query_queue_time_in_millis: Option<i64>,
    /// Time spent executing in the engine.
    pub engine_execution_time_in_millis: Option<i64>,
    /// End-to-end execution time.
    pub total_execution_time_in_millis: Option<i64>,
}

/// One page of a query's result set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultPage {
    /// Raw rows. On the first page the first row repeats the column header.
    pub rows: Option<Vec<RawRow>>,
    /// Column metadata; the service attaches it to the first page.
    pub column_info: Option<Vec<ResultColumn>>,
    /// Continuation cursor; present iff more pages remain.
    pub next_token: Option<String>,
}

/// A raw result row. `data` is `None` for sparse entries carrying no cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    pub data: Option<Vec<Option<String>>>,
}

impl RawRow {
    /// Creates a row where every cell is present.
    pub fn from_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            data: Some(values.into_iter().map(|v| Some(v.into())).collect()),
        }
    }

    /// Creates a row from cells that may be null.
    pub fn from_cells(cells: Vec<Option<String>>) -> Self {
        Self { data: Some(cells) }
    }

    /// Creates a row without cell data.
    pub fn empty() -> Self {
        Self { data: None }
    }
}

/// Column metadata attached to a result page. Position is the index in
/// the metadata list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultColumn {
    pub name: Option<String>,
    pub data_type: Option<String>,
}

impl ResultColumn {
    /// Creates column metadata with a name and type.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            data_type: Some(data_type.into()),
        }
    }
}

/// A data catalog entry from the catalog listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DataCatalogSummary {
    pub catalog_name: Option<String>,
    #[serde(rename = "Type")]
    pub catalog_type: Option<String>,
}

/// A database entry from the database listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DatabaseSummary {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Table metadata from the table listing or the single-table lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TableMetadata {
    pub name: Option<String>,
    pub table_type: Option<String>,
    pub columns: Option<Vec<ColumnMetadata>>,
    pub partition_keys: Option<Vec<ColumnMetadata>>,
}

/// Column metadata from a table definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ColumnMetadata {
    pub name: Option<String>,
    #[serde(rename = "Type")]
    pub data_type: Option<String>,
    pub comment: Option<String>,
}
