//! Mock query service for testing.
//!
//! Provides a scripted, in-memory service: status sequences, result pages and
//! catalog listings are queued up front, and every call is recorded with the
//! (tokio) instant it was made so tests can check ordering and delays.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::time::Instant;

use super::types::{
    ColumnMetadata, DataCatalogSummary, DatabaseSummary, ExecutionStatistics, Page, Paged,
    QueryExecution, QueryRequest, RawRow, ResultColumn, ResultPage, TableMetadata,
};
use super::QueryService;
use crate::error::{AthenaError, Result};

/// A call received by the mock service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    StartQueryExecution(QueryRequest),
    GetQueryExecution(String),
    StopQueryExecution(String),
    GetQueryResults {
        execution_id: String,
        next_token: Option<String>,
    },
    ListDataCatalogs {
        next_token: Option<String>,
    },
    ListDatabases {
        catalog_name: String,
        next_token: Option<String>,
    },
    ListTableMetadata {
        catalog_name: String,
        database_name: String,
        next_token: Option<String>,
    },
    GetTableMetadata {
        catalog_name: String,
        database_name: String,
        table_name: String,
    },
}

impl MockCall {
    /// Returns the remote operation name of this call.
    pub fn operation(&self) -> &'static str {
        match self {
            Self::StartQueryExecution(_) => "StartQueryExecution",
            Self::GetQueryExecution(_) => "GetQueryExecution",
            Self::StopQueryExecution(_) => "StopQueryExecution",
            Self::GetQueryResults { .. } => "GetQueryResults",
            Self::ListDataCatalogs { .. } => "ListDataCatalogs",
            Self::ListDatabases { .. } => "ListDatabases",
            Self::ListTableMetadata { .. } => "ListTableMetadata",
            Self::GetTableMetadata { .. } => "GetTableMetadata",
        }
    }
}

#[derive(Debug, Clone)]
struct ScriptedStatus {
    state: Option<String>,
    reason: Option<String>,
}

impl ScriptedStatus {
    fn is_terminal(&self) -> bool {
        matches!(
            self.state.as_deref(),
            Some("SUCCEEDED") | Some("FAILED") | Some("CANCELLED")
        )
    }
}

#[derive(Debug, Default)]
struct MockState {
    submitted: usize,
    statuses: VecDeque<ScriptedStatus>,
    statistics: Option<ExecutionStatistics>,
    ignore_stop: bool,
    stop_accepted: bool,
    result_pages: Vec<ResultPage>,
    catalogs: Vec<Page<DataCatalogSummary>>,
    databases: HashMap<String, Vec<Page<DatabaseSummary>>>,
    tables: HashMap<(String, String), Vec<Page<TableMetadata>>>,
    table_metadata: HashMap<(String, String, String), TableMetadata>,
    failures: HashMap<&'static str, String>,
    calls: Vec<(MockCall, Instant)>,
}

/// A mock query service that replays scripted responses.
///
/// Status replies are consumed one per poll; the last scripted status repeats
/// forever. An empty script reports `SUCCEEDED`. A stop request on a
/// non-terminal execution makes every later poll report `CANCELLED`, unless
/// the mock was built with [`MockQueryService::ignoring_stop`].
#[derive(Debug, Default)]
pub struct MockQueryService {
    state: Mutex<MockState>,
}

impl MockQueryService {
    /// Creates a mock with no scripted data.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mock populated with a small sample catalog, used by the
    /// `--mock` CLI flag.
    pub fn with_sample_data() -> Self {
        let column = |name: &str, data_type: &str| ColumnMetadata {
            name: Some(name.to_string()),
            data_type: Some(data_type.to_string()),
            comment: None,
        };
        let table = |name: &str, columns: Vec<ColumnMetadata>| TableMetadata {
            name: Some(name.to_string()),
            table_type: Some("EXTERNAL_TABLE".to_string()),
            columns: Some(columns),
            partition_keys: None,
        };

        let elb_logs = table(
            "elb_logs",
            vec![
                column("request_timestamp", "string"),
                column("elb_name", "string"),
                column("request_ip", "string"),
                column("backend_response_code", "string"),
            ],
        );
        let flights = table(
            "flights",
            vec![column("origin", "string"), column("dest", "string"), column("delay", "int")],
        );

        Self::new()
            .with_statuses(["QUEUED", "RUNNING", "SUCCEEDED"])
            .with_statistics(ExecutionStatistics {
                data_scanned_in_bytes: Some(0),
                query_queue_time_in_millis: Some(80),
                engine_execution_time_in_millis: Some(310),
                total_execution_time_in_millis: Some(420),
            })
            .with_result_pages(vec![ResultPage {
                rows: Some(vec![RawRow::from_values(["_col0"]), RawRow::from_values(["1"])]),
                column_info: Some(vec![ResultColumn::new("_col0", "integer")]),
                next_token: None,
            }])
            .with_catalog_pages(vec![Page::last(vec![DataCatalogSummary {
                catalog_name: Some("AwsDataCatalog".to_string()),
                catalog_type: Some("GLUE".to_string()),
            }])])
            .with_database_pages(
                "AwsDataCatalog",
                vec![Page::last(vec![
                    DatabaseSummary {
                        name: Some("default".to_string()),
                        description: None,
                    },
                    DatabaseSummary {
                        name: Some("sampledb".to_string()),
                        description: Some("Sample data".to_string()),
                    },
                ])],
            )
            .with_table_pages(
                "AwsDataCatalog",
                "sampledb",
                vec![Page::last(vec![elb_logs.clone(), flights.clone()])],
            )
            .with_table("AwsDataCatalog", "sampledb", elb_logs)
            .with_table("AwsDataCatalog", "sampledb", flights)
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Appends status replies to the poll script.
    pub fn with_statuses<I, S>(self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        {
            let mut state = self.lock();
            state
                .statuses
                .extend(states.into_iter().map(|s| ScriptedStatus {
                    state: Some(s.into()),
                    reason: None,
                }));
        }
        self
    }

    /// Appends a `FAILED` reply carrying the given reason.
    pub fn with_failure(self, reason: impl Into<String>) -> Self {
        self.lock().statuses.push_back(ScriptedStatus {
            state: Some("FAILED".to_string()),
            reason: Some(reason.into()),
        });
        self
    }

    /// Appends a reply that carries no status at all.
    pub fn with_missing_status(self) -> Self {
        self.lock().statuses.push_back(ScriptedStatus {
            state: None,
            reason: None,
        });
        self
    }

    /// Attaches execution statistics to every status reply.
    pub fn with_statistics(self, statistics: ExecutionStatistics) -> Self {
        self.lock().statistics = Some(statistics);
        self
    }

    /// Makes stop requests have no effect on the scripted statuses.
    pub fn ignoring_stop(self) -> Self {
        self.lock().ignore_stop = true;
        self
    }

    /// Sets the result pages served for any execution.
    pub fn with_result_pages(self, pages: Vec<ResultPage>) -> Self {
        self.lock().result_pages = pages;
        self
    }

    /// Sets the pages of the catalog listing.
    pub fn with_catalog_pages(self, pages: Vec<Page<DataCatalogSummary>>) -> Self {
        self.lock().catalogs = pages;
        self
    }

    /// Sets the pages of a catalog's database listing.
    pub fn with_database_pages(self, catalog: &str, pages: Vec<Page<DatabaseSummary>>) -> Self {
        self.lock().databases.insert(catalog.to_string(), pages);
        self
    }

    /// Sets the pages of a database's table listing.
    pub fn with_table_pages(
        self,
        catalog: &str,
        database: &str,
        pages: Vec<Page<TableMetadata>>,
    ) -> Self {
        self.lock()
            .tables
            .insert((catalog.to_string(), database.to_string()), pages);
        self
    }

    /// Registers a table for single-table metadata lookups.
    pub fn with_table(self, catalog: &str, database: &str, table: TableMetadata) -> Self {
        let name = table.name.clone().unwrap_or_default();
        self.lock()
            .table_metadata
            .insert((catalog.to_string(), database.to_string(), name), table);
        self
    }

    /// Makes every call of the given operation fail with a service error.
    pub fn failing_on(self, operation: &'static str, message: impl Into<String>) -> Self {
        self.lock().failures.insert(operation, message.into());
        self
    }

    /// Returns every call received, in order.
    pub fn calls(&self) -> Vec<MockCall> {
        self.lock().calls.iter().map(|(call, _)| call.clone()).collect()
    }

    /// Returns every call received with the instant it arrived.
    pub fn timed_calls(&self) -> Vec<(MockCall, Instant)> {
        self.lock().calls.clone()
    }

    /// Returns how many calls of the given operation were received.
    pub fn call_count(&self, operation: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|(call, _)| call.operation() == operation)
            .count()
    }

    /// Records a call and returns the scripted failure for it, if any.
    fn record(&self, call: MockCall) -> Result<MutexGuard<'_, MockState>> {
        let mut state = self.lock();
        let operation = call.operation();
        state.calls.push((call, Instant::now()));
        if let Some(message) = state.failures.get(operation).cloned() {
            return Err(AthenaError::service(message));
        }
        Ok(state)
    }

    fn current_status(state: &MockState) -> ScriptedStatus {
        state.statuses.front().cloned().unwrap_or(ScriptedStatus {
            state: Some("SUCCEEDED".to_string()),
            reason: None,
        })
    }
}

/// Serves the page that follows the one whose cursor equals `token`.
fn serve_page<P: Paged + Clone>(pages: &[P], token: Option<&str>, empty: P) -> Result<P> {
    match token {
        None => Ok(pages.first().cloned().unwrap_or(empty)),
        Some(token) => pages
            .windows(2)
            .find(|pair| pair[0].next_token() == Some(token))
            .map(|pair| pair[1].clone())
            .ok_or_else(|| {
                AthenaError::service(format!(
                    "InvalidRequestException: unknown NextToken '{token}'"
                ))
            }),
    }
}

#[async_trait]
impl QueryService for MockQueryService {
    async fn start_query_execution(&self, request: &QueryRequest) -> Result<String> {
        let mut state = self.record(MockCall::StartQueryExecution(request.clone()))?;
        state.submitted += 1;
        state.stop_accepted = false;
        Ok(format!("query-{}", state.submitted))
    }

    async fn get_query_execution(&self, execution_id: &str) -> Result<QueryExecution> {
        let mut state = self.record(MockCall::GetQueryExecution(execution_id.to_string()))?;

        let status = if state.stop_accepted {
            ScriptedStatus {
                state: Some("CANCELLED".to_string()),
                reason: None,
            }
        } else if state.statuses.len() > 1 {
            match state.statuses.pop_front() {
                Some(status) => status,
                None => Self::current_status(&state),
            }
        } else {
            Self::current_status(&state)
        };

        Ok(QueryExecution {
            execution_id: execution_id.to_string(),
            state: status.state,
            state_change_reason: status.reason,
            statistics: state.statistics.clone(),
        })
    }

    async fn stop_query_execution(&self, execution_id: &str) -> Result<()> {
        let mut state = self.record(MockCall::StopQueryExecution(execution_id.to_string()))?;
        if !state.ignore_stop && !Self::current_status(&state).is_terminal() {
            state.stop_accepted = true;
        }
        Ok(())
    }

    async fn get_query_results(
        &self,
        execution_id: &str,
        next_token: Option<&str>,
    ) -> Result<ResultPage> {
        let state = self.record(MockCall::GetQueryResults {
            execution_id: execution_id.to_string(),
            next_token: next_token.map(String::from),
        })?;
        serve_page(&state.result_pages, next_token, ResultPage::default())
    }

    async fn list_data_catalogs(
        &self,
        next_token: Option<&str>,
    ) -> Result<Page<DataCatalogSummary>> {
        let state = self.record(MockCall::ListDataCatalogs {
            next_token: next_token.map(String::from),
        })?;
        serve_page(&state.catalogs, next_token, Page::last(Vec::new()))
    }

    async fn list_databases(
        &self,
        catalog_name: &str,
        next_token: Option<&str>,
    ) -> Result<Page<DatabaseSummary>> {
        let state = self.record(MockCall::ListDatabases {
            catalog_name: catalog_name.to_string(),
            next_token: next_token.map(String::from),
        })?;
        let pages = state.databases.get(catalog_name).map(Vec::as_slice).unwrap_or(&[]);
        serve_page(pages, next_token, Page::last(Vec::new()))
    }

    async fn list_table_metadata(
        &self,
        catalog_name: &str,
        database_name: &str,
        next_token: Option<&str>,
    ) -> Result<Page<TableMetadata>> {
        let state = self.record(MockCall::ListTableMetadata {
            catalog_name: catalog_name.to_string(),
            database_name: database_name.to_string(),
            next_token: next_token.map(String::from),
        })?;
        let key = (catalog_name.to_string(), database_name.to_string());
        let pages = state.tables.get(&key).map(Vec::as_slice).unwrap_or(&[]);
        serve_page(pages, next_token, Page::last(Vec::new()))
    }

    async fn get_table_metadata(
        &self,
        catalog_name: &str,
        database_name: &str,
        table_name: &str,
    ) -> Result<Option<TableMetadata>> {
        let state = self.record(MockCall::GetTableMetadata {
            catalog_name: catalog_name.to_string(),
            database_name: database_name.to_string(),
            table_name: table_name.to_string(),
        })?;
        let key = (
            catalog_name.to_string(),
            database_name.to_string(),
            table_name.to_string(),
        );
        state.table_metadata.get(&key).cloned().map(Some).ok_or_else(|| {
            AthenaError::service(format!(
                "MetadataException: Table {table_name} not found in {catalog_name}.{database_name}"
            ))
        })
    }
}
