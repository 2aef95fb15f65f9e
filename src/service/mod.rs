//! Remote query-service abstraction.
//!
//! Provides a trait-based interface over the service's control plane, so the
//! job controller and catalog browser can run against the HTTP client or the
//! scripted mock interchangeably.

mod http;
mod mock;
mod signing;
mod types;

pub use http::HttpQueryService;
pub use mock::{MockCall, MockQueryService};
pub use types::{
    ColumnMetadata, DataCatalogSummary, DatabaseSummary, ExecutionStatistics, Page, Paged,
    QueryExecution, QueryRequest, RawRow, ResultColumn, ResultPage, TableMetadata,
};

use std::sync::Arc;

use crate::config::ConnectionConfig;
use crate::credentials::Credentials;
use crate::error::Result;
use async_trait::async_trait;

/// Creates a service client for the given connection and credentials.
///
/// This is the central factory function for remote clients.
pub fn connect(config: &ConnectionConfig, credentials: Credentials) -> Result<Arc<dyn QueryService>> {
    let client = HttpQueryService::new(config, credentials)?;
    Ok(Arc::new(client))
}

/// Trait defining the remote calls the engine consumes.
///
/// Every paged call accepts an optional continuation cursor and returns a
/// page carrying the next cursor, if any. Implementations never retry.
#[async_trait]
pub trait QueryService: Send + Sync {
    /// Submits a query and returns the execution id assigned by the service.
    async fn start_query_execution(&self, request: &QueryRequest) -> Result<String>;

    /// Reads the current status of an execution.
    async fn get_query_execution(&self, execution_id: &str) -> Result<QueryExecution>;

    /// Asks the service to stop an execution.
    async fn stop_query_execution(&self, execution_id: &str) -> Result<()>;

    /// Fetches one page of an execution's results.
    async fn get_query_results(
        &self,
        execution_id: &str,
        next_token: Option<&str>,
    ) -> Result<ResultPage>;

    /// Lists data catalogs.
    async fn list_data_catalogs(&self, next_token: Option<&str>)
        -> Result<Page<DataCatalogSummary>>;

    /// Lists the databases of a catalog.
    async fn list_databases(
        &self,
        catalog_name: &str,
        next_token: Option<&str>,
    ) -> Result<Page<DatabaseSummary>>;

    /// Lists the tables of a database.
    async fn list_table_metadata(
        &self,
        catalog_name: &str,
        database_name: &str,
        next_token: Option<&str>,
    ) -> Result<Page<TableMetadata>>;

    /// Fetches a single table's metadata, including its columns.
    async fn get_table_metadata(
        &self,
        catalog_name: &str,
        database_name: &str,
        table_name: &str,
    ) -> Result<Option<TableMetadata>>;
}
