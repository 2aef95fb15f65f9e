//! Session: the caller-facing entry point.
//!
//! A session pairs a connection (region, workgroup, profile) with a
//! credentials supplier. Every operation resolves credentials first and
//! builds a service client for them; when no credentials are available the
//! operation returns `Ok(None)` instead of failing.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::catalog::{CatalogBrowser, CatalogEntry, ColumnEntry, DatabaseEntry, TableEntry};
use crate::config::{ConnectionConfig, DEFAULT_POLL_INTERVAL_MS};
use crate::credentials::{resolve, Credentials, CredentialsCache, CredentialsProvider};
use crate::error::Result;
use crate::paginator::Paginator;
use crate::query::{CancelHandle, QueryJobController, QueryOutcome};
use crate::service::{self, QueryRequest, QueryService};

/// Builds a service client from a connection and resolved credentials.
pub type ServiceFactory =
    Arc<dyn Fn(&ConnectionConfig, Credentials) -> Result<Arc<dyn QueryService>> + Send + Sync>;

pub struct Session {
    connection: ConnectionConfig,
    provider: Arc<dyn CredentialsProvider>,
    cache: Arc<CredentialsCache>,
    factory: ServiceFactory,
    interval: Duration,
}

impl Session {
    /// Creates a session talking to the HTTP service.
    pub fn new(connection: ConnectionConfig, provider: Arc<dyn CredentialsProvider>) -> Self {
        Self {
            connection,
            provider,
            cache: Arc::new(CredentialsCache::new()),
            factory: Arc::new(service::connect),
            interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }

    /// Replaces how service clients are built.
    pub fn with_service_factory(mut self, factory: ServiceFactory) -> Self {
        self.factory = factory;
        self
    }

    /// Uses one pre-built service for every operation.
    pub fn with_service(self, service: Arc<dyn QueryService>) -> Self {
        self.with_service_factory(Arc::new(
            move |_: &ConnectionConfig, _: Credentials| -> Result<Arc<dyn QueryService>> {
                Ok(service.clone())
            },
        ))
    }

    /// Shares a credentials cache with other sessions.
    pub fn with_cache(mut self, cache: Arc<CredentialsCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Sets the poll and page interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn connection(&self) -> &ConnectionConfig {
        &self.connection
    }

    /// Resolves credentials and builds a client, or `None` without
    /// credentials.
    async fn service(&self) -> Result<Option<Arc<dyn QueryService>>> {
        let profile = self.connection.profile();
        let region = self.connection.region();
        let Some(credentials) = resolve(&self.cache, self.provider.as_ref(), profile, region).await?
        else {
            return Ok(None);
        };
        debug!("Connecting to {}", self.connection.display_string());
        (self.factory)(&self.connection, credentials).map(Some)
    }

    fn browser<'a>(&self, service: &'a dyn QueryService) -> CatalogBrowser<'a> {
        CatalogBrowser::new(service).with_paginator(Paginator::with_delay(self.interval))
    }

    /// Runs a query in the connection's workgroup.
    ///
    /// `Ok(None)` means no credentials were available; a cancelled query is
    /// `Ok(Some(QueryOutcome::Cancelled))`.
    pub async fn run_query(
        &self,
        sql: &str,
        parameters: &[String],
        cancel: Option<&CancelHandle>,
    ) -> Result<Option<QueryOutcome>> {
        let Some(service) = self.service().await? else {
            return Ok(None);
        };
        let request = QueryRequest::new(sql, self.connection.workgroup())
            .with_parameters(parameters.iter().cloned());
        QueryJobController::new(service.as_ref())
            .with_interval(self.interval)
            .run(request, cancel)
            .await
            .map(|result| Some(result.into()))
    }

    pub async fn list_catalogs(&self) -> Result<Option<Vec<CatalogEntry>>> {
        let Some(service) = self.service().await? else {
            return Ok(None);
        };
        self.browser(service.as_ref()).list_catalogs().await.map(Some)
    }

    pub async fn list_databases(&self, catalog: &str) -> Result<Option<Vec<DatabaseEntry>>> {
        let Some(service) = self.service().await? else {
            return Ok(None);
        };
        self.browser(service.as_ref())
            .list_databases(catalog)
            .await
            .map(Some)
    }

    pub async fn list_tables(
        &self,
        catalog: &str,
        database: &str,
    ) -> Result<Option<Vec<TableEntry>>> {
        let Some(service) = self.service().await? else {
            return Ok(None);
        };
        self.browser(service.as_ref())
            .list_tables(catalog, database)
            .await
            .map(Some)
    }

    pub async fn list_columns(
        &self,
        catalog: &str,
        database: &str,
        table: &str,
    ) -> Result<Option<Vec<ColumnEntry>>> {
        let Some(service) = self.service().await? else {
            return Ok(None);
        };
        self.browser(service.as_ref())
            .list_columns(catalog, database, table)
            .await
            .map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::{ChainCredentialsProvider, StaticCredentialsProvider};
    use crate::service::{MockCall, MockQueryService};
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    fn connection() -> ConnectionConfig {
        ConnectionConfig {
            region: Some("eu-west-1".to_string()),
            workgroup: Some("analytics".to_string()),
            profile: Some("dev".to_string()),
            endpoint: None,
        }
    }

    fn static_provider() -> Arc<dyn CredentialsProvider> {
        Arc::new(StaticCredentialsProvider::new(Credentials::new("AKIA", "secret")))
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_query_uses_workgroup() {
        let service = Arc::new(MockQueryService::with_sample_data());
        let session = Session::new(connection(), static_provider()).with_service(service.clone());

        let result = session
            .run_query("select 1", &["'x'".to_string()], None)
            .await
            .unwrap()
            .and_then(QueryOutcome::into_result)
            .unwrap();

        assert_eq!(result.rows, vec![vec![Some("1".to_string())]]);
        assert_eq!(
            service.calls()[0],
            MockCall::StartQueryExecution(
                QueryRequest::new("select 1", "analytics").with_parameters(["'x'"])
            )
        );
    }

    #[tokio::test]
    async fn test_missing_credentials_is_silent() {
        let service = Arc::new(MockQueryService::with_sample_data());
        let session = Session::new(
            connection(),
            Arc::new(ChainCredentialsProvider::new(Vec::new())),
        )
        .with_service(service.clone());

        assert!(session.run_query("select 1", &[], None).await.unwrap().is_none());
        assert!(session.list_catalogs().await.unwrap().is_none());
        assert!(service.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_factory_receives_connection_and_credentials() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = seen.clone();
        let session = Session::new(connection(), static_provider()).with_service_factory(Arc::new(
            move |config: &ConnectionConfig, credentials: Credentials| -> Result<Arc<dyn QueryService>> {
                recorder
                    .lock()
                    .unwrap()
                    .push((config.region().to_string(), credentials.access_key_id));
                Ok(Arc::new(MockQueryService::with_sample_data()))
            },
        ));

        let databases = session.list_databases("AwsDataCatalog").await.unwrap().unwrap();
        assert_eq!(databases.len(), 2);
        session.list_tables("AwsDataCatalog", "sampledb").await.unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                ("eu-west-1".to_string(), "AKIA".to_string()),
                ("eu-west-1".to_string(), "AKIA".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn test_list_columns() {
        let session = Session::new(connection(), static_provider())
            .with_service(Arc::new(MockQueryService::with_sample_data()));
        let columns = session
            .list_columns("AwsDataCatalog", "sampledb", "elb_logs")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(columns[0].name, "request_timestamp");
    }
}
