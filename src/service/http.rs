//! HTTP client for the query service's JSON API.
//!
//! Implements the `QueryService` trait over the AWS JSON 1.1 protocol using
//! reqwest, with SigV4-signed requests. Wire envelopes are private to this
//! module and converted to the domain types on the way out.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use super::signing::{self, SigningScope};
use super::types::{
    DataCatalogSummary, DatabaseSummary, ExecutionStatistics, Page, QueryExecution, QueryRequest,
    RawRow, ResultColumn, ResultPage, TableMetadata,
};
use super::QueryService;
use crate::config::ConnectionConfig;
use crate::credentials::Credentials;
use crate::error::{AthenaError, Result};

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Signing name of the service.
const SERVICE_NAME: &str = "athena";

/// Target prefix for the `X-Amz-Target` header.
const TARGET_PREFIX: &str = "AmazonAthena";

const CONTENT_TYPE: &str = "application/x-amz-json-1.1";

/// Query service client speaking the JSON protocol over HTTPS.
#[derive(Debug, Clone)]
pub struct HttpQueryService {
    client: Client,
    endpoint: Url,
    region: String,
    credentials: Credentials,
}

impl HttpQueryService {
    /// Creates a client for the connection's region (or endpoint override).
    pub fn new(config: &ConnectionConfig, credentials: Credentials) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| AthenaError::service(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.endpoint_url()?,
            region: config.region().to_string(),
            credentials,
        })
    }

    /// Returns the endpoint requests are sent to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Sends one signed operation and decodes its response.
    async fn send<I, O>(&self, operation: &str, input: &I) -> Result<O>
    where
        I: Serialize + ?Sized,
        O: DeserializeOwned,
    {
        let body = serde_json::to_vec(input)
            .map_err(|e| AthenaError::internal(format!("Failed to encode {operation}: {e}")))?;

        let scope = SigningScope {
            region: &self.region,
            service: SERVICE_NAME,
            time: Utc::now(),
        };

        let mut headers = BTreeMap::from([
            ("content-type".to_string(), CONTENT_TYPE.to_string()),
            ("host".to_string(), signing::host_header(&self.endpoint)),
            ("x-amz-date".to_string(), scope.amz_date()),
            (
                "x-amz-target".to_string(),
                format!("{TARGET_PREFIX}.{operation}"),
            ),
        ]);
        if let Some(token) = &self.credentials.session_token {
            headers.insert("x-amz-security-token".to_string(), token.clone());
        }

        let authorization = signing::authorization_header(
            "POST",
            &self.endpoint,
            &headers,
            &body,
            &self.credentials,
            &scope,
        )?;

        debug!("Sending {} to {}", operation, self.endpoint);

        let mut request = self.client.post(self.endpoint.clone()).body(body);
        for (name, value) in headers.iter().filter(|(name, _)| name.as_str() != "host") {
            request = request.header(name.as_str(), value.as_str());
        }
        request = request.header("authorization", authorization);

        let response = request
            .send()
            .await
            .map_err(|e| AthenaError::service(format!("{operation} request failed: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AthenaError::service(format!("Failed to read {operation} response: {e}")))?;

        if !status.is_success() {
            return Err(parse_error(status, &text));
        }

        serde_json::from_str(&text)
            .map_err(|e| AthenaError::service(format!("Failed to parse {operation} response: {e}")))
    }
}

/// Converts an error response into a service error.
fn parse_error(status: reqwest::StatusCode, body: &str) -> AthenaError {
    if let Ok(error) = serde_json::from_str::<ErrorResponse>(body) {
        let error_type = error
            .error_type
            .as_deref()
            .map(|t| t.rsplit('#').next().unwrap_or(t).to_string());
        match (error_type, error.message) {
            (Some(t), Some(m)) => return AthenaError::service(format!("{t}: {m}")),
            (Some(t), None) => return AthenaError::service(t),
            (None, Some(m)) => return AthenaError::service(m),
            (None, None) => {}
        }
    }

    AthenaError::service(format!("HTTP {status}: {body}"))
}

#[async_trait]
impl QueryService for HttpQueryService {
    async fn start_query_execution(&self, request: &QueryRequest) -> Result<String> {
        let input = StartQueryExecutionInput {
            query_string: &request.sql,
            work_group: &request.workgroup,
            // Some backends reject an empty-but-present parameter list
            execution_parameters: (!request.parameters.is_empty())
                .then_some(request.parameters.as_slice()),
        };

        let output: StartQueryExecutionOutput = self.send("StartQueryExecution", &input).await?;
        output
            .query_execution_id
            .ok_or_else(|| AthenaError::service("StartQueryExecution returned no execution id"))
    }

    async fn get_query_execution(&self, execution_id: &str) -> Result<QueryExecution> {
        let input = ExecutionIdInput {
            query_execution_id: execution_id,
        };
        let output: GetQueryExecutionOutput = self.send("GetQueryExecution", &input).await?;

        let execution = output.query_execution.unwrap_or_default();
        let status = execution.status.unwrap_or_default();
        Ok(QueryExecution {
            execution_id: execution
                .query_execution_id
                .unwrap_or_else(|| execution_id.to_string()),
            state: status.state,
            state_change_reason: status.state_change_reason,
            statistics: execution.statistics,
        })
    }

    async fn stop_query_execution(&self, execution_id: &str) -> Result<()> {
        let input = ExecutionIdInput {
            query_execution_id: execution_id,
        };
        let _: serde_json::Value = self.send("StopQueryExecution", &input).await?;
        Ok(())
    }

    async fn get_query_results(
        &self,
        execution_id: &str,
        next_token: Option<&str>,
    ) -> Result<ResultPage> {
        let input = GetQueryResultsInput {
            query_execution_id: execution_id,
            next_token,
        };
        let output: GetQueryResultsOutput = self.send("GetQueryResults", &input).await?;
        Ok(output.into_page())
    }

    async fn list_data_catalogs(
        &self,
        next_token: Option<&str>,
    ) -> Result<Page<DataCatalogSummary>> {
        let input = ListDataCatalogsInput { next_token };
        let output: ListDataCatalogsOutput = self.send("ListDataCatalogs", &input).await?;
        Ok(Page {
            items: output.data_catalogs_summary,
            next_token: output.next_token,
        })
    }

    async fn list_databases(
        &self,
        catalog_name: &str,
        next_token: Option<&str>,
    ) -> Result<Page<DatabaseSummary>> {
        let input = ListDatabasesInput {
            catalog_name,
            next_token,
        };
        let output: ListDatabasesOutput = self.send("ListDatabases", &input).await?;
        Ok(Page {
            items: output.database_list,
            next_token: output.next_token,
        })
    }

    async fn list_table_metadata(
        &self,
        catalog_name: &str,
        database_name: &str,
        next_token: Option<&str>,
    ) -> Result<Page<TableMetadata>> {
        let input = ListTableMetadataInput {
            catalog_name,
            database_name,
            next_token,
        };
        let output: ListTableMetadataOutput = self.send("ListTableMetadata", &input).await?;
        Ok(Page {
            items: output.table_metadata_list,
            next_token: output.next_token,
        })
    }

    async fn get_table_metadata(
        &self,
        catalog_name: &str,
        database_name: &str,
        table_name: &str,
    ) -> Result<Option<TableMetadata>> {
        let input = GetTableMetadataInput {
            catalog_name,
            database_name,
            table_name,
        };
        let output: GetTableMetadataOutput = self.send("GetTableMetadata", &input).await?;
        Ok(output.table_metadata)
    }
}

// Wire envelopes

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct StartQueryExecutionInput<'a> {
    query_string: &'a str,
    work_group: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    execution_parameters: Option<&'a [String]>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StartQueryExecutionOutput {
    query_execution_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ExecutionIdInput<'a> {
    query_execution_id: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetQueryExecutionOutput {
    query_execution: Option<WireQueryExecution>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireQueryExecution {
    query_execution_id: Option<String>,
    status: Option<WireStatus>,
    statistics: Option<ExecutionStatistics>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireStatus {
    state: Option<String>,
    state_change_reason: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct GetQueryResultsInput<'a> {
    query_execution_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_token: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetQueryResultsOutput {
    result_set: Option<WireResultSet>,
    next_token: Option<String>,
}

impl GetQueryResultsOutput {
    fn into_page(self) -> ResultPage {
        let result_set = self.result_set.unwrap_or_default();

        let rows = result_set.rows.map(|rows| {
            rows.into_iter()
                .map(|row| RawRow {
                    data: row
                        .data
                        .map(|data| data.into_iter().map(|d| d.var_char_value).collect()),
                })
                .collect()
        });

        let column_info = result_set
            .result_set_metadata
            .and_then(|metadata| metadata.column_info)
            .map(|columns| {
                columns
                    .into_iter()
                    .map(|c| ResultColumn {
                        name: c.name,
                        data_type: c.column_type,
                    })
                    .collect()
            });

        ResultPage {
            rows,
            column_info,
            next_token: self.next_token,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireResultSet {
    rows: Option<Vec<WireRow>>,
    result_set_metadata: Option<WireResultSetMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireRow {
    data: Option<Vec<WireDatum>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireDatum {
    var_char_value: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireResultSetMetadata {
    column_info: Option<Vec<WireColumnInfo>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireColumnInfo {
    name: Option<String>,
    #[serde(rename = "Type")]
    column_type: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ListDataCatalogsInput<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    next_token: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListDataCatalogsOutput {
    data_catalogs_summary: Option<Vec<DataCatalogSummary>>,
    next_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ListDatabasesInput<'a> {
    catalog_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_token: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListDatabasesOutput {
    database_list: Option<Vec<DatabaseSummary>>,
    next_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ListTableMetadataInput<'a> {
    catalog_name: &'a str,
    database_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_token: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListTableMetadataOutput {
    table_metadata_list: Option<Vec<TableMetadata>>,
    next_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct GetTableMetadataInput<'a> {
    catalog_name: &'a str,
    database_name: &'a str,
    table_name: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetTableMetadataOutput {
    table_metadata: Option<TableMetadata>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(rename = "__type")]
    error_type: Option<String>,
    #[serde(alias = "Message")]
    message: Option<String>,
}
