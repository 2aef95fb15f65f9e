//! SQL log persistence.
//!
//! Records every statement run from the CLI together with how it ended.

use crate::error::{AthenaError, Result};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqlitePool;
use sqlx::FromRow;

const MAX_LOG_ENTRIES: i64 = 1000;

/// How a logged statement ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatementOutcome {
    Succeeded,
    Failed,
    Cancelled,
}

impl StatementOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    fn from_str(s: &str) -> Self {
        match s {
            "failed" => Self::Failed,
            "cancelled" => Self::Cancelled,
            _ => Self::Succeeded,
        }
    }
}

/// A logged statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqlLogEntry {
    pub id: i64,
    pub connection_name: String,
    pub statement: String,
    pub outcome: StatementOutcome,
    pub row_count: Option<i64>,
    pub error_message: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, FromRow)]
struct SqlLogRow {
    id: i64,
    connection_name: String,
    statement: String,
    outcome: String,
    row_count: Option<i64>,
    error_message: Option<String>,
    created_at: String,
}

impl From<SqlLogRow> for SqlLogEntry {
    fn from(row: SqlLogRow) -> Self {
        Self {
            id: row.id,
            connection_name: row.connection_name,
            statement: row.statement,
            outcome: StatementOutcome::from_str(&row.outcome),
            row_count: row.row_count,
            error_message: row.error_message,
            created_at: row.created_at,
        }
    }
}

/// Records a statement and returns its id.
pub async fn record_statement(
    pool: &SqlitePool,
    connection_name: &str,
    statement: &str,
    outcome: StatementOutcome,
    row_count: Option<i64>,
    error_message: Option<&str>,
) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO sql_log (connection_name, statement, outcome, row_count, error_message)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(connection_name)
    .bind(statement)
    .bind(outcome.as_str())
    .bind(row_count)
    .bind(error_message)
    .execute(pool)
    .await
    .map_err(|e| AthenaError::persistence(format!("Failed to record statement: {e}")))?;

    let id = result.last_insert_rowid();

    prune_old_entries(pool).await?;

    Ok(id)
}

async fn prune_old_entries(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        DELETE FROM sql_log
        WHERE id NOT IN (
            SELECT id FROM sql_log
            ORDER BY id DESC
            LIMIT ?
        )
        "#,
    )
    .bind(MAX_LOG_ENTRIES)
    .execute(pool)
    .await
    .map_err(|e| AthenaError::persistence(format!("Failed to prune SQL log: {e}")))?;

    Ok(())
}

/// Lists logged statements, newest first.
pub async fn list_statements(pool: &SqlitePool, limit: Option<i64>) -> Result<Vec<SqlLogEntry>> {
    let rows: Vec<SqlLogRow> = sqlx::query_as(
        r#"
        SELECT id, connection_name, statement, outcome, row_count, error_message, created_at
        FROM sql_log
        ORDER BY id DESC
        LIMIT ?
        "#,
    )
    .bind(limit.unwrap_or(-1))
    .fetch_all(pool)
    .await
    .map_err(|e| AthenaError::persistence(format!("Failed to list SQL log: {e}")))?;

    Ok(rows.into_iter().map(SqlLogEntry::from).collect())
}

/// Deletes one logged statement. Returns true if it existed.
pub async fn delete_statement(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM sql_log WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| AthenaError::persistence(format!("Failed to delete statement: {e}")))?;

    Ok(result.rows_affected() > 0)
}

/// Clears the whole log.
pub async fn clear_statements(pool: &SqlitePool) -> Result<u64> {
    let result = sqlx::query("DELETE FROM sql_log")
        .execute(pool)
        .await
        .map_err(|e| AthenaError::persistence(format!("Failed to clear SQL log: {e}")))?;

    Ok(result.rows_affected())
}

pub async fn count_statements(pool: &SqlitePool) -> Result<i64> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sql_log")
        .fetch_one(pool)
        .await
        .map_err(|e| AthenaError::persistence(format!("Failed to count SQL log: {e}")))?;

    Ok(count)
}
