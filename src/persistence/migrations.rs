//! Forward-only schema migrations for the state database.
//!
//! Each entry of [`MIGRATIONS`] upgrades the schema by one version. A
//! version's statements run in one transaction together with the row that
//! records it, so a failed upgrade leaves the previous version intact.

use crate::error::{AthenaError, Result};
use sqlx::sqlite::SqlitePool;
use tracing::info;

/// Statements per schema version; version N is `MIGRATIONS[N - 1]`.
const MIGRATIONS: &[&[&str]] = &[
    // v1: SQL log and parameter sets
    &[
        r#"
        CREATE TABLE sql_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            connection_name TEXT NOT NULL,
            statement TEXT NOT NULL,
            outcome TEXT NOT NULL CHECK (outcome IN ('succeeded', 'failed', 'cancelled')),
            row_count INTEGER,
            error_message TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
        "CREATE INDEX idx_sql_log_created ON sql_log(created_at)",
        r#"
        CREATE TABLE parameter_sets (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            items TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    ],
];

fn latest_version() -> i32 {
    MIGRATIONS.len() as i32
}

/// Brings the schema up to the latest version.
///
/// Refuses to touch a database written by a newer release.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_versions (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| AthenaError::persistence(format!("Failed to create schema_versions table: {e}")))?;

    let current = schema_version(pool).await?;
    let latest = latest_version();

    if current > latest {
        return Err(AthenaError::persistence(format!(
            "State database schema v{current} is newer than supported v{latest}; \
             upgrade athena-glance to open it"
        )));
    }

    for (index, statements) in MIGRATIONS.iter().enumerate().skip(current as usize) {
        let version = index as i32 + 1;
        apply(pool, version, statements).await?;
        info!("State database migrated to v{}", version);
    }

    Ok(())
}

/// Highest applied version; 0 for a fresh database.
async fn schema_version(pool: &SqlitePool) -> Result<i32> {
    let (version,): (Option<i32>,) = sqlx::query_as("SELECT MAX(version) FROM schema_versions")
        .fetch_one(pool)
        .await
        .map_err(|e| AthenaError::persistence(format!("Failed to read schema version: {e}")))?;

    Ok(version.unwrap_or(0))
}

async fn apply(pool: &SqlitePool, version: i32, statements: &[&str]) -> Result<()> {
    let fail = |e: sqlx::Error| AthenaError::persistence(format!("Migration v{version} failed: {e}"));

    let mut tx = pool.begin().await.map_err(fail)?;
    for statement in statements {
        sqlx::query(statement).execute(&mut *tx).await.map_err(fail)?;
    }
    sqlx::query("INSERT INTO schema_versions (version) VALUES (?)")
        .bind(version)
        .execute(&mut *tx)
        .await
        .map_err(fail)?;
    tx.commit().await.map_err(fail)
}
