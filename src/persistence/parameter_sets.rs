//! Recently used bind-parameter sets.
//!
//! Keeps the most recent sets, newest first, so a parameterized query can
//! be re-run with values used before. Saving a set that is already stored
//! moves it to the front.

use crate::error::{AthenaError, Result};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqlitePool;

const MAX_PARAMETER_SETS: i64 = 20;

/// An ordered list of bind values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSet {
    pub id: i64,
    pub items: Vec<String>,
    pub created_at: String,
}

impl ParameterSet {
    /// Comma-joined form, as typed on the command line.
    pub fn label(&self) -> String {
        self.items.join(",")
    }
}

/// Stores a parameter set and drops the oldest beyond the retention limit.
pub async fn add_parameter_set(pool: &SqlitePool, items: &[String]) -> Result<i64> {
    let encoded = serde_json::to_string(items)
        .map_err(|e| AthenaError::persistence(format!("Failed to encode parameters: {e}")))?;

    sqlx::query("DELETE FROM parameter_sets WHERE items = ?")
        .bind(&encoded)
        .execute(pool)
        .await
        .map_err(|e| AthenaError::persistence(format!("Failed to save parameters: {e}")))?;

    let result = sqlx::query("INSERT INTO parameter_sets (items) VALUES (?)")
        .bind(encoded)
        .execute(pool)
        .await
        .map_err(|e| AthenaError::persistence(format!("Failed to save parameters: {e}")))?;

    sqlx::query(
        r#"
        DELETE FROM parameter_sets
        WHERE id NOT IN (
            SELECT id FROM parameter_sets
            ORDER BY id DESC
            LIMIT ?
        )
        "#,
    )
    .bind(MAX_PARAMETER_SETS)
    .execute(pool)
    .await
    .map_err(|e| AthenaError::persistence(format!("Failed to prune parameters: {e}")))?;

    Ok(result.last_insert_rowid())
}

/// Lists stored parameter sets, newest first.
pub async fn list_parameter_sets(pool: &SqlitePool) -> Result<Vec<ParameterSet>> {
    let rows: Vec<(i64, String, String)> =
        sqlx::query_as("SELECT id, items, created_at FROM parameter_sets ORDER BY id DESC")
            .fetch_all(pool)
            .await
            .map_err(|e| AthenaError::persistence(format!("Failed to list parameters: {e}")))?;

    rows.into_iter().map(decode).collect()
}

/// Returns the `position`-th most recent set; 1 is the newest.
pub async fn recent_parameter_set(
    pool: &SqlitePool,
    position: usize,
) -> Result<Option<ParameterSet>> {
    let Some(offset) = position.checked_sub(1) else {
        return Ok(None);
    };

    let row: Option<(i64, String, String)> = sqlx::query_as(
        "SELECT id, items, created_at FROM parameter_sets ORDER BY id DESC LIMIT 1 OFFSET ?",
    )
    .bind(offset as i64)
    .fetch_optional(pool)
    .await
    .map_err(|e| AthenaError::persistence(format!("Failed to read parameters: {e}")))?;

    row.map(decode).transpose()
}

fn decode((id, items, created_at): (i64, String, String)) -> Result<ParameterSet> {
    let items = serde_json::from_str(&items)
        .map_err(|e| AthenaError::persistence(format!("Corrupt parameter set {id}: {e}")))?;
    Ok(ParameterSet {
        id,
        items,
        created_at,
    })
}

pub async fn clear_parameter_sets(pool: &SqlitePool) -> Result<u64> {
    let result = sqlx::query("DELETE FROM parameter_sets")
        .execute(pool)
        .await
        .map_err(|e| AthenaError::persistence(format!("Failed to clear parameters: {e}")))?;

    Ok(result.rows_affected())
}
