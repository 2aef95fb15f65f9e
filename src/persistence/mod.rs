//! Local state for athena-glance.
//!
//! A single SQLite file holds the SQL log and recently used bind-parameter
//! sets. Nothing secret is stored here; credentials stay in the AWS files.

mod migrations;
pub mod parameter_sets;
pub mod sql_log;

pub use parameter_sets::ParameterSet;
pub use sql_log::{SqlLogEntry, StatementOutcome};

use crate::error::{AthenaError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Attempts per open; a busy file usually frees up within a few hundred ms.
const OPEN_ATTEMPTS: u32 = 3;
const OPEN_BACKOFF: Duration = Duration::from_millis(200);

/// Handle on the state database.
pub struct StateDb {
    pool: SqlitePool,
    db_path: PathBuf,
}

impl StateDb {
    /// Opens the database at [`StateDb::default_path`].
    pub async fn open_default() -> Result<Self> {
        Self::open(&Self::default_path()?).await
    }

    /// Opens or creates the database at `path` and migrates it.
    ///
    /// A file that still cannot be opened after retrying is moved to
    /// `<name>.db.bak` and replaced with an empty database.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| {
                AthenaError::persistence(format!("Failed to create {}: {e}", dir.display()))
            })?;
        }

        let pool = match Self::open_with_retry(path).await {
            Ok(pool) => pool,
            Err(e) => {
                warn!("State database at {} is unusable: {e}", path.display());
                Self::set_aside(path)?;
                Self::open_with_retry(path).await.map_err(|e| {
                    AthenaError::persistence(format!("Failed to recreate state database: {e}"))
                })?
            }
        };

        info!("State database opened at {}", path.display());
        Ok(Self {
            pool,
            db_path: path.to_path_buf(),
        })
    }

    /// `<config_dir>/athena-glance/state.db`
    pub fn default_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("athena-glance").join("state.db"))
            .ok_or_else(|| AthenaError::persistence("Could not determine config directory"))
    }

    async fn open_with_retry(path: &Path) -> Result<SqlitePool> {
        let mut attempt = 1;
        loop {
            match Self::connect_and_migrate(path).await {
                Ok(pool) => return Ok(pool),
                Err(e) if attempt < OPEN_ATTEMPTS => {
                    debug!("Opening state database failed (attempt {attempt}): {e}");
                    tokio::time::sleep(OPEN_BACKOFF * attempt).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn connect_and_migrate(path: &Path) -> Result<SqlitePool> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(|e| AthenaError::persistence(format!("Failed to connect: {e}")))?;

        if let Err(e) = migrations::run_migrations(&pool).await {
            pool.close().await;
            return Err(e);
        }
        Ok(pool)
    }

    /// Moves an unusable database file out of the way.
    fn set_aside(path: &Path) -> Result<()> {
        if !path.exists() {
            return Ok(());
        }
        let backup = path.with_extension("db.bak");
        std::fs::rename(path, &backup).map_err(|e| {
            AthenaError::persistence(format!("Failed to move {} aside: {e}", path.display()))
        })?;
        warn!("Moved unusable state database to {}", backup.display());
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
