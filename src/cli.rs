//! Command-line argument parsing for athena-glance.

use crate::config::ConnectionConfig;
use crate::error::{AthenaError, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::Read;
use std::path::PathBuf;

/// How query results are printed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Aligned plain-text table.
    #[default]
    Table,
    /// CSV with a header row.
    Csv,
    /// JSON object with columns, rows and statistics.
    Json,
}

/// Browse Athena data catalogs and run SQL queries.
#[derive(Parser, Debug)]
#[command(name = "athena-glance")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Use named connection from config
    #[arg(short = 'c', long, value_name = "NAME", global = true)]
    pub connection: Option<String>,

    /// Config file path
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Region id (e.g. eu-west-1)
    #[arg(long, value_name = "REGION", global = true)]
    pub region: Option<String>,

    /// Workgroup to submit queries under
    #[arg(long, value_name = "WORKGROUP", global = true)]
    pub workgroup: Option<String>,

    /// Credentials profile
    #[arg(long, value_name = "PROFILE", global = true)]
    pub profile: Option<String>,

    /// Service endpoint override
    #[arg(long, value_name = "URL", global = true)]
    pub endpoint: Option<String>,

    /// Write logs to a file instead of stderr
    #[arg(long, global = true)]
    pub log_file: bool,

    /// Use the in-memory sample service (for testing)
    #[arg(long, global = true)]
    pub mock: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List data catalogs
    Catalogs,

    /// List databases in a catalog
    Databases {
        catalog: String,
    },

    /// List tables in a database
    Tables {
        catalog: String,
        database: String,
    },

    /// List columns of a table, partition keys last
    Columns {
        catalog: String,
        database: String,
        table: String,
    },

    /// Run a SQL statement
    Query {
        /// Statement text (read from --file or stdin when omitted)
        #[arg(value_name = "SQL")]
        sql: Option<String>,

        /// Read the statement from a file
        #[arg(long, value_name = "PATH", conflicts_with = "sql")]
        file: Option<PathBuf>,

        /// Bind value for the next `?` placeholder, in order
        #[arg(short = 'p', long = "param", value_name = "VALUE")]
        params: Vec<String>,

        /// Reuse the N-th most recent parameter set (see `history --params`)
        #[arg(
            long,
            value_name = "N",
            conflicts_with = "params",
            value_parser = clap::value_parser!(u32).range(1..)
        )]
        recent_params: Option<u32>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,

        /// Do not record the statement in the SQL log
        #[arg(long)]
        no_log: bool,
    },

    /// Show or clear the SQL log
    History {
        /// Show at most N entries
        #[arg(long, value_name = "N")]
        limit: Option<i64>,

        /// Delete every entry
        #[arg(long, conflicts_with = "limit")]
        clear: bool,

        /// Work on saved parameter sets instead of statements
        #[arg(long)]
        params: bool,
    },

    /// List credentials profiles found on this machine
    Profiles,

    /// List known regions
    Regions,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Connection overrides given on the command line, if any.
    pub fn to_connection_config(&self) -> Option<ConnectionConfig> {
        if self.region.is_none()
            && self.workgroup.is_none()
            && self.profile.is_none()
            && self.endpoint.is_none()
        {
            return None;
        }

        Some(ConnectionConfig {
            region: self.region.clone(),
            workgroup: self.workgroup.clone(),
            profile: self.profile.clone(),
            endpoint: self.endpoint.clone(),
        })
    }

    /// Returns the config file path to use.
    ///
    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(crate::config::Config::default_path)
    }

    /// Returns the named connection to use, if specified.
    pub fn connection_name(&self) -> Option<&str> {
        self.connection.as_deref()
    }
}

/// Resolves the statement text of a `query` command.
pub fn read_statement(sql: Option<&str>, file: Option<&PathBuf>) -> Result<String> {
    let text = match (sql, file) {
        (Some(sql), _) => sql.to_string(),
        (None, Some(path)) => std::fs::read_to_string(path).map_err(|e| {
            AthenaError::config(format!("Failed to read {}: {e}", path.display()))
        })?,
        (None, None) => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .map_err(|e| AthenaError::internal(format!("Failed to read stdin: {e}")))?;
            buf
        }
    };

    let text = text.trim();
    if text.is_empty() {
        return Err(AthenaError::config("No SQL statement given"));
    }
    Ok(text.to_string())
}
