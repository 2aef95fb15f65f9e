//! athena-glance - browse Athena data catalogs and run SQL from the command line.

use std::sync::Arc;

use athena_glance::catalog::ColumnEntry;
use athena_glance::cli::{read_statement, Cli, Command, OutputFormat};
use athena_glance::config::{region_label, Config, ConnectionConfig, KNOWN_REGIONS};
use athena_glance::credentials::{
    default_config_path, default_credentials_path, list_profiles, ChainCredentialsProvider,
    Credentials, StaticCredentialsProvider,
};
use athena_glance::error::{AthenaError, Result};
use athena_glance::logging;
use athena_glance::persistence::{parameter_sets, sql_log, StateDb, StatementOutcome};
use athena_glance::query::{placeholder_count, CancelHandle, QueryOutcome, QueryResult};
use athena_glance::service::MockQueryService;
use athena_glance::session::Session;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();

    if cli.log_file {
        logging::init_file_logging();
    } else {
        logging::init_stderr_logging();
    }

    if let Err(e) = run(cli).await {
        error!("{}: {}", e.category(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match &cli.command {
        Command::Regions => {
            for (id, label) in KNOWN_REGIONS {
                println!("{id:<16} {label}");
            }
            return Ok(());
        }
        Command::Profiles => {
            let profiles = list_profiles(
                default_credentials_path().as_deref(),
                default_config_path().as_deref(),
            )?;
            for profile in profiles {
                println!("{profile}");
            }
            return Ok(());
        }
        Command::History {
            limit,
            clear,
            params,
        } => {
            return if *params {
                show_parameter_sets(*limit, *clear).await
            } else {
                show_history(*limit, *clear).await
            };
        }
        _ => {}
    }

    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let config = Config::load_from_file(&config_path)?;

    let connection = resolve_connection(&cli, &config)?;
    info!("Connection: {}", connection.display_string());

    let session = build_session(&cli, connection).with_poll_interval(config.polling.interval());

    match cli.command {
        Command::Catalogs => {
            for catalog in require(session.list_catalogs().await?, &session)? {
                print_entry(&catalog.name, catalog.catalog_type.as_deref());
            }
        }
        Command::Databases { catalog } => {
            for database in require(session.list_databases(&catalog).await?, &session)? {
                print_entry(&database.name, database.description.as_deref());
            }
        }
        Command::Tables { catalog, database } => {
            let tables = session.list_tables(&catalog, &database).await?;
            for table in require(tables, &session)? {
                print_entry(&table.name, table.table_type.as_deref());
            }
        }
        Command::Columns {
            catalog,
            database,
            table,
        } => {
            let columns = session.list_columns(&catalog, &database, &table).await?;
            for column in require(columns, &session)? {
                print_column(&column);
            }
        }
        Command::Query {
            sql,
            file,
            params,
            recent_params,
            format,
            no_log,
        } => {
            let statement = read_statement(sql.as_deref(), file.as_ref())?;
            let params = match recent_params {
                Some(position) => saved_parameters(position as usize).await?,
                None => params,
            };
            let connection_name = cli.connection.as_deref().unwrap_or("default");
            run_statement(&session, connection_name, &statement, &params, format, no_log).await?;
        }
        Command::History { .. } | Command::Profiles | Command::Regions => {}
    }

    Ok(())
}

/// Resolves the final connection configuration from CLI args, config file, and environment.
fn resolve_connection(cli: &Cli, config: &Config) -> Result<ConnectionConfig> {
    // Named connection must exist; the default one is optional
    let mut connection = match cli.connection_name() {
        Some(name) => config.get_connection(Some(name)).cloned().ok_or_else(|| {
            AthenaError::config(format!("Connection '{}' not found in config file", name))
        })?,
        None => config.get_connection(None).cloned().unwrap_or_default(),
    };

    if let Some(overrides) = cli.to_connection_config() {
        connection.merge(&overrides);
    }

    connection.apply_env_defaults();

    if region_label(connection.region()).is_none() {
        warn!("Unknown region '{}'", connection.region());
    }

    Ok(connection)
}

fn build_session(cli: &Cli, connection: ConnectionConfig) -> Session {
    if cli.mock {
        let credentials = Credentials::new("mock-access-key", "mock-secret-key");
        return Session::new(connection, Arc::new(StaticCredentialsProvider::new(credentials)))
            .with_service(Arc::new(MockQueryService::with_sample_data()));
    }

    Session::new(connection, Arc::new(ChainCredentialsProvider::default_chain()))
}

/// Turns the silent credential abort into a CLI error.
fn require<T>(value: Option<T>, session: &Session) -> Result<T> {
    value.ok_or_else(|| {
        AthenaError::credentials(format!(
            "No credentials available for profile '{}'",
            session.connection().profile()
        ))
    })
}

async fn run_statement(
    session: &Session,
    connection_name: &str,
    statement: &str,
    params: &[String],
    format: OutputFormat,
    no_log: bool,
) -> Result<()> {
    let expected = placeholder_count(statement);
    if expected != params.len() {
        return Err(AthenaError::config(format!(
            "Statement has {} placeholder(s) but {} parameter(s) were given",
            expected,
            params.len()
        )));
    }

    let handle = CancelHandle::new();
    let watcher = handle.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        // Nothing submitted yet, so there is nothing to stop
        if !watcher.cancel() {
            std::process::exit(130);
        }
        eprintln!("Cancelling query (press Ctrl-C again to quit)...");
        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(130);
        }
    });

    let outcome = session.run_query(statement, params, Some(&handle)).await;
    interrupt.abort();

    let log = StatementLog {
        db: if no_log { None } else { open_state_db().await },
        connection_name,
        statement,
        params,
    };

    let result = match outcome {
        Ok(Some(QueryOutcome::Completed(result))) => {
            let row_count = Some(result.row_count() as i64);
            log.record(StatementOutcome::Succeeded, row_count, None).await;
            print_result(&result, format).map(|()| eprintln!("{}", result.statistics_report()))
        }
        // Also reached when the job was stopped outside this process
        Ok(Some(QueryOutcome::Cancelled)) => {
            log.record(StatementOutcome::Cancelled, None, None).await;
            eprintln!("Query cancelled");
            Ok(())
        }
        Ok(None) => require(None::<()>, session),
        Err(e) => {
            log.record(StatementOutcome::Failed, None, Some(&e.to_string())).await;
            Err(e)
        }
    };

    log.close().await;
    result
}

/// Opens the state database; logging is best-effort.
async fn open_state_db() -> Option<StateDb> {
    match StateDb::open_default().await {
        Ok(db) => Some(db),
        Err(e) => {
            warn!("SQL log unavailable: {e}");
            None
        }
    }
}

/// Best-effort SQL log writer for one statement.
struct StatementLog<'a> {
    db: Option<StateDb>,
    connection_name: &'a str,
    statement: &'a str,
    params: &'a [String],
}

impl StatementLog<'_> {
    async fn record(
        &self,
        outcome: StatementOutcome,
        row_count: Option<i64>,
        error_message: Option<&str>,
    ) {
        let Some(db) = &self.db else {
            return;
        };

        if let Err(e) = sql_log::record_statement(
            db.pool(),
            self.connection_name,
            self.statement,
            outcome,
            row_count,
            error_message,
        )
        .await
        {
            warn!("Failed to record statement: {e}");
        }

        if !self.params.is_empty() {
            if let Err(e) = parameter_sets::add_parameter_set(db.pool(), self.params).await {
                warn!("Failed to record parameters: {e}");
            }
        }
    }

    async fn close(self) {
        if let Some(db) = self.db {
            db.close().await;
        }
    }
}

/// Looks up a saved parameter set for `query --recent-params`.
async fn saved_parameters(position: usize) -> Result<Vec<String>> {
    let db = StateDb::open_default().await?;
    let found = parameter_sets::recent_parameter_set(db.pool(), position).await;
    db.close().await;

    let set = found?.ok_or_else(|| {
        AthenaError::config(format!("No saved parameter set #{position}"))
    })?;
    eprintln!("Using parameters: {}", set.label());
    Ok(set.items)
}

async fn show_parameter_sets(limit: Option<i64>, clear: bool) -> Result<()> {
    let db = StateDb::open_default().await?;

    let result = if clear {
        parameter_sets::clear_parameter_sets(db.pool())
            .await
            .map(|removed| println!("Removed {removed} parameter sets"))
    } else {
        parameter_sets::list_parameter_sets(db.pool()).await.map(|sets| {
            let shown = limit.map_or(sets.len(), |n| n.max(0) as usize);
            for (position, set) in sets.iter().take(shown).enumerate() {
                println!("{:>3}  {}  {}", position + 1, set.created_at, set.label());
            }
        })
    };

    db.close().await;
    result
}

async fn show_history(limit: Option<i64>, clear: bool) -> Result<()> {
    let db = StateDb::open_default().await?;

    if clear {
        let removed = sql_log::clear_statements(db.pool()).await?;
        println!("Removed {removed} entries");
    } else {
        for entry in sql_log::list_statements(db.pool(), limit).await? {
            println!(
                "{:>5}  {}  {:<9}  {}",
                entry.id,
                entry.created_at,
                entry.outcome.as_str(),
                entry.statement.replace('\n', " ")
            );
        }
    }

    db.close().await;
    Ok(())
}

fn print_result(result: &QueryResult, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{}", result.format_table()),
        OutputFormat::Csv => print!("{}", result.to_csv()),
        OutputFormat::Json => println!("{}", result.to_json()?),
    }
    Ok(())
}

fn print_entry(name: &str, detail: Option<&str>) {
    match detail {
        Some(detail) => println!("{name}\t{detail}"),
        None => println!("{name}"),
    }
}

fn print_column(column: &ColumnEntry) {
    let data_type = column.data_type.as_deref().unwrap_or("");
    let marker = if column.partition_key { " (partition key)" } else { "" };
    match column.comment.as_deref() {
        Some(comment) => println!("{}\t{data_type}{marker}\t{comment}", column.name),
        None => println!("{}\t{data_type}{marker}", column.name),
    }
}
