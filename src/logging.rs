//! Logging setup for athena-glance.
//!
//! Query output goes to stdout, so logs default to stderr. `--log-file`
//! sends them to a file in the platform state directory instead.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Used when `RUST_LOG` is unset. sqlx logs every statement at info.
const DEFAULT_DIRECTIVES: &str = "info,sqlx=warn";

/// Where log lines are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    File(PathBuf),
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES))
}

/// Installs the global subscriber for the given target.
///
/// A file that cannot be opened falls back to stderr. Installing twice is a
/// no-op.
pub fn init(target: LogTarget) {
    let file = match &target {
        LogTarget::Stderr => None,
        LogTarget::File(path) => match open_log_file(path) {
            Ok(file) => Some(file),
            Err(e) => {
                eprintln!("Warning: Could not open log file {}: {e}", path.display());
                None
            }
        },
    };

    let builder = tracing_subscriber::fmt().with_env_filter(env_filter());
    let _ = match file {
        Some(file) => builder.with_writer(file).with_ansi(false).try_init(),
        None => builder.with_writer(io::stderr).try_init(),
    };
}

/// Logs to the file at [`get_log_path`].
pub fn init_file_logging() {
    init(LogTarget::File(get_log_path()));
}

/// Logs to stderr.
pub fn init_stderr_logging() {
    init(LogTarget::Stderr);
}

/// Creates the log file and its directory. Each run starts a fresh file.
fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    File::create(path)
}

/// Returns the path for the log file.
///
/// `~/.local/state/athena-glance/athena-glance.log` on Linux; the config
/// directory, then the temp directory, elsewhere.
pub fn get_log_path() -> PathBuf {
    dirs::state_dir()
        .or_else(dirs::config_dir)
        .map(|dir| dir.join("athena-glance").join("athena-glance.log"))
        .unwrap_or_else(|| std::env::temp_dir().join("athena-glance.log"))
}
