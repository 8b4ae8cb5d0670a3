//! Where `ers` writes its own log.
//!
//! stdout carries LSP frames and stderr is the editor's output pane, so
//! tracing only ever goes to a file.

use std::fs::{File, OpenOptions, create_dir_all};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Filter directives for our own log, e.g. `ERS_LOG=ers_runtime=debug`.
pub const LOG_ENV: &str = "ERS_LOG";

const DEFAULT_FILTER: &str = "info";

/// The log file that opened, plus why earlier paths were passed over.
#[derive(Debug)]
struct LogTarget {
    file: Option<(PathBuf, File)>,
    skipped: Vec<String>,
}

pub fn init_tracing() {
    let (filter, bad_filter) = log_filter(std::env::var(LOG_ENV).ok().as_deref());
    let target = open_first_writable(log_paths());

    let Some((path, file)) = target.file else {
        tracing_subscriber::registry().with(filter).init();
        return;
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        .with(filter)
        .init();

    tracing::info!(path = %path.display(), version = env!("CARGO_PKG_VERSION"), "Logging to file");
    if let Some(reason) = bad_filter {
        tracing::warn!(var = LOG_ENV, "Ignoring log filter: {reason}");
    }
    for reason in target.skipped {
        tracing::warn!("{reason}");
    }
}

/// Parse `directives`, falling back to `info` when absent or invalid.
fn log_filter(directives: Option<&str>) -> (EnvFilter, Option<String>) {
    match directives.map(EnvFilter::try_new) {
        None => (EnvFilter::new(DEFAULT_FILTER), None),
        Some(Ok(filter)) => (filter, None),
        Some(Err(e)) => (EnvFilter::new(DEFAULT_FILTER), Some(e.to_string())),
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    if let Some(dir) = path.parent() {
        create_dir_all(dir)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

fn open_first_writable(paths: impl IntoIterator<Item = PathBuf>) -> LogTarget {
    let mut skipped = Vec::new();
    for path in paths {
        match open_append(&path) {
            Ok(file) => {
                return LogTarget {
                    file: Some((path, file)),
                    skipped,
                };
            }
            Err(e) => skipped.push(format!("Cannot log to {}: {e}", path.display())),
        }
    }
    LogTarget {
        file: None,
        skipped,
    }
}

/// `~/.ers/logs/ers.log`, then `./.ers/logs/ers.log` for a missing home.
fn log_paths() -> Vec<PathBuf> {
    let relative = Path::new("logs").join("ers.log");
    ers_config::ers_dir()
        .map(|dir| dir.join(&relative))
        .into_iter()
        .chain([Path::new(".ers").join(relative)])
        .collect()
}
