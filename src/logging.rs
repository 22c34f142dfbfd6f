//! Diagnostic log sink
//!
//! Every run appends plain-text, timestamped lines to `<input>/<name>.log`.

use crate::error::{Error, Result};
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

fn filter_for(verbose: bool) -> EnvFilter {
    if verbose {
        return EnvFilter::new("debug,hyper=info,reqwest=info");
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn open_append(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| Error::Logging(format!("cannot open log file {}: {}", path.display(), e)))
}

fn file_subscriber(file: File, verbose: bool) -> impl tracing::Subscriber + Send + Sync + 'static {
    tracing_subscriber::fmt()
        .with_env_filter(filter_for(verbose))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .finish()
}

/// Install the global subscriber writing to `path` in append mode.
///
/// `RUST_LOG` selects the level unless `verbose` forces debug output.
///
/// # Errors
/// Returns [`Error::Logging`] if the file cannot be opened or a global subscriber is
/// already installed
pub fn init_file_logging(path: &Path, verbose: bool) -> Result<()> {
    let file = open_append(path)?;
    tracing::subscriber::set_global_default(file_subscriber(file, verbose))
        .map_err(|e| Error::Logging(e.to_string()))
}
