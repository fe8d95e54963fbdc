//! Tracing initialisation for the `spectrum` binary.
//!
//! Logs go to stderr and, when configured, to a plain-text file as well
//! (`build/test.log` in CI). Check adapters attach the article being
//! verified through an `article` span.

use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingSettings;

/// Log file used when `--log-file` is given without a path
pub const DEFAULT_LOG_FILE: &str = "build/test.log";

/// Parse a level or filter directive such as `debug` or `spectrum=debug`.
pub fn parse_filter(directives: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(directives).with_context(|| format!("Invalid log level '{directives}'"))
}

/// Install the global subscriber. Only the first call in a process takes
/// effect; later ones are reported to the subscriber already in place.
pub fn init_logging(settings: &LoggingSettings) -> Result<()> {
    let filter = parse_filter(&settings.level)?;

    let file_layer = match &settings.file {
        Some(path) => Some(
            fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(open_log_file(path)?)),
        ),
        None => None,
    };

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init();
    if let Err(err) = installed {
        debug!(error = %err, "Keeping the subscriber already installed");
    }

    Ok(())
}

fn open_log_file(path: &Path) -> Result<fs::File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory: {}", parent.display()))?;
    }

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file: {}", path.display()))
}
