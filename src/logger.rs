use std::fs::OpenOptions;
use std::path::Path;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::error::{Error, Result};

/// Pick the filter level for a logging destination.
///
/// Standard error shares the local terminal, which is in raw mode for most of
/// the run, so it stays silent unless `--debug` is given. A log file gets
/// `INFO` by default.
pub fn level_for(debug: bool, to_file: bool) -> LevelFilter {
    match (debug, to_file) {
        (true, _) => LevelFilter::DEBUG,
        (false, true) => LevelFilter::INFO,
        (false, false) => LevelFilter::OFF,
    }
}

/// Initialize logging with the specified debug level.
///
/// Logs go to standard error, or are appended to `log_file` when one is given.
/// The returned guard must be kept alive for the file writer to flush.
pub fn init_logging(
    debug: bool,
    log_file: Option<&str>,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let level = level_for(debug, log_file.is_some());

    let targets = Targets::new().with_default(level);

    let guard = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(Path::new(path))
                .map_err(|e| Error::Logging(format!("cannot open log file {}: {}", path, e)))?;
            let (writer, guard) = tracing_appender::non_blocking(file);

            tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .with_writer(writer)
                        .with_ansi(false)
                        .with_thread_ids(true)
                        .with_level(true)
                        .with_target(true)
                        .with_line_number(true),
                )
                .with(targets)
                .try_init()
                .map_err(|e| Error::Logging(e.to_string()))?;
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_level(true)
                        .with_target(true),
                )
                .with(targets)
                .try_init()
                .map_err(|e| Error::Logging(e.to_string()))?;
            None
        }
    };

    tracing::info!("Logging initialized with level: {:?}", level);
    Ok(guard)
}
