use std::path::Path;

use tracing::{Level, debug, info, subscriber::set_global_default};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt::format::FmtSpan, layer::SubscriberExt};

use crate::config::Config;

const LOG_FILE: &str = "unity-capture.log";

/// Installs a subscriber writing to the log file in `dir`.
///
/// Returns the guard flushing the file, or `None` when file logging is off or the host already
/// installed a subscriber.
pub fn setup_logger(config: &Config, dir: Option<&Path>) -> Option<WorkerGuard> {
    if !config.log_to_file {
        return None;
    }
    let dir = dir?;

    let filter =
        tracing_subscriber::filter::Targets::new().with_default(Level::from(config.log_level));

    let file = tracing_appender::rolling::never(dir, LOG_FILE);
    let (file_writer, file_guard) = tracing_appender::non_blocking(file);
    let file_logger = tracing_subscriber::fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(false)
        .with_span_events(FmtSpan::CLOSE);

    let collector = tracing_subscriber::registry().with(file_logger).with(filter);

    if let Err(e) = set_global_default(collector) {
        debug!("Using the existing subscriber: {e}");
        return None;
    }

    info!("Unity Capture v{}", env!("CARGO_PKG_VERSION"));
    Some(file_guard)
}
