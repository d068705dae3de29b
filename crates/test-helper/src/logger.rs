use tracing::subscriber::set_global_default;
use tracing_subscriber::{filter::LevelFilter, fmt::format::FmtSpan, layer::SubscriberExt};

/// Logs everything to the test output. Later calls in the same process are ignored.
pub fn init_logger() {
    let filter = tracing_subscriber::filter::Targets::new().with_default(LevelFilter::TRACE);

    let std_logger = tracing_subscriber::fmt::layer()
        .with_test_writer()
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(false)
        .with_target(false)
        .without_time();

    let collector = tracing_subscriber::registry().with(std_logger).with(filter);

    let _ = set_global_default(collector);
}
