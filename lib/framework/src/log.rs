use tracing::level_filters::LevelFilter;
use tracing_subscriber::Layer as _;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

use crate::exception::Exception;
use crate::exception::Severity;

pub fn init() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_ansi(false) // generally cloud log console doesn't support color
                .with_line_number(true)
                .with_thread_ids(true)
                .with_filter(LevelFilter::INFO),
        )
        .init();
}

pub fn log_exception(e: &Exception) {
    let message = &e.message;
    match e.severity {
        Severity::Warn => match e.code {
            Some(ref error_code) => tracing::warn!(error_code, backtrace = e.to_string(), "{message}"),
            None => tracing::warn!(backtrace = e.to_string(), "{message}"),
        },
        Severity::Error => match e.code {
            Some(ref error_code) => tracing::error!(error_code, backtrace = e.to_string(), "{message}"),
            None => tracing::error!(backtrace = e.to_string(), "{message}"),
        },
    }
}
