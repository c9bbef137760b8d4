// External crates
use anyhow::{Context, Result};
use std::io::IsTerminal;
use std::panic;
use tracing::error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_error::ErrorLayer;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*, registry::Registry};

/// Filter used when `RUST_LOG` is unset. Only problems by default, since
/// stderr is shared with whatever the user is piping around.
const DEFAULT_FILTER: &str = "warn";

/// Install the global subscriber. Diagnostics always go to stderr, stdout
/// belongs to the tee sink.
///
/// The returned guard flushes the non-blocking writer when dropped.
pub fn init_tracing(json: bool) -> Result<WorkerGuard> {
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(std::io::stderr());

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let fmt_layer = (!json).then(|| {
        fmt::layer()
            .with_ansi(std::io::stderr().is_terminal())
            .with_writer(non_blocking_writer.clone())
            .with_target(false)
            .with_timer(fmt::time::UtcTime::rfc_3339())
    });

    let json_layer = json.then(|| {
        fmt::layer()
            .json()
            .with_writer(non_blocking_writer.clone())
            .with_file(true)
            .with_line_number(true)
            .with_thread_ids(true)
            .with_target(false)
            .with_timer(fmt::time::UtcTime::rfc_3339())
    });

    let subscriber = Registry::default()
        .with(filter)
        .with(fmt_layer)
        .with(json_layer)
        .with(ErrorLayer::default());

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set global tracing subscriber")?;

    Ok(guard)
}

pub fn init_panic_handler() {
    panic::set_hook(Box::new(|panic_info| {
        let msg = match panic_info.payload().downcast_ref::<&str>() {
            Some(s) => (*s).to_string(),
            None => match panic_info.payload().downcast_ref::<String>() {
                Some(s) => s.clone(),
                None => "Unknown panic".to_string(),
            },
        };

        let location = panic_info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_else(|| "unknown location".to_string());

        error!(
            panic_message = %msg,
            location = %location,
            "Application panicked!"
        );
    }));
}
