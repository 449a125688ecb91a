//! Logging setup for the textmacro binary
//!
//! The library only emits `tracing` events; installing a subscriber is up to
//! the host. The binary installs two layers:
//!
//! - stderr, filtered by `RUST_LOG` or else by the `-v` count
//!   (`warn`, `info`, `debug`, `trace`)
//! - a daily-rotated file under `~/.config/textmacro/logs/` at debug level,
//!   written from a background thread
//!
//! Module filtering works as usual, e.g.
//! `RUST_LOG=textmacro::detector=trace,textmacro::history=debug`.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config_paths;

/// Console level for a `-v` count
pub fn level_for_verbosity(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Install the subscriber. Keep the returned guard alive until exit so
/// buffered file output is flushed.
pub fn init(verbose: u8) -> Option<WorkerGuard> {
    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_for_verbosity(verbose)));

    // stdout carries the replay result
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_filter(console_filter);

    let (file_layer, guard) = match config_paths::ensure_logs_dir() {
        Ok(dir) => {
            let appender = tracing_appender::rolling::daily(dir, config_paths::LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_line_number(true)
                .with_filter(EnvFilter::new("textmacro=debug"));
            (Some(layer), Some(guard))
        }
        Err(e) => {
            eprintln!("Warning: file logging disabled: {}", e);
            (None, None)
        }
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();
    guard
}
