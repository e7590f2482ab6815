use std::fs::OpenOptions;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::constants::{LOG_FILE_ENV, LOG_FILTER_ENV};

/// Install the global subscriber.
///
/// Warnings go to stderr by default; `TUTU_LOG` takes EnvFilter directives.
/// When `TUTU_LOG_FILE` is set, DEBUG output is also appended to that file.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(filter);

    let registry = tracing_subscriber::registry().with(stderr_layer);

    let file_logging = std::env::var(LOG_FILE_ENV).ok();
    if let Some(log_path) = file_logging {
        match OpenOptions::new().create(true).append(true).open(&log_path) {
            Ok(file) => {
                let file_layer = fmt::layer()
                    .with_writer(file)
                    .with_ansi(false)
                    .with_target(true)
                    .with_filter(tracing_subscriber::filter::LevelFilter::DEBUG);
                registry.with(file_layer).init();
            }
            Err(e) => {
                registry.init();
                tracing::warn!("Failed to open log file {}: {}", log_path, e);
            }
        }
    } else {
        registry.init();
    }
}
