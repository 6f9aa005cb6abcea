//! Logging setup and configuration

use anyhow::Result;
use std::sync::Arc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone)]
pub struct LoggingOptions {
    pub directory: String,
    pub file_prefix: String,
    /// Write the rolling file as JSON lines instead of compact text.
    pub json_file: bool,
    pub default_directive: String,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            directory: "output/logs".to_string(),
            file_prefix: "futarchy-feed.log".to_string(),
            json_file: false,
            default_directive: "info".to_string(),
        }
    }
}

pub struct LoggingGuard {
    pub _guard: tracing_appender::non_blocking::WorkerGuard,
}

/// Console layer plus an hourly rolling file. `RUST_LOG` overrides the default directive.
pub fn setup_logging(options: &LoggingOptions) -> Result<Arc<LoggingGuard>> {
    std::fs::create_dir_all(&options.directory)?;

    let file_appender = tracing_appender::rolling::hourly(&options.directory, &options.file_prefix);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let json_layer = options.json_file.then(|| {
        fmt::layer()
            .json()
            .with_writer(non_blocking.clone())
            .with_current_span(false)
    });
    let text_layer = (!options.json_file).then(|| {
        fmt::layer()
            .with_writer(non_blocking)
            .with_target(true)
            .with_ansi(false)
            .compact()
    });

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_ansi(true)
                .with_level(true)
        )
        .with(json_layer)
        .with(text_layer)
        .with(EnvFilter::from_default_env().add_directive(options.default_directive.parse()?))
        .init();

    Ok(Arc::new(LoggingGuard { _guard: guard }))
}
