//! Logging setup for filedrop.
//!
//! `RUST_LOG` directives are layered on top of the configured level.

use std::fs::{self, File};
use std::path::Path;
use std::sync::Arc;

use tracing::Subscriber;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::LoggingConfig;
use crate::{FiledropError, Result};

/// Configured level name to a filter; unknown names fall back to `info`.
fn parse_level(level: &str) -> LevelFilter {
    match level.trim().to_ascii_lowercase().as_str() {
        "" => LevelFilter::INFO,
        "warning" => LevelFilter::WARN,
        other => other.parse().unwrap_or(LevelFilter::INFO),
    }
}

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(parse_level(level).into())
        .from_env_lossy()
}

fn fmt_layer<S, W>(writer: W, ansi: bool) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi)
        .with_target(true)
}

/// Install the global subscriber.
///
/// Logs go to stdout, and also to `config.file` when one is set. The file's
/// parent directory is created if needed.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter = env_filter(&config.level);

    let installed = match config.file.as_deref() {
        None => tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer(std::io::stdout, true))
            .try_init(),
        Some(file) => {
            let path = Path::new(file);
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            let log_file = Arc::new(File::create(path)?);

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer(std::io::stdout.and(log_file), false))
                .try_init()
        }
    };

    installed.map_err(|e| FiledropError::Config(format!("logging: {e}")))
}

/// Install a stdout-only subscriber. Does nothing if one is already set.
pub fn init_console_only(level: &str) {
    let _ = tracing_subscriber::registry()
        .with(env_filter(level))
        .with(fmt_layer(std::io::stdout, true))
        .try_init();
}
