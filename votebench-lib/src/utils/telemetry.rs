use std::{io::IsTerminal as _, path::Path};

use rama::{
    error::{BoxError, ErrorContext as _},
    telemetry::tracing::{
        self,
        metadata::LevelFilter,
        subscriber::{EnvFilter, fmt::writer::BoxMakeWriter},
    },
};

#[derive(Debug, Clone, Default)]
pub struct TelemetryConfig<'a> {
    /// Debug instead of Info as the default level.
    pub verbose: bool,
    /// Human friendly (multi-line) output.
    pub pretty: bool,
    /// Append logs to this file instead of writing them to stderr.
    pub output: Option<&'a Path>,
}

/// Configures structured logging with runtime control via `RUST_LOG` environment variable.
///
/// Defaults to INFO level to balance visibility with performance.
/// Use `RUST_LOG=debug` or `RUST_LOG=trace` for troubleshooting.
///
/// Logs go to stderr (or the output file) so that reporters
/// can own stdout.
pub fn init_tracing(cfg: Option<TelemetryConfig<'_>>) -> Result<(), BoxError> {
    let cfg = cfg.unwrap_or_default();

    let directive = if cfg.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    }
    .into();

    let make_writer = match cfg.output {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .append(true)
                .create(true)
                .open(path)
                .context("open log file")
                .with_context_debug_field("path", || path.to_owned())?;

            BoxMakeWriter::new(file)
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };

    let subscriber = tracing::subscriber::fmt()
        .with_ansi(cfg.output.is_none() && std::io::stderr().is_terminal())
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(directive)
                .from_env_lossy(),
        )
        .with_writer(make_writer);

    if cfg.pretty {
        subscriber.pretty().try_init()?;
    } else {
        subscriber.try_init()?;
    }

    tracing::info!("Tracing is set up");
    Ok(())
}
