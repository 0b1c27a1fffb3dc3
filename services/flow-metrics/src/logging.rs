//!
//! src/logging.rs
//!
//! Initializes the tracing subscriber used by the binary. Output is either
//! flattened json for log shipping or pretty text for interactive runs
//!

use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use tracing_error::ErrorLayer;
use tracing_appender::non_blocking;

use crate::config::{LogFormat, LoggingConfig};
use crate::errors::FlowError;

/// Must stay alive for the process lifetime, dropping it flushes the writer
pub struct LoggingGuard(tracing_appender::non_blocking::WorkerGuard);

fn filter_for(cfg: &LoggingConfig) -> Result<EnvFilter, FlowError> {
    match std::env::var("RUST_LOG") {
        Ok(directives) if !directives.trim().is_empty() => EnvFilter::try_new(directives),
        _ => EnvFilter::try_new(&cfg.filter_directives),
    }
    .map_err(|e| FlowError::Config(format!("invalid log filter: {e}")))
}

pub fn init_logging(cfg: &LoggingConfig) -> Result<LoggingGuard, FlowError> {
    let (writer, guard) = non_blocking(std::io::stderr());
    let filter = filter_for(cfg)?;
    let time = fmt::time::UtcTime::rfc_3339();

    let installed = match cfg.format {
        LogFormat::Json => {
            let fmt_layer = fmt::layer()
                .with_writer(writer)
                .with_timer(time)
                .with_target(cfg.include_target)
                .with_file(cfg.include_file_line)
                .with_line_number(cfg.include_file_line)
                .json()
                .flatten_event(true)
                .with_current_span(true)
                .with_span_list(true);

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .with(ErrorLayer::default())
                .try_init()
        }
        LogFormat::Pretty => {
            let fmt_layer = fmt::layer()
                .with_writer(writer)
                .with_timer(time)
                .with_ansi(cfg.with_ansi)
                .with_target(cfg.include_target)
                .with_file(cfg.include_file_line)
                .with_line_number(cfg.include_file_line)
                .compact();

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .with(ErrorLayer::default())
                .try_init()
        }
    };

    installed.map_err(|e| FlowError::Config(format!("logger already set: {e}")))?;
    Ok( LoggingGuard(guard) )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_directives_parse() -> Result<(), FlowError> {
        let cfg = LoggingConfig::default();
        filter_for(&cfg)?;
        Ok(())
    }
}
