//! Process-wide logging setup.
//!
//! Library code logs through both `tracing` and `log`; `LogTracer` forwards
//! `log` records into the tracing subscriber installed here.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

use crate::config::{LogConfig, LogFormat};
use crate::error::MailpaperError;

/// Installs the global subscriber. `RUST_LOG` overrides `config.level`.
pub fn init_logging(config: &LogConfig) -> Result<(), MailpaperError> {
    tracing_log::LogTracer::init().map_err(|e| MailpaperError::Logging(e.to_string()))?;

    let filter = build_filter(config)?;
    let registry = Registry::default().with(filter);

    let result = match config.format {
        LogFormat::Text => tracing::subscriber::set_global_default(
            registry.with(fmt::layer().with_target(false)),
        ),
        LogFormat::Json => tracing::subscriber::set_global_default(
            registry.with(fmt::layer().json().with_current_span(true)),
        ),
    };

    result.map_err(|e| MailpaperError::Logging(e.to_string()))
}

fn build_filter(config: &LogConfig) -> Result<EnvFilter, MailpaperError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.level).map_err(|e| {
            MailpaperError::Logging(format!("Invalid log level '{}': {}", config.level, e))
        }),
    }
}
