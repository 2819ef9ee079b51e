//! Logging initialization for sawmill-daemon.
//!
//! Configures `tracing-subscriber` from the `[general]` section of
//! `SawmillConfig`. Production deployments use JSON lines; `pretty`
//! is for local development.

use anyhow::Result;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;

use sawmill_core::config::GeneralConfig;

/// Initialize the global tracing subscriber.
///
/// Must be called exactly once, before any tracing macros are used.
/// `RUST_LOG` takes precedence over the configured log level.
pub fn init_tracing(config: &GeneralConfig) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(format_layer(&config.log_format)?)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing subscriber: {}", e))?;

    Ok(())
}

/// Build the fmt layer for the configured output format.
fn format_layer<S>(log_format: &str) -> Result<Box<dyn Layer<S> + Send + Sync>>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    match log_format {
        "json" => Ok(tracing_subscriber::fmt::layer().json().boxed()),
        "pretty" => Ok(tracing_subscriber::fmt::layer().pretty().boxed()),
        other => Err(anyhow::anyhow!(
            "unknown log format '{}', expected 'json' or 'pretty'",
            other
        )),
    }
}
