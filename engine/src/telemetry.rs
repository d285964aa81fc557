//! Telemetry and Observability
//!
//! Handles setting up `tracing-subscriber` for structured logging.
//! Supports CLI-driven log levels, environment variable overrides, and
//! format switching between pretty terminal output and JSON.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the tracing subscriber.
///
/// Priority: `RUST_LOG` env var > `log_level` parameter > default "info".
///
/// With `json` set, output is structured JSON with spans, suitable for
/// the hosted entrypoint; otherwise pretty-printed terminal output.
pub fn init_telemetry(log_level: &str, json: bool) {
    let default_filter = format!("{},foreman_engine={}", log_level, log_level);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&default_filter));

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_current_span(true))
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().pretty().with_target(false))
            .try_init()
            .ok();
    }
}
