//! # Telemetry
//!
//! Structured logging through `tracing` and an event-driven metrics
//! collector.
//!
//! ```rust,no_run
//! use qframe::config::LoggingConfig;
//! use qframe::telemetry::{init_logging, record_metric, MetricsEvent};
//!
//! init_logging(&LoggingConfig::default())?;
//! record_metric(MetricsEvent::FrameDecoded);
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod config;
pub mod metrics;

pub use config::TelemetryConfig;
pub use metrics::{
    record_metric, start_metrics_task, MetricsCollector, MetricsEvent, MetricsHandle, MetricsSummary,
};

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

/// Initialize structured logging.
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(config.level.to_string())
            .with_context(|| format!("invalid log level: {}", config.level))?,
    };

    let (json_layer, plain_layer) = if config.json_format {
        let layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_file(config.include_file_line)
            .with_line_number(config.include_file_line);
        (Some(layer), None)
    } else {
        let layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_ansi(config.enable_colors)
            .with_file(config.include_file_line)
            .with_line_number(config.include_file_line);
        (None, Some(layer))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(plain_layer)
        .try_init()
        .context("installing tracing subscriber")?;

    tracing::debug!(level = %config.level, json = config.json_format, "Logging initialized");
    Ok(())
}
