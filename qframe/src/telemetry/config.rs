use serde::{Deserialize, Serialize};

/// Metrics collection settings.
///
/// Metrics are aggregated in-process and reported through the log at a fixed
/// interval and once more at shutdown.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Enable the metrics collector (default: true).
    pub enable_metrics: bool,

    /// Seconds between periodic metrics reports (default: 60).
    pub report_interval_secs: u64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enable_metrics: true,
            report_interval_secs: 60,
        }
    }
}

impl TelemetryConfig {
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.enable_metrics && self.report_interval_secs == 0 {
            errors.push("telemetry.report_interval_secs must be > 0".to_string());
        }

        if self.report_interval_secs > 3600 {
            errors.push(format!(
                "telemetry.report_interval_secs ({}) is too long (max: 3600)",
                self.report_interval_secs
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
