//! Application configuration.
//!
//! Every section has serde defaults, so an empty file (or no file at all) is
//! a valid configuration.
//!
//! # Example
//!
//! ```toml
//! [logging]
//! level = "debug"
//!
//! [decoder]
//! max_frame_size = 16384
//! read_chunk_size = 1024
//!
//! [netio.batch]
//! max_batch_packets = 16
//! ```

pub mod global;
pub mod loader;

pub use global::{AllocatorConfig, DecoderConfig, LogLevel, LoggingConfig};
pub use loader::{default_config_toml, load_config, CliArgs, Command};

use serde::{Deserialize, Serialize};

use crate::netio::NetIoConfig;
use crate::telemetry::TelemetryConfig;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub decoder: DecoderConfig,
    pub allocator: AllocatorConfig,
    pub netio: NetIoConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    /// Validate every section, collecting all problems.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if let Err(e) = self.decoder.validate() {
            errors.extend(e);
        }
        if let Err(e) = self.allocator.validate() {
            errors.extend(e);
        }
        if let Err(e) = self.netio.validate() {
            errors.extend(e);
        }
        if let Err(e) = self.telemetry.validate() {
            errors.extend(e);
        }

        // Packets are built in MemSlices from the allocator.
        if self.allocator.pooled && self.allocator.block_size < self.netio.batch.max_packet_size {
            tracing::warn!(
                block_size = self.allocator.block_size,
                max_packet_size = self.netio.batch.max_packet_size,
                "allocator blocks are smaller than the largest packet; large packets bypass the pool"
            );
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests;
