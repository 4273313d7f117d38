//! Logging, decoder and allocator settings.

use qframe_decoder::{FrameHeader, DEFAULT_MAX_PAYLOAD_SIZE};
use serde::{Deserialize, Serialize};

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level when `RUST_LOG` is not set.
    ///
    /// **Default:** `Info`
    pub level: LogLevel,

    /// Emit one JSON object per event.
    ///
    /// **Default:** `false`
    pub json_format: bool,

    /// ANSI colours in human-readable output.
    ///
    /// **Default:** `true`
    pub enable_colors: bool,

    /// Include source file and line number in each event.
    ///
    /// **Default:** `false`
    pub include_file_line: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            json_format: false,
            enable_colors: true,
            include_file_line: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(format!("Invalid log level: {}", s)),
        }
    }
}

/// Frame decoder settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Largest accepted frame payload (SETTINGS_MAX_FRAME_SIZE).
    ///
    /// RFC 9113 Section 6.5.2 allows 16384 ..= 16777215.
    ///
    /// **Default:** `16384`
    pub max_frame_size: u32,

    /// Bytes read from the input per decode call.
    ///
    /// **Default:** `4096`
    pub read_chunk_size: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_PAYLOAD_SIZE,
            read_chunk_size: 4096,
        }
    }
}

impl DecoderConfig {
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if !(DEFAULT_MAX_PAYLOAD_SIZE..=FrameHeader::MAX_PAYLOAD_LENGTH).contains(&self.max_frame_size) {
            errors.push(format!(
                "decoder.max_frame_size ({}) must be between {} and {}",
                self.max_frame_size,
                DEFAULT_MAX_PAYLOAD_SIZE,
                FrameHeader::MAX_PAYLOAD_LENGTH
            ));
        }

        if self.read_chunk_size == 0 {
            errors.push("decoder.read_chunk_size must be > 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Buffer allocator used for outgoing MemSlices.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocatorConfig {
    /// Serve allocations from a free list of fixed-size blocks.
    ///
    /// **Default:** `true`
    pub pooled: bool,

    /// Size of each pooled block in bytes.
    ///
    /// **Default:** `1500`
    pub block_size: usize,

    /// Idle blocks kept for reuse.
    ///
    /// **Default:** `1024`
    pub max_pooled_buffers: usize,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            pooled: true,
            block_size: 1500,
            max_pooled_buffers: 1024,
        }
    }
}

impl AllocatorConfig {
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.pooled && self.block_size == 0 {
            errors.push("allocator.block_size must be > 0 when pooling is enabled".to_string());
        }

        if self.block_size > 64 * 1024 {
            errors.push(format!(
                "allocator.block_size ({}) is unreasonably large (> 64 KB)",
                self.block_size
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
