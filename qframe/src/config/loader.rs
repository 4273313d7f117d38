//! Configuration loading.
//!
//! Precedence, lowest to highest: defaults, TOML file, `QFRAME_` environment
//! variables, command-line flags.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::Config as ConfigLoader;

use super::AppConfig;

/// HTTP/2 frame decoding and batched UDP send tool.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to configuration file (TOML format)
    #[arg(long, short = 'c', default_value = "qframe.toml", global = true)]
    pub config: String,

    /// Log level (overrides config file)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Validate configuration and exit
    #[arg(long)]
    pub validate: bool,

    /// Print default configuration and exit
    #[arg(long)]
    pub print_default_config: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Decode a capture of concatenated HTTP/2 frames
    Decode {
        /// Capture file
        file: PathBuf,

        /// Bytes per decode call (overrides decoder.read_chunk_size)
        #[arg(long)]
        chunk_size: Option<usize>,
    },

    /// Send datagrams through the batch writer
    Send {
        /// Destination address
        #[arg(long)]
        peer: SocketAddr,

        /// Number of datagrams
        #[arg(long, default_value_t = 1)]
        count: usize,

        /// Datagram size in bytes
        #[arg(long, default_value_t = 1200)]
        size: usize,
    },
}

/// Build the effective configuration for `cli` and validate it.
pub fn load_config(cli: &CliArgs) -> Result<AppConfig> {
    let mut config = load_config_file(&cli.config)?;

    apply_env_overrides(&mut config, environment())?;

    apply_cli_overrides(&mut config, cli);

    config
        .validate()
        .map_err(|errors| anyhow::anyhow!("Configuration validation failed:\n{}", errors.join("\n")))?;

    Ok(config)
}

/// Load configuration from a TOML file; a missing file yields defaults.
pub fn load_config_file(path: &str) -> Result<AppConfig> {
    let path_obj = Path::new(path);

    if !path_obj.exists() {
        tracing::warn!(
            config_path = %path,
            "Configuration file not found, using defaults"
        );
        return Ok(AppConfig::default());
    }

    let config_str = std::fs::read_to_string(path_obj)
        .with_context(|| format!("Failed to read config file: {}", path))?;

    toml::from_str(&config_str).with_context(|| format!("Failed to parse TOML config: {}", path))
}

/// `QFRAME_` variables with `__` between path segments.
pub fn environment() -> config::Environment {
    config::Environment::with_prefix("QFRAME")
        .prefix_separator("_")
        .separator("__")
}

/// Apply environment variable overrides.
///
/// Variables use the `QFRAME_` prefix and `__` between path segments:
///
/// - `QFRAME_LOGGING__LEVEL=debug`
/// - `QFRAME_DECODER__MAX_FRAME_SIZE=65536`
/// - `QFRAME_NETIO__BIND_HOST=::`
pub fn apply_env_overrides(config: &mut AppConfig, env: config::Environment) -> Result<()> {
    let env_config = ConfigLoader::builder()
        .add_source(env)
        .build()
        .context("Failed to load environment variables")?;

    if let Ok(level) = env_config.get_string("logging.level") {
        match level.parse() {
            Ok(parsed) => config.logging.level = parsed,
            Err(e) => tracing::warn!(error = %e, "ignoring QFRAME_LOGGING__LEVEL"),
        }
    }
    if let Ok(json) = env_config.get_bool("logging.json_format") {
        config.logging.json_format = json;
    }
    if let Ok(size) = env_config.get_int("decoder.max_frame_size") {
        config.decoder.max_frame_size =
            u32::try_from(size).with_context(|| format!("decoder.max_frame_size out of range: {}", size))?;
    }
    if let Ok(size) = env_config.get_int("decoder.read_chunk_size") {
        config.decoder.read_chunk_size =
            usize::try_from(size).with_context(|| format!("decoder.read_chunk_size out of range: {}", size))?;
    }
    if let Ok(pooled) = env_config.get_bool("allocator.pooled") {
        config.allocator.pooled = pooled;
    }
    if let Ok(host) = env_config.get_string("netio.bind_host") {
        config.netio.bind_host = host;
    }
    if let Ok(enabled) = env_config.get_bool("telemetry.enable_metrics") {
        config.telemetry.enable_metrics = enabled;
    }

    Ok(())
}

/// Apply command-line argument overrides.
pub fn apply_cli_overrides(config: &mut AppConfig, cli: &CliArgs) {
    if let Some(ref level_str) = cli.log_level {
        if let Ok(level) = level_str.parse() {
            config.logging.level = level;
        } else {
            tracing::warn!(level = %level_str, "Invalid log level specified, ignoring");
        }
    }

    if let Some(Command::Decode {
        chunk_size: Some(chunk_size),
        ..
    }) = cli.command
    {
        config.decoder.read_chunk_size = chunk_size;
    }
}

/// The default configuration in TOML format.
pub fn default_config_toml() -> Result<String> {
    toml::to_string_pretty(&AppConfig::default()).context("Failed to serialize default config")
}
