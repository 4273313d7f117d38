//! Tests for configuration loading and validation.

#[cfg(test)]
mod section_tests {
    use crate::config::global::{AllocatorConfig, DecoderConfig, LogLevel, LoggingConfig};
    use crate::config::AppConfig;
    use crate::telemetry::TelemetryConfig;

    #[test]
    fn test_defaults_are_valid() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_logging_defaults() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, LogLevel::Info);
        assert!(!config.json_format);
        assert!(config.enable_colors);
    }

    #[test]
    fn test_log_level_parse_and_display() {
        assert_eq!("WARNING".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("trace".parse::<LogLevel>().unwrap(), LogLevel::Trace);
        assert!("verbose".parse::<LogLevel>().is_err());
        assert_eq!(LogLevel::Debug.to_string(), "debug");
    }

    #[test]
    fn test_decoder_frame_size_bounds() {
        let low = DecoderConfig {
            max_frame_size: 16_383,
            ..DecoderConfig::default()
        };
        assert!(low.validate().is_err());

        let high = DecoderConfig {
            max_frame_size: 1 << 24,
            ..DecoderConfig::default()
        };
        assert!(high.validate().is_err());

        let max = DecoderConfig {
            max_frame_size: (1 << 24) - 1,
            ..DecoderConfig::default()
        };
        assert!(max.validate().is_ok());
    }

    #[test]
    fn test_decoder_zero_chunk_size() {
        let config = DecoderConfig {
            read_chunk_size: 0,
            ..DecoderConfig::default()
        };
        let errors = config.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.contains("read_chunk_size must be > 0")));
    }

    #[test]
    fn test_allocator_zero_block_size() {
        let pooled = AllocatorConfig {
            block_size: 0,
            ..AllocatorConfig::default()
        };
        assert!(pooled.validate().is_err());

        let direct = AllocatorConfig {
            pooled: false,
            block_size: 0,
            ..AllocatorConfig::default()
        };
        assert!(direct.validate().is_ok());
    }

    #[test]
    fn test_telemetry_interval_bounds() {
        let zero = TelemetryConfig {
            report_interval_secs: 0,
            ..TelemetryConfig::default()
        };
        assert!(zero.validate().is_err());

        let zero_disabled = TelemetryConfig {
            enable_metrics: false,
            report_interval_secs: 0,
        };
        assert!(zero_disabled.validate().is_ok());
    }

    #[test]
    fn test_app_config_collects_every_error() {
        let mut config = AppConfig::default();
        config.decoder.read_chunk_size = 0;
        config.netio.batch.max_batch_packets = 0;
        config.telemetry.report_interval_secs = 0;

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 3);
    }
}

#[cfg(test)]
mod loader_tests {
    use std::io::Write;

    use clap::Parser;

    use crate::config::global::LogLevel;
    use crate::config::loader::{
        apply_cli_overrides, apply_env_overrides, default_config_toml, load_config, load_config_file,
        environment,
    };
    use crate::config::{AppConfig, CliArgs, Command};

    fn env_from(pairs: &[(&str, &str)]) -> config::Environment {
        let map: config::Map<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        environment().source(Some(map))
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let config = load_config_file(path.to_str().unwrap()).unwrap();
        assert_eq!(config.decoder.max_frame_size, 16_384);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[logging]\nlevel = \"debug\"\n\n[decoder]\nread_chunk_size = 7\n\n[netio.batch]\nmax_batch_packets = 2"
        )
        .unwrap();

        let config = load_config_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.decoder.read_chunk_size, 7);
        assert_eq!(config.decoder.max_frame_size, 16_384);
        assert_eq!(config.netio.batch.max_batch_packets, 2);
        assert_eq!(config.netio.batch.max_packet_size, 1500);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[decoder\nmax_frame_size = ").unwrap();
        assert!(load_config_file(file.path().to_str().unwrap()).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        let env = env_from(&[
            ("QFRAME_LOGGING__LEVEL", "trace"),
            ("QFRAME_DECODER__MAX_FRAME_SIZE", "65536"),
            ("QFRAME_DECODER__READ_CHUNK_SIZE", "1"),
            ("QFRAME_ALLOCATOR__POOLED", "false"),
            ("QFRAME_NETIO__BIND_HOST", "::"),
            ("QFRAME_TELEMETRY__ENABLE_METRICS", "false"),
            ("UNRELATED_DECODER__READ_CHUNK_SIZE", "99"),
        ]);
        apply_env_overrides(&mut config, env).unwrap();

        assert_eq!(config.logging.level, LogLevel::Trace);
        assert_eq!(config.decoder.max_frame_size, 65_536);
        assert_eq!(config.decoder.read_chunk_size, 1);
        assert!(!config.allocator.pooled);
        assert_eq!(config.netio.bind_host, "::");
        assert!(!config.telemetry.enable_metrics);
    }

    #[test]
    fn test_env_negative_frame_size_is_an_error() {
        let mut config = AppConfig::default();
        let env = env_from(&[("QFRAME_DECODER__MAX_FRAME_SIZE", "-1")]);
        assert!(apply_env_overrides(&mut config, env).is_err());
    }

    #[test]
    fn test_cli_overrides() {
        let cli = CliArgs::parse_from([
            "qframe",
            "--log-level",
            "error",
            "decode",
            "capture.bin",
            "--chunk-size",
            "3",
        ]);
        let mut config = AppConfig::default();
        apply_cli_overrides(&mut config, &cli);

        assert_eq!(config.logging.level, LogLevel::Error);
        assert_eq!(config.decoder.read_chunk_size, 3);
        assert!(matches!(cli.command, Some(Command::Decode { .. })));
    }

    #[test]
    fn test_cli_invalid_log_level_ignored() {
        let cli = CliArgs::parse_from(["qframe", "--log-level", "loud"]);
        let mut config = AppConfig::default();
        apply_cli_overrides(&mut config, &cli);
        assert_eq!(config.logging.level, LogLevel::Info);
    }

    #[test]
    fn test_send_command_parses() {
        let cli = CliArgs::parse_from(["qframe", "send", "--peer", "127.0.0.1:4433", "--count", "5"]);
        match cli.command {
            Some(Command::Send { peer, count, size }) => {
                assert_eq!(peer.port(), 4433);
                assert_eq!(count, 5);
                assert_eq!(size, 1200);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_load_config_rejects_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[decoder]\nmax_frame_size = 100").unwrap();
        let cli = CliArgs::parse_from(["qframe", "--config", file.path().to_str().unwrap()]);

        let err = load_config(&cli).unwrap_err();
        assert!(err.to_string().contains("max_frame_size"));
    }

    #[test]
    fn test_default_config_toml_round_trips() {
        let text = default_config_toml().unwrap();
        let parsed: AppConfig = toml::from_str(&text).unwrap();
        assert!(parsed.validate().is_ok());
        assert_eq!(parsed.netio.batch.buffer_size, 64 * 1024);
        assert!(text.contains("[decoder]"));
    }
}
