use std::fs::File;
use std::io::BufReader;

use anyhow::Context;
use clap::{CommandFactory, Parser};
use tracing::info;

use qframe::config::{self, CliArgs, Command};
use qframe::telemetry::{self, MetricsHandle};
use qframe::{decode, send};

fn main() -> anyhow::Result<()> {
    let cli = CliArgs::parse();

    if cli.print_default_config {
        print!("{}", config::default_config_toml()?);
        return Ok(());
    }

    let config = config::load_config(&cli)?;
    telemetry::init_logging(&config.logging).context("failed to initialize logging")?;
    info!(config_path = %cli.config, "Configuration loaded successfully");

    if cli.validate {
        println!("✓ Configuration is valid");
        return Ok(());
    }

    let Some(command) = cli.command else {
        CliArgs::command().print_help()?;
        println!();
        return Ok(());
    };

    let metrics = if config.telemetry.enable_metrics {
        telemetry::start_metrics_task(&config.telemetry).context("failed to start metrics")?
    } else {
        MetricsHandle::disabled()
    };

    let outcome = match command {
        Command::Decode { file, .. } => {
            let input = File::open(&file).with_context(|| format!("opening {}", file.display()))?;
            let report = decode::decode_stream(
                BufReader::new(input),
                config.decoder.read_chunk_size,
                config.decoder.max_frame_size,
            )?;
            info!(
                frames = report.frames_decoded,
                rst_streams = report.rst_streams.len(),
                unknown_frames = report.unknown_frames,
                discarded = report.frames_discarded,
                bytes = report.bytes_read,
                "decode finished"
            );
            if let Some(error) = report.error {
                Err(anyhow::anyhow!(error)
                    .context(format!("connection error {}", error.error_code())))
            } else if report.truncated {
                Err(anyhow::anyhow!("input ended inside a frame"))
            } else {
                Ok(())
            }
        }
        Command::Send { peer, count, size } => send::send_datagrams(&config, peer, count, size).map(|_| ()),
    };

    if let Some(summary) = metrics.shutdown() {
        info!(?summary, "metrics collector stopped");
    }
    outcome
}
